//! Command implementations behind the `bibkeeper` binary.
//!
//! Commands take an already built [`Collection`](crate::collection::Collection),
//! so the same code runs against the HTTP service and against an in-memory
//! backend.

mod add;
mod browse;
mod config;
mod edit;
mod list;
mod remove;
mod search;
mod show;

pub use add::cmd_add;
pub use browse::cmd_browse;
pub use config::{cmd_config_get, cmd_config_set, cmd_config_show};
pub use edit::cmd_edit;
pub use list::{ListOptions, cmd_list};
pub use remove::cmd_remove;
pub use search::cmd_search;
pub use show::cmd_show;

use serde_json::Value;

use crate::cli::OutputOptions;
use crate::error::Result;

/// Output of a command in both of its forms.
///
/// The JSON value is always built; text is optional and falls back to the
/// pretty-printed JSON when absent.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, output: OutputOptions) -> Result<()> {
        match (output.json, self.text) {
            (false, Some(text)) => println!("{text}"),
            _ => print_json(&self.json)?,
        }
        Ok(())
    }
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
