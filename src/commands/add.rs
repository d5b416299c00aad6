use owo_colors::OwoColorize;

use super::CommandOutput;
use crate::cli::{OutputOptions, RecordArgs};
use crate::collection::Collection;
use crate::error::Result;
use crate::remote::BibliographyApi;

/// Create a record from command-line fields
pub async fn cmd_add<A: BibliographyApi>(
    collection: &Collection<A>,
    fields: RecordArgs,
    output: OutputOptions,
) -> Result<()> {
    let draft = fields.into_draft();
    let created = collection.create(&draft).await?;

    let text = format!(
        "Created {} {}",
        created.id().unwrap_or("(no id)").cyan(),
        created.fields.title
    );
    CommandOutput::new(serde_json::to_value(&created)?)
        .with_text(text)
        .print(output)
}
