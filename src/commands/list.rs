use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::collection::Collection;
use crate::display::{format_criteria, format_page_footer, format_record_table};
use crate::error::Result;
use crate::filter::{FilterCriteria, filter_records};
use crate::remote::BibliographyApi;

pub struct ListOptions {
    pub page: u32,
    /// Follow `load_next` until the last page
    pub all: bool,
    pub criteria: FilterCriteria,
}

/// List one page (or every page) and filter it locally
pub async fn cmd_list<A: BibliographyApi>(
    collection: &Collection<A>,
    options: ListOptions,
    output: OutputOptions,
) -> Result<()> {
    if options.all {
        collection.refresh().await?;
        loop {
            let before = collection.cursor();
            if !before.has_next_page {
                break;
            }
            collection.load_next().await?;
            if collection.cursor().current_page == before.current_page {
                // Server reports more pages but the cursor did not move
                tracing::warn!(page = before.current_page, "pagination stalled");
                break;
            }
        }
    } else {
        collection.load_page(options.page).await?;
    }

    let cursor = collection.cursor();
    let visible = filter_records(&collection.records(), "", &options.criteria);

    let json_output = json!({
        "records": visible,
        "pagination": cursor,
        "filters": options.criteria,
    });

    let mut text = if visible.is_empty() {
        "No records.".to_string()
    } else {
        format_record_table(&visible)
    };
    let summary = format_criteria(&options.criteria);
    if !summary.is_empty() {
        text.push_str(&format!("\n{summary}"));
    }
    text.push('\n');
    text.push_str(&format_page_footer(&cursor, visible.len()));

    CommandOutput::new(json_output).with_text(text).print(output)
}
