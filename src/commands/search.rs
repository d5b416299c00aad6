use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::collection::Collection;
use crate::display::{format_criteria, format_page_footer, format_record_table};
use crate::error::{BibError, Result};
use crate::filter::FilterCriteria;
use crate::remote::BibliographyApi;

/// Search on the server; results are printed as received
pub async fn cmd_search<A: BibliographyApi>(
    collection: &Collection<A>,
    query: &str,
    criteria: FilterCriteria,
    output: OutputOptions,
) -> Result<()> {
    let query = query.trim();
    if query.is_empty() {
        return Err(BibError::Other(
            "search query cannot be empty; use `list` to filter without one".to_string(),
        ));
    }

    collection.search(query, &criteria).await?;
    let records = collection.records();
    let cursor = collection.cursor();

    let json_output = json!({
        "query": query,
        "filters": criteria,
        "records": records,
        "pagination": cursor,
    });

    let mut text = format!("Results for \"{query}\"");
    let summary = format_criteria(&criteria);
    if !summary.is_empty() {
        text.push_str(&format!(" ({summary})"));
    }
    text.push('\n');
    if records.is_empty() {
        text.push_str("No matching records.");
    } else {
        text.push_str(&format_record_table(&records));
    }
    text.push('\n');
    text.push_str(&format_page_footer(&cursor, records.len()));

    CommandOutput::new(json_output).with_text(text).print(output)
}
