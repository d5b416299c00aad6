use serde_json::json;

use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::collection::Collection;
use crate::error::Result;
use crate::remote::BibliographyApi;

/// Delete a record on the server
pub async fn cmd_remove<A: BibliographyApi>(
    collection: &Collection<A>,
    id: &str,
    output: OutputOptions,
) -> Result<()> {
    collection.delete(id).await?;
    CommandOutput::new(json!({
        "action": "deleted",
        "id": id,
        "success": true,
    }))
    .with_text(format!("Deleted {id}"))
    .print(output)
}
