use owo_colors::OwoColorize;

use super::CommandOutput;
use crate::cli::{OutputOptions, RecordArgs};
use crate::collection::Collection;
use crate::error::{BibError, Result};
use crate::remote::BibliographyApi;

/// Fetch a record, overwrite the given fields and send it back whole
pub async fn cmd_edit<A: BibliographyApi>(
    collection: &Collection<A>,
    id: &str,
    changes: RecordArgs,
    output: OutputOptions,
) -> Result<()> {
    if changes.is_empty() {
        return Err(BibError::Validation(
            "nothing to change; pass at least one field".to_string(),
        ));
    }

    let mut record = collection.fetch(id).await?;
    changes.apply_to(&mut record.fields);
    let updated = collection.update(&record).await?;

    let text = format!(
        "Updated {} {}",
        updated.id().unwrap_or(id).cyan(),
        updated.fields.title
    );
    CommandOutput::new(serde_json::to_value(&updated)?)
        .with_text(text)
        .print(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBackend;
    use crate::remote::memory::Call;

    #[tokio::test]
    async fn test_edit_is_fetch_then_full_update() {
        let collection = Collection::new(MemoryBackend::seeded(1), 20);
        let changes = RecordArgs {
            year: Some(1999),
            ..Default::default()
        };
        cmd_edit(&collection, "mem-1", changes, OutputOptions { json: true })
            .await
            .unwrap();

        assert_eq!(
            collection.api().calls(),
            vec![
                Call::Get("mem-1".to_string()),
                Call::Update("mem-1".to_string())
            ]
        );
        let stored = &collection.api().stored()[0];
        assert_eq!(stored.fields.year, Some(1999));
        assert_eq!(stored.fields.title, "Record 1");
    }

    #[tokio::test]
    async fn test_edit_without_changes_is_rejected() {
        let collection = Collection::new(MemoryBackend::seeded(1), 20);
        let result = cmd_edit(
            &collection,
            "mem-1",
            RecordArgs::default(),
            OutputOptions::default(),
        )
        .await;
        assert!(matches!(result, Err(BibError::Validation(_))));
        assert!(collection.api().calls().is_empty());
    }
}
