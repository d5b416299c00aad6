use super::CommandOutput;
use crate::cli::OutputOptions;
use crate::collection::Collection;
use crate::display::format_record_detail;
use crate::error::{BibError, Result};
use crate::remote::BibliographyApi;

/// Print one record. With `local`, the first page is loaded and searched
/// instead of issuing a get for the id.
pub async fn cmd_show<A: BibliographyApi>(
    collection: &Collection<A>,
    id: &str,
    local: bool,
    output: OutputOptions,
) -> Result<()> {
    let record = if local {
        collection.load_page(1).await?;
        collection
            .find(id)
            .ok_or_else(|| BibError::NotFound(format!("{id} (not on the first page)")))?
    } else {
        collection.fetch(id).await?
    };
    CommandOutput::new(serde_json::to_value(&record)?)
        .with_text(format_record_detail(&record))
        .print(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryBackend;
    use crate::remote::memory::Call;

    #[tokio::test]
    async fn test_show_local_skips_get() {
        let collection = Collection::new(MemoryBackend::seeded(3), 20);
        cmd_show(&collection, "mem-2", true, OutputOptions { json: true })
            .await
            .unwrap();
        assert_eq!(
            collection.api().calls(),
            vec![Call::List { page: 1, limit: 20 }]
        );
    }

    #[tokio::test]
    async fn test_show_local_missing_is_not_found() {
        let collection = Collection::new(MemoryBackend::seeded(1), 20);
        let err = cmd_show(&collection, "mem-9", true, OutputOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BibError::NotFound(_)));
    }
}
