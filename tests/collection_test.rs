mod common;

use std::sync::Arc;
use std::time::Duration;

use bibkeeper::remote::memory::Call;
use bibkeeper::{
    BibError, BibliographyRecord, Collection, CollectionEvent, FilterCriteria, LoadPhase,
    MemoryBackend, RecordDraft, RecordFields,
};

use common::{library, memory_collection};

#[tokio::test]
async fn test_create_then_find_returns_record_at_front() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();

    let drafts = [
        RecordDraft::new("A grammar of Hausa", "Newman, Paul"),
        RecordDraft {
            year: Some(1977),
            isbn: Some("0521291046".to_string()),
            ..RecordDraft::new("Syntactic structures", "Chomsky, N.")
        },
    ];
    for draft in drafts {
        let created = collection.create(&draft).await.unwrap();
        let id = created.id().expect("server assigns an id");

        let found = collection.find(id).expect("created record is loaded");
        assert_eq!(found, created);
        assert_eq!(collection.records()[0], created);
        assert_eq!(found.fields.title, draft.title);
    }
    assert_eq!(collection.len(), 6);
}

#[tokio::test]
async fn test_create_leaves_counts_to_the_server() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();
    let before = collection.cursor();

    collection
        .create(&RecordDraft::new("New", "Someone"))
        .await
        .unwrap();
    assert_eq!(collection.cursor(), before);

    collection.refresh().await.unwrap();
    assert_eq!(collection.cursor().total_count, before.total_count + 1);
}

#[tokio::test]
async fn test_update_without_identifier_fails_before_any_request() {
    let collection = memory_collection(library(), 20);
    let unsaved = BibliographyRecord::from_draft(RecordDraft::new("Draft", "Nobody"));

    let err = collection.update(&unsaved).await.unwrap_err();

    assert!(matches!(err, BibError::MissingIdentifier));
    assert!(err.is_precondition());
    assert!(collection.api().calls().is_empty());
    assert!(!collection.is_busy());
    assert!(collection.error().is_some());
}

#[tokio::test]
async fn test_refresh_replaces_and_load_next_appends() {
    let collection = Arc::new(Collection::new(MemoryBackend::seeded(45), 20));

    collection.refresh().await.unwrap();
    let first_page = collection.records();
    assert_eq!(first_page.len(), 20);
    assert_eq!(collection.cursor().current_page, 1);

    collection.load_next().await.unwrap();
    let records = collection.records();
    assert_eq!(records.len(), 40);
    assert_eq!(&records[..20], &first_page[..]);
    assert_eq!(collection.cursor().current_page, 2);

    collection.refresh().await.unwrap();
    assert_eq!(collection.len(), 20);
    assert_eq!(collection.cursor().current_page, 1);
    assert_eq!(
        collection.api().fetch_calls().last(),
        Some(&Call::List { page: 1, limit: 20 })
    );
}

#[tokio::test]
async fn test_load_next_without_next_page_is_a_noop() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();
    assert!(!collection.cursor().has_next_page);

    let before = collection.records();
    let mut events = collection.subscribe();
    collection.api().clear_calls();

    collection.load_next().await.unwrap();

    assert!(collection.api().calls().is_empty());
    assert_eq!(collection.records().len(), before.len());
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_load_next_while_loading_is_a_noop() {
    let collection = Arc::new(Collection::new(MemoryBackend::seeded(45), 20));
    collection.refresh().await.unwrap();
    collection.api().clear_calls();

    collection.api().delay_next(Duration::from_secs(1));
    let pending = {
        let collection = Arc::clone(&collection);
        tokio::spawn(async move { collection.load_next().await })
    };
    while !collection.is_loading() {
        tokio::task::yield_now().await;
    }

    // Second call while the first is in flight
    collection.load_next().await.unwrap();
    assert_eq!(collection.api().fetch_calls().len(), 1);

    pending.await.unwrap().unwrap();
    assert_eq!(collection.len(), 40);
    assert_eq!(collection.cursor().current_page, 2);
}

#[tokio::test]
async fn test_two_records_single_page() {
    let records: Vec<_> = library().into_iter().take(2).collect();
    let collection = memory_collection(records, 20);

    collection.load_page(1).await.unwrap();

    let cursor = collection.cursor();
    assert_eq!(cursor.total_count, 2);
    assert_eq!(cursor.total_pages, 1);
    assert!(!cursor.has_next_page);
    assert!(!cursor.has_previous_page);
    assert_eq!(collection.len(), 2);
    assert_eq!(collection.phase(), LoadPhase::Populated);
}

#[tokio::test]
async fn test_empty_result_is_populated() {
    let collection = memory_collection(Vec::new(), 20);
    collection.refresh().await.unwrap();
    assert_eq!(collection.phase(), LoadPhase::Populated);
    assert!(collection.is_empty());
}

#[tokio::test]
async fn test_delete_of_unknown_id_still_calls_server() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();
    let before = collection.records();
    let mut events = collection.subscribe();

    collection.delete("does-not-exist").await.unwrap();

    assert_eq!(
        collection.api().calls().last(),
        Some(&Call::Delete("does-not-exist".to_string()))
    );
    assert_eq!(collection.len(), before.len());
    // Busy toggled, list untouched
    assert_eq!(events.try_recv().unwrap(), CollectionEvent::BusyChanged(true));
    assert_eq!(events.try_recv().unwrap(), CollectionEvent::BusyChanged(false));
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn test_delete_removes_loaded_record() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();

    collection.delete("b2").await.unwrap();

    assert!(collection.find("b2").is_none());
    assert_eq!(collection.len(), 3);
    assert!(collection.api().stored().iter().all(|r| !r.has_id("b2")));
}

#[tokio::test]
async fn test_search_replaces_list_and_cursor() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();
    assert_eq!(collection.len(), 4);

    let criteria = FilterCriteria {
        year_from: Some(2000),
        ..Default::default()
    };
    collection.search("smith", &criteria).await.unwrap();

    let ids: Vec<_> = collection
        .records()
        .iter()
        .filter_map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, vec!["b2", "b3"]);
    assert_eq!(collection.cursor().total_count, 2);
    assert_eq!(
        collection.api().fetch_calls().last(),
        Some(&Call::Search {
            query: "smith".to_string(),
            criteria,
            page: 1
        })
    );
}

#[tokio::test]
async fn test_load_page_after_search_switches_back_to_the_list() {
    let collection = memory_collection(library(), 1);
    collection
        .search("smith", &FilterCriteria::default())
        .await
        .unwrap();
    assert_eq!(collection.active_query().as_deref(), Some("smith"));
    assert!(collection.cursor().has_next_page);

    collection.load_page(2).await.unwrap();
    assert_eq!(collection.active_query(), None);
    assert_eq!(collection.cursor().current_page, 2);
    assert_eq!(collection.len(), 1);
    assert!(collection.find("b2").is_some());

    collection.api().clear_calls();
    collection.load_next().await.unwrap();
    assert_eq!(
        collection.api().fetch_calls(),
        vec![Call::List { page: 3, limit: 1 }]
    );
    let ids: Vec<_> = collection
        .records()
        .iter()
        .filter_map(|r| r.id.clone())
        .collect();
    assert_eq!(ids, vec!["b2", "b3"]);
}

#[tokio::test]
async fn test_error_lifecycle() {
    let collection = memory_collection(library(), 20);

    collection
        .api()
        .fail_next(BibError::Offline("connection refused".to_string()));
    assert!(collection.refresh().await.is_err());
    let first = collection.error().unwrap();
    assert!(first.starts_with("No internet connection"));
    assert_eq!(collection.phase(), LoadPhase::Errored);

    // Last error wins
    collection.api().fail_next(BibError::Forbidden);
    assert!(collection.delete("b1").await.is_err());
    assert_eq!(
        collection.error().as_deref(),
        Some("You don't have permission to do that.")
    );

    // A retry is a fresh load, and success clears the error
    collection.refresh().await.unwrap();
    assert!(collection.error().is_none());
    assert_eq!(collection.phase(), LoadPhase::Populated);
}

#[tokio::test]
async fn test_update_sends_full_record() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();

    let mut record = collection.find("b1").unwrap();
    record.fields.year = Some(1999);
    record.fields.keywords = None;
    let updated = collection.update(&record).await.unwrap();

    assert_eq!(updated.fields.year, Some(1999));
    assert_eq!(updated.fields.keywords, None);
    assert_eq!(
        updated.fields.publication.as_deref(),
        Some("Journal of Phonetics")
    );
    assert_eq!(collection.find("b1").unwrap().fields.year, Some(1999));
    // Position is kept
    assert!(collection.records()[0].has_id("b1"));
}

#[tokio::test]
async fn test_update_not_found_keeps_list() {
    let collection = memory_collection(library(), 20);
    collection.refresh().await.unwrap();

    let ghost = common::stored("ghost", RecordFields::new("Ghost", "Nobody"));
    let err = collection.update(&ghost).await.unwrap_err();
    assert!(matches!(err, BibError::NotFound(_)));
    assert_eq!(collection.len(), 4);
    assert!(!collection.is_busy());
}
