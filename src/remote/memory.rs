//! In-process bibliography service.
//!
//! Behaves like the remote API (ids assigned on create, newest first,
//! page/limit pagination, search through the same predicate the client uses
//! locally) and records every call it receives. Failures and latency can be
//! injected per operation, which is what the collection and projector tests
//! rely on.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{BibError, Result};
use crate::filter::{FilterCriteria, filter_records};
use crate::record::{BibliographyRecord, RecordDraft};

use super::{BibliographyApi, Pagination, RecordPage, SearchDescriptor};

/// A call received by [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List { page: u32, limit: u32 },
    Search {
        query: String,
        criteria: FilterCriteria,
        page: u32,
    },
    Get(String),
    Create(String),
    Update(String),
    Delete(String),
}

impl Call {
    pub fn is_fetch(&self) -> bool {
        matches!(self, Call::List { .. } | Call::Search { .. })
    }
}

#[derive(Default)]
struct MemoryState {
    records: Vec<BibliographyRecord>,
    next_id: u64,
    calls: Vec<Call>,
    failures: VecDeque<BibError>,
    delays: VecDeque<Duration>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `records`, assigning ids to any that lack one.
    pub fn with_records(records: impl IntoIterator<Item = BibliographyRecord>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.state.lock();
            for mut record in records {
                if record.id.is_none() {
                    record.id = Some(next_id(&mut state));
                }
                state.records.push(record);
            }
        }
        backend
    }

    /// Seed `count` records titled "Record 1".."Record N".
    pub fn seeded(count: usize) -> Self {
        Self::with_records((1..=count).map(|i| {
            BibliographyRecord::from_draft(RecordDraft::new(
                format!("Record {i}"),
                format!("Author {i}"),
            ))
        }))
    }

    /// Fail the next call with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, error: BibError) {
        self.state.lock().failures.push_back(error);
    }

    /// Delay the next call by `delay` before it touches any state.
    pub fn delay_next(&self, delay: Duration) {
        self.state.lock().delays.push_back(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn fetch_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_fetch).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn stored(&self) -> Vec<BibliographyRecord> {
        self.state.lock().records.clone()
    }

    /// Record the call and pop any injected delay.
    fn enter(&self, call: Call) -> Option<Duration> {
        let mut state = self.state.lock();
        state.calls.push(call);
        state.delays.pop_front()
    }

    async fn pause(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn take_failure(&self) -> Result<()> {
        match self.state.lock().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn paginate(records: Vec<BibliographyRecord>, page: u32, limit: u32) -> RecordPage {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = records.len();
        let total_pages = total.div_ceil(limit as usize) as u32;
        let start = ((page - 1) * limit) as usize;
        let records = records
            .into_iter()
            .skip(start)
            .take(limit as usize)
            .collect();
        RecordPage {
            records,
            pagination: Pagination {
                current_page: page,
                total_count: total as u64,
                total_pages,
                has_next_page: page < total_pages,
                has_previous_page: page > 1,
            },
            search: None,
        }
    }
}

fn next_id(state: &mut MemoryState) -> String {
    state.next_id += 1;
    format!("mem-{}", state.next_id)
}

impl BibliographyApi for MemoryBackend {
    async fn list_page(&self, page: u32, limit: u32) -> Result<RecordPage> {
        Self::pause(self.enter(Call::List { page, limit })).await;
        self.take_failure()?;
        let records = self.stored();
        Ok(Self::paginate(records, page, limit))
    }

    async fn search(
        &self,
        query: &str,
        criteria: &FilterCriteria,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage> {
        Self::pause(self.enter(Call::Search {
            query: query.to_string(),
            criteria: criteria.clone(),
            page,
        }))
        .await;
        self.take_failure()?;
        let matched = filter_records(&self.stored(), query, criteria);
        let mut result = Self::paginate(matched, page, limit);
        result.search = Some(SearchDescriptor {
            query: Some(query.to_string()),
            filters: serde_json::to_value(criteria).ok(),
        });
        Ok(result)
    }

    async fn get(&self, id: &str) -> Result<BibliographyRecord> {
        Self::pause(self.enter(Call::Get(id.to_string()))).await;
        self.take_failure()?;
        self.state
            .lock()
            .records
            .iter()
            .find(|r| r.has_id(id))
            .cloned()
            .ok_or_else(|| BibError::NotFound(format!("/bibliography/{id}")))
    }

    async fn create(&self, draft: &RecordDraft) -> Result<BibliographyRecord> {
        Self::pause(self.enter(Call::Create(draft.title.clone()))).await;
        self.take_failure()?;
        let mut state = self.state.lock();
        let now = jiff::Timestamp::now().to_string();
        let record = BibliographyRecord {
            id: Some(next_id(&mut state)),
            fields: draft.clone(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        state.records.insert(0, record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, record: &BibliographyRecord) -> Result<BibliographyRecord> {
        Self::pause(self.enter(Call::Update(id.to_string()))).await;
        self.take_failure()?;
        let mut state = self.state.lock();
        let stored = state
            .records
            .iter_mut()
            .find(|r| r.has_id(id))
            .ok_or_else(|| BibError::NotFound(format!("/bibliography/{id}")))?;
        stored.fields = record.fields.clone();
        stored.updated_at = Some(jiff::Timestamp::now().to_string());
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        Self::pause(self.enter(Call::Delete(id.to_string()))).await;
        self.take_failure()?;
        self.state.lock().records.retain(|r| !r.has_id(id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pagination_bookkeeping() {
        let api = MemoryBackend::seeded(45);
        let first = api.list_page(1, 20).await.unwrap();
        assert_eq!(first.records.len(), 20);
        assert_eq!(first.pagination.total_pages, 3);
        assert!(first.pagination.has_next_page);
        assert!(!first.pagination.has_previous_page);

        let last = api.list_page(3, 20).await.unwrap();
        assert_eq!(last.records.len(), 5);
        assert!(!last.pagination.has_next_page);
        assert!(last.pagination.has_previous_page);
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_prepends() {
        let api = MemoryBackend::seeded(1);
        let created = api.create(&RecordDraft::new("New", "Me")).await.unwrap();
        assert!(created.id.is_some());
        assert_eq!(api.stored()[0], created);
    }

    #[tokio::test]
    async fn test_injected_failure_is_consumed_once() {
        let api = MemoryBackend::seeded(1);
        api.fail_next(BibError::Unauthorized);
        assert!(matches!(
            api.list_page(1, 20).await,
            Err(BibError::Unauthorized)
        ));
        assert!(api.list_page(1, 20).await.is_ok());
        assert_eq!(api.fetch_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_search_uses_local_predicate() {
        let api = MemoryBackend::seeded(12);
        let page = api
            .search("record 1", &FilterCriteria::default(), 1, 20)
            .await
            .unwrap();
        // "Record 1", "Record 10", "Record 11", "Record 12"
        assert_eq!(page.records.len(), 4);
        assert_eq!(
            page.search.and_then(|s| s.query).as_deref(),
            Some("record 1")
        );
    }
}
