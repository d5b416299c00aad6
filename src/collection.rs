//! The canonical record list and its pagination state.
//!
//! [`Collection`] is the only writer of the canonical list. It mediates every
//! network call for the collection, keeps a single current error message and
//! two activity flags (`loading` for list fetches, `busy` for mutations), and
//! announces every change on a broadcast channel.
//!
//! Replacing loads (page 1, refresh, search) are sequenced: each one starts a
//! new generation, and a response that arrives after a newer replacing load
//! started is dropped instead of overwriting fresher results.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::{BibError, Result};
use crate::filter::FilterCriteria;
use crate::record::{BibliographyRecord, RecordDraft};
use crate::remote::{BibliographyApi, HttpBackend, Pagination, RecordPage};

const EVENT_CAPACITY: usize = 64;

/// Pagination position of the canonical list.
///
/// `current_page` is 0 until the first page has been loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageCursor {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl From<Pagination> for PageCursor {
    fn from(p: Pagination) -> Self {
        Self {
            current_page: p.current_page,
            total_pages: p.total_pages,
            total_count: p.total_count,
            has_next_page: p.has_next_page,
            has_previous_page: p.has_previous_page,
        }
    }
}

/// Change notifications emitted by a [`Collection`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    /// The canonical list or its cursor changed
    ListChanged,
    LoadingChanged(bool),
    BusyChanged(bool),
    ErrorChanged(Option<String>),
}

/// Lifecycle of list loading: `Idle -> Loading -> {Populated, Errored}`.
///
/// An empty successful result is `Populated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    Idle,
    Loading,
    Populated,
    Errored,
}

/// Where the canonical list came from, so `load_next` keeps paging the same
/// result set.
#[derive(Debug, Clone, PartialEq)]
enum ListSource {
    Browse,
    Search {
        query: String,
        criteria: FilterCriteria,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Merge {
    Replace,
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Loading,
    Busy,
}

impl Flag {
    fn event(self, on: bool) -> CollectionEvent {
        match self {
            Flag::Loading => CollectionEvent::LoadingChanged(on),
            Flag::Busy => CollectionEvent::BusyChanged(on),
        }
    }
}

struct CollectionState {
    records: Vec<BibliographyRecord>,
    cursor: PageCursor,
    source: ListSource,
    loads_in_flight: usize,
    mutations_in_flight: usize,
    last_outcome: Option<Outcome>,
    error: Option<String>,
    generation: u64,
}

impl CollectionState {
    fn counter(&mut self, flag: Flag) -> &mut usize {
        match flag {
            Flag::Loading => &mut self.loads_in_flight,
            Flag::Busy => &mut self.mutations_in_flight,
        }
    }
}

impl Default for CollectionState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            cursor: PageCursor::default(),
            source: ListSource::Browse,
            loads_in_flight: 0,
            mutations_in_flight: 0,
            last_outcome: None,
            error: None,
            generation: 0,
        }
    }
}

/// Releases one hold on an activity flag when dropped.
///
/// Success, failure, early return and a cancelled future all go through
/// `Drop`, so a flag can never stay raised after its operation is gone.
struct FlagGuard<'a> {
    state: &'a Mutex<CollectionState>,
    events: &'a broadcast::Sender<CollectionEvent>,
    flag: Flag,
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        let cleared = {
            let mut state = self.state.lock();
            let counter = state.counter(self.flag);
            *counter = counter.saturating_sub(1);
            *counter == 0
        };
        if cleared {
            let _ = self.events.send(self.flag.event(false));
        }
    }
}

/// A load that has been admitted: its generation and the flag hold.
struct LoadSlot<'a> {
    generation: u64,
    merge: Merge,
    _guard: FlagGuard<'a>,
}

/// Client-side owner of the remote bibliography collection
pub struct Collection<A> {
    api: A,
    page_size: u32,
    state: Mutex<CollectionState>,
    events: broadcast::Sender<CollectionEvent>,
}

impl Collection<HttpBackend> {
    /// Collection backed by the HTTP service described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(HttpBackend::from_config(config)?, config.page_size))
    }
}

impl<A: BibliographyApi> Collection<A> {
    pub fn new(api: A, page_size: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            page_size: page_size.max(1),
            state: Mutex::new(CollectionState::default()),
            events,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the canonical list
    pub fn records(&self) -> Vec<BibliographyRecord> {
        self.state.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    pub fn cursor(&self) -> PageCursor {
        self.state.lock().cursor
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loads_in_flight > 0
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().mutations_in_flight > 0
    }

    /// The last error message, if it has not been cleared since
    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    /// The active search query, `None` when browsing.
    pub fn active_query(&self) -> Option<String> {
        match &self.state.lock().source {
            ListSource::Browse => None,
            ListSource::Search { query, .. } => Some(query.clone()),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        let state = self.state.lock();
        if state.loads_in_flight > 0 {
            return LoadPhase::Loading;
        }
        match state.last_outcome {
            None => LoadPhase::Idle,
            Some(Outcome::Loaded) => LoadPhase::Populated,
            Some(Outcome::Failed) => LoadPhase::Errored,
        }
    }

    /// Look a record up in the already loaded list. Never touches the network.
    pub fn find(&self, id: &str) -> Option<BibliographyRecord> {
        self.state
            .lock()
            .records
            .iter()
            .find(|r| r.has_id(id))
            .cloned()
    }

    pub fn clear_error(&self) {
        let had_error = self.state.lock().error.take().is_some();
        if had_error {
            self.emit(CollectionEvent::ErrorChanged(None));
        }
    }

    /// Fetch one page of the unsearched list.
    ///
    /// Page 1 replaces the canonical list and later pages are appended. A
    /// later page requested while a search is active replaces the search
    /// results instead, so the list never mixes both sources.
    pub async fn load_page(&self, page: u32) -> Result<()> {
        let page = page.max(1);
        let slot = {
            let mut state = self.state.lock();
            let searching = matches!(state.source, ListSource::Search { .. });
            let merge = if page == 1 || searching {
                state.source = ListSource::Browse;
                Merge::Replace
            } else {
                Merge::Append
            };
            self.admit(&mut state, merge)
        };
        tracing::debug!(page, limit = self.page_size, "loading page");
        let result = self.api.list_page(page, self.page_size).await;
        self.settle(slot, result)
    }

    /// Fetch the page after the current one, continuing the active search if
    /// there is one. Does nothing when there is no next page or a load is
    /// already running.
    pub async fn load_next(&self) -> Result<()> {
        let (slot, page, source) = {
            let mut state = self.state.lock();
            let has_next = state.cursor.has_next_page;
            let loading = state.loads_in_flight > 0;
            if !has_next || loading {
                tracing::debug!(has_next, loading, "load_next skipped");
                return Ok(());
            }
            let page = state.cursor.current_page + 1;
            let source = state.source.clone();
            (self.admit(&mut state, Merge::Append), page, source)
        };
        tracing::debug!(page, "loading next page");
        let result = match &source {
            ListSource::Browse => self.api.list_page(page, self.page_size).await,
            ListSource::Search { query, criteria } => {
                self.api
                    .search(query, criteria, page, self.page_size)
                    .await
            }
        };
        self.settle(slot, result)
    }

    /// Reload page 1 of the unsearched list, replacing everything loaded so far.
    pub async fn refresh(&self) -> Result<()> {
        self.load_page(1).await
    }

    /// Replace the canonical list with page 1 of a remote search.
    pub async fn search(&self, query: &str, criteria: &FilterCriteria) -> Result<()> {
        let slot = {
            let mut state = self.state.lock();
            state.source = ListSource::Search {
                query: query.to_string(),
                criteria: criteria.clone(),
            };
            self.admit(&mut state, Merge::Replace)
        };
        tracing::debug!(query, filters = criteria.active_count(), "searching");
        let result = self.api.search(query, criteria, 1, self.page_size).await;
        self.settle(slot, result)
    }

    /// Raise the loading flag, clear the error and assign a generation.
    fn admit(&self, state: &mut CollectionState, merge: Merge) -> LoadSlot<'_> {
        if merge == Merge::Replace {
            state.generation += 1;
        }
        state.loads_in_flight += 1;
        let started = state.loads_in_flight == 1;
        let cleared = state.error.take().is_some();

        if started {
            self.emit(CollectionEvent::LoadingChanged(true));
        }
        if cleared {
            self.emit(CollectionEvent::ErrorChanged(None));
        }
        LoadSlot {
            generation: state.generation,
            merge,
            _guard: self.guard(Flag::Loading),
        }
    }

    fn settle(&self, slot: LoadSlot<'_>, result: Result<RecordPage>) -> Result<()> {
        let mut state = self.state.lock();
        if slot.generation != state.generation {
            tracing::debug!(
                generation = slot.generation,
                current = state.generation,
                ok = result.is_ok(),
                "discarding superseded response"
            );
            return result.map(|_| ());
        }

        match result {
            Ok(page) => {
                let received = page.records.len();
                match slot.merge {
                    Merge::Replace => state.records = page.records,
                    Merge::Append => state.records.extend(page.records),
                }
                state.cursor = page.pagination.into();
                state.last_outcome = Some(Outcome::Loaded);
                tracing::debug!(
                    received,
                    total = state.cursor.total_count,
                    page = state.cursor.current_page,
                    "page loaded"
                );
                drop(state);
                self.emit(CollectionEvent::ListChanged);
                Ok(())
            }
            Err(err) => {
                state.last_outcome = Some(Outcome::Failed);
                drop(state);
                tracing::warn!(error = %err, "loading records failed");
                Err(self.record_error(err))
            }
        }
    }

    /// Create a record and put the server's copy at the front of the list.
    pub async fn create(&self, draft: &RecordDraft) -> Result<BibliographyRecord> {
        draft.validate().map_err(|e| self.record_error(e))?;
        let _busy = self.hold(Flag::Busy);
        tracing::debug!(title = %draft.title, "creating record");

        let created = self
            .api
            .create(draft)
            .await
            .map_err(|e| self.mutation_failed("create", e))?;

        self.state.lock().records.insert(0, created.clone());
        self.succeeded();
        self.emit(CollectionEvent::ListChanged);
        Ok(created)
    }

    /// Replace a stored record wholesale. Fails before any request when the
    /// record was never created.
    pub async fn update(&self, record: &BibliographyRecord) -> Result<BibliographyRecord> {
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => return Err(self.record_error(BibError::MissingIdentifier)),
        };
        record.fields.validate().map_err(|e| self.record_error(e))?;
        let _busy = self.hold(Flag::Busy);
        tracing::debug!(id = %id, "updating record");

        let updated = self
            .api
            .update(&id, record)
            .await
            .map_err(|e| self.mutation_failed("update", e))?;

        let replaced = {
            let mut state = self.state.lock();
            match state.records.iter_mut().find(|r| r.has_id(&id)) {
                Some(slot) => {
                    *slot = updated.clone();
                    true
                }
                None => false,
            }
        };
        self.succeeded();
        if replaced {
            self.emit(CollectionEvent::ListChanged);
        }
        Ok(updated)
    }

    /// Delete a record remotely, then drop it from the list if it is loaded.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let _busy = self.hold(Flag::Busy);
        tracing::debug!(id, "deleting record");

        self.api
            .delete(id)
            .await
            .map_err(|e| self.mutation_failed("delete", e))?;

        let removed = {
            let mut state = self.state.lock();
            let before = state.records.len();
            state.records.retain(|r| !r.has_id(id));
            before != state.records.len()
        };
        self.succeeded();
        if removed {
            self.emit(CollectionEvent::ListChanged);
        }
        Ok(())
    }

    /// Fetch a single record from the server. The canonical list is left alone.
    pub async fn fetch(&self, id: &str) -> Result<BibliographyRecord> {
        match self.api.get(id).await {
            Ok(record) => {
                self.succeeded();
                Ok(record)
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "fetching record failed");
                Err(self.record_error(err))
            }
        }
    }

    fn emit(&self, event: CollectionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn guard(&self, flag: Flag) -> FlagGuard<'_> {
        FlagGuard {
            state: &self.state,
            events: &self.events,
            flag,
        }
    }

    fn hold(&self, flag: Flag) -> FlagGuard<'_> {
        let started = {
            let mut state = self.state.lock();
            let counter = state.counter(flag);
            *counter += 1;
            *counter == 1
        };
        if started {
            self.emit(flag.event(true));
        }
        self.guard(flag)
    }

    fn record_error(&self, err: BibError) -> BibError {
        let message = err.user_message();
        self.state.lock().error = Some(message.clone());
        self.emit(CollectionEvent::ErrorChanged(Some(message)));
        err
    }

    fn mutation_failed(&self, op: &str, err: BibError) -> BibError {
        tracing::warn!(op, error = %err, "mutation failed");
        self.record_error(err)
    }

    fn succeeded(&self) {
        let cleared = self.state.lock().error.take().is_some();
        if cleared {
            self.emit(CollectionEvent::ErrorChanged(None));
        }
    }
}
