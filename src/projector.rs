//! The list a viewer actually sees.
//!
//! A [`Projector`] sits between the inputs a user edits (a free-text query
//! and [`FilterCriteria`]) and a [`Collection`]. Input changes are debounced
//! as one combined signal; once they settle, an empty query refreshes the
//! collection and filters locally, and a non-empty query runs a remote search
//! whose results are shown as they arrive.
//!
//! The projector never writes the canonical list. It only reacts to
//! [`CollectionEvent::ListChanged`] and republishes the visible list on a
//! `watch` channel.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use crate::collection::{Collection, CollectionEvent};
use crate::error::Result;
use crate::filter::{FilterCriteria, filter_records};
use crate::record::{BibliographyRecord, RecordDraft};
use crate::remote::BibliographyApi;

/// Query and criteria, treated as one signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewInputs {
    pub query: String,
    pub criteria: FilterCriteria,
}

impl ViewInputs {
    pub fn new(query: impl Into<String>, criteria: FilterCriteria) -> Self {
        Self {
            query: query.into(),
            criteria,
        }
    }

    /// True when the visible list comes from a remote search.
    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Equal once surrounding whitespace in the query is ignored.
    fn settles_like(&self, other: &ViewInputs) -> bool {
        self.query.trim() == other.query.trim() && self.criteria == other.criteria
    }
}

/// State shared with the background tasks
struct Shared {
    settled: Mutex<ViewInputs>,
    visible: watch::Sender<Vec<BibliographyRecord>>,
}

impl Shared {
    fn republish<A: BibliographyApi>(&self, collection: &Collection<A>) {
        let settled = self.settled.lock().clone();
        let records = collection.records();
        let visible = if settled.has_query() {
            records
        } else {
            filter_records(&records, "", &settled.criteria)
        };
        tracing::trace!(count = visible.len(), "visible list republished");
        self.visible.send_replace(visible);
    }
}

pub struct Projector<A> {
    collection: Arc<Collection<A>>,
    latest: Mutex<ViewInputs>,
    inputs: mpsc::UnboundedSender<ViewInputs>,
    shared: Arc<Shared>,
    debounce_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
}

impl<A: BibliographyApi + 'static> Projector<A> {
    /// Start projecting `collection`. Must be called inside a tokio runtime.
    ///
    /// The visible list starts as the collection's current records.
    pub fn spawn(collection: Arc<Collection<A>>, debounce: Duration) -> Self {
        let (inputs, input_rx) = mpsc::unbounded_channel();
        let (visible, _) = watch::channel(collection.records());
        let shared = Arc::new(Shared {
            settled: Mutex::new(ViewInputs::default()),
            visible,
        });

        // Subscribe before spawning so no event can slip past
        let events = collection.subscribe();
        let listener_task = tokio::spawn(run_listener(
            events,
            Arc::clone(&collection),
            Arc::clone(&shared),
        ));
        let debounce_task = tokio::spawn(run_debounce(
            input_rx,
            Arc::clone(&collection),
            Arc::clone(&shared),
            debounce,
        ));

        Self {
            collection,
            latest: Mutex::new(ViewInputs::default()),
            inputs,
            shared,
            debounce_task,
            listener_task,
        }
    }

    pub fn collection(&self) -> &Arc<Collection<A>> {
        &self.collection
    }

    pub fn set_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.update_inputs(|inputs| inputs.query = query);
    }

    pub fn set_criteria(&self, criteria: FilterCriteria) {
        self.update_inputs(|inputs| inputs.criteria = criteria);
    }

    pub fn set_inputs(&self, query: impl Into<String>, criteria: FilterCriteria) {
        let next = ViewInputs::new(query, criteria);
        self.update_inputs(|inputs| *inputs = next);
    }

    fn update_inputs(&self, apply: impl FnOnce(&mut ViewInputs)) {
        let snapshot = {
            let mut latest = self.latest.lock();
            let before = latest.clone();
            apply(&mut *latest);
            if latest.settles_like(&before) {
                return;
            }
            latest.clone()
        };
        // Only fails once the debounce task is gone, i.e. during drop
        let _ = self.inputs.send(snapshot);
    }

    /// The most recently entered query, settled or not
    pub fn query(&self) -> String {
        self.latest.lock().query.clone()
    }

    /// The most recently entered criteria, settled or not
    pub fn criteria(&self) -> FilterCriteria {
        self.latest.lock().criteria.clone()
    }

    /// The inputs the visible list currently reflects
    pub fn settled(&self) -> ViewInputs {
        self.shared.settled.lock().clone()
    }

    pub fn visible(&self) -> Vec<BibliographyRecord> {
        self.shared.visible.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<BibliographyRecord>> {
        self.shared.visible.subscribe()
    }

    /// Search-as-you-type over the records already loaded, narrowed by the
    /// settled criteria. No request is made.
    pub fn local_search(&self, text: &str) -> Vec<BibliographyRecord> {
        let criteria = self.shared.settled.lock().criteria.clone();
        filter_records(&self.collection.records(), text, &criteria)
    }

    /// Run the settled inputs again right away (pull to refresh, retry).
    pub async fn reload(&self) -> Result<()> {
        let settled = self.settled();
        reconcile(&self.collection, &settled).await
    }

    pub async fn create(&self, draft: &RecordDraft) -> Result<BibliographyRecord> {
        self.collection.create(draft).await
    }

    pub async fn update(&self, record: &BibliographyRecord) -> Result<BibliographyRecord> {
        self.collection.update(record).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.collection.delete(id).await
    }
}

impl<A> Drop for Projector<A> {
    fn drop(&mut self) {
        self.debounce_task.abort();
        self.listener_task.abort();
    }
}

async fn reconcile<A: BibliographyApi>(
    collection: &Collection<A>,
    inputs: &ViewInputs,
) -> Result<()> {
    if inputs.has_query() {
        collection.search(inputs.query.trim(), &inputs.criteria).await
    } else {
        collection.refresh().await
    }
}

/// Wait for the first input change, then keep draining until the inputs
/// have been quiet for `debounce`. Only the last value of a burst is acted on.
async fn run_debounce<A: BibliographyApi + 'static>(
    mut rx: mpsc::UnboundedReceiver<ViewInputs>,
    collection: Arc<Collection<A>>,
    shared: Arc<Shared>,
    debounce: Duration,
) {
    while let Some(mut latest) = rx.recv().await {
        loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(next)) => latest = next,
                // Projector dropped
                Ok(None) => return,
                // Quiet period elapsed
                Err(_) => break,
            }
        }

        tracing::debug!(
            query = %latest.query,
            filters = latest.criteria.active_count(),
            "inputs settled"
        );
        *shared.settled.lock() = latest.clone();
        if !latest.has_query() {
            // Criteria apply locally straight away; the refresh follows
            shared.republish(&collection);
        }

        let collection = Arc::clone(&collection);
        tokio::spawn(async move {
            if let Err(e) = reconcile(&collection, &latest).await {
                tracing::debug!(error = %e, "reconcile failed");
            }
        });
    }
}

async fn run_listener<A: BibliographyApi>(
    mut events: broadcast::Receiver<CollectionEvent>,
    collection: Arc<Collection<A>>,
    shared: Arc<Shared>,
) {
    loop {
        match events.recv().await {
            Ok(CollectionEvent::ListChanged) => shared.republish(&collection),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "collection events lagged");
                shared.republish(&collection);
            }
            Err(RecvError::Closed) => break,
        }
    }
}
