pub mod cli;
pub mod collection;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod filter;
pub mod projector;
pub mod record;
pub mod remote;

#[cfg(test)]
mod test_guards;

pub use collection::{Collection, CollectionEvent, LoadPhase, PageCursor};
pub use config::Config;
pub use error::{BibError, Result};
pub use filter::{FilterCriteria, filter_records, matches_text};
pub use projector::{Projector, ViewInputs};
pub use record::{BibliographyRecord, RecordDraft, RecordFields, parse_wire_timestamp};
pub use remote::{
    BibliographyApi, HttpBackend, MemoryBackend, Pagination, RecordPage, StaticToken, TokenSource,
};
