//! Access to the remote bibliography collection.
//!
//! [`BibliographyApi`] is the seam between the collection state and the
//! network. [`http::HttpBackend`] talks to the real service;
//! [`memory::MemoryBackend`] keeps everything in process.

pub mod auth;
pub mod error;
pub mod http;
pub mod memory;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BibError, Result};
use crate::filter::FilterCriteria;
use crate::record::{BibliographyRecord, RecordDraft};

pub use auth::{StaticToken, TokenSource};
pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Pagination block of a list or search response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
}

fn first_page() -> u32 {
    1
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: first_page(),
            total_count: 0,
            total_pages: 0,
            has_next_page: false,
            has_previous_page: false,
        }
    }
}

/// Search parameters echoed back by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDescriptor {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub filters: Option<serde_json::Value>,
}

/// One page of records, from either the list or the search endpoint
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    pub records: Vec<BibliographyRecord>,
    pub pagination: Pagination,
    pub search: Option<SearchDescriptor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<ListData>,
    #[serde(default)]
    pub search: Option<SearchDescriptor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListData {
    #[serde(default, alias = "items")]
    pub bibliographies: Vec<BibliographyRecord>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordEnvelope {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<BibliographyRecord>,
    #[serde(default)]
    #[allow(dead_code)]
    pub timestamp: Option<String>,
}

fn default_success() -> bool {
    true
}

impl ListEnvelope {
    pub(crate) fn into_page(self) -> Result<RecordPage> {
        if !self.success {
            return Err(BibError::Api(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        let data = self
            .data
            .ok_or_else(|| BibError::Decoding("list response has no data".to_string()))?;
        Ok(RecordPage {
            records: data.bibliographies,
            pagination: data.pagination,
            search: self.search,
        })
    }
}

impl RecordEnvelope {
    pub(crate) fn into_record(self) -> Result<BibliographyRecord> {
        if !self.success {
            return Err(BibError::Api(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| BibError::Decoding("response has no record".to_string()))
    }
}

/// Operations offered by the remote bibliography collection
pub trait BibliographyApi: Send + Sync {
    /// `GET /bibliography?page&limit`
    fn list_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<RecordPage>> + Send;

    /// `GET /bibliography/search?q&page&limit&<filters>`
    fn search(
        &self,
        query: &str,
        criteria: &FilterCriteria,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<RecordPage>> + Send;

    /// `GET /bibliography/{id}`
    fn get(&self, id: &str) -> impl Future<Output = Result<BibliographyRecord>> + Send;

    /// `POST /bibliography`
    fn create(
        &self,
        draft: &RecordDraft,
    ) -> impl Future<Output = Result<BibliographyRecord>> + Send;

    /// `PUT /bibliography/{id}`
    fn update(
        &self,
        id: &str,
        record: &BibliographyRecord,
    ) -> impl Future<Output = Result<BibliographyRecord>> + Send;

    /// `DELETE /bibliography/{id}`
    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<T: BibliographyApi> BibliographyApi for Arc<T> {
    fn list_page(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<RecordPage>> + Send {
        (**self).list_page(page, limit)
    }

    fn search(
        &self,
        query: &str,
        criteria: &FilterCriteria,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<RecordPage>> + Send {
        (**self).search(query, criteria, page, limit)
    }

    fn get(&self, id: &str) -> impl Future<Output = Result<BibliographyRecord>> + Send {
        (**self).get(id)
    }

    fn create(
        &self,
        draft: &RecordDraft,
    ) -> impl Future<Output = Result<BibliographyRecord>> + Send {
        (**self).create(draft)
    }

    fn update(
        &self,
        id: &str,
        record: &BibliographyRecord,
    ) -> impl Future<Output = Result<BibliographyRecord>> + Send {
        (**self).update(id, record)
    }

    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).delete(id)
    }
}
