//! HTTP implementation of [`BibliographyApi`] using `reqwest`.
//!
//! # Security Note - Logging
//!
//! The bearer token is read from the [`TokenSource`] per request and is never
//! logged. Avoid `RUST_LOG=reqwest=trace` in production, which would dump
//! headers.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::{BibError, Result};
use crate::filter::FilterCriteria;
use crate::record::{BibliographyRecord, RecordDraft};

use super::auth::{StaticToken, TokenSource, bearer_header};
use super::error::classify_status;
use super::{BibliographyApi, ListEnvelope, RecordEnvelope, RecordPage};

const COLLECTION_PATH: &str = "bibliography";

/// Client for the remote bibliography service
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl HttpBackend {
    /// Build a backend from configuration.
    ///
    /// The token comes from config or `BIBKEEPER_TOKEN`; without one, requests
    /// are sent unauthenticated.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let tokens: Arc<dyn TokenSource> = Arc::new(StaticToken::new(config.token()));
        Self::new(
            base_url,
            tokens,
            Duration::from_secs(config.request_timeout),
            Duration::from_secs(config.connect_timeout),
        )
    }

    pub fn new(
        base_url: Url,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(BibError::InvalidRequest(format!(
                "'{base_url}' cannot be used as a base URL"
            )));
        }
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/bibliography/<segments...>`, with each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                BibError::InvalidRequest(format!("'{}' cannot be a base URL", self.base_url))
            })?;
            path.pop_if_empty().push(COLLECTION_PATH);
            for segment in segments {
                if segment.is_empty() {
                    return Err(BibError::InvalidRequest(
                        "empty path segment in request".to_string(),
                    ));
                }
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match self.tokens.bearer_token() {
            Some(token) => builder.header(header::AUTHORIZATION, bearer_header(&token)),
            None => builder,
        }
    }

    /// `GET /bibliography/search`. Set criteria repeat their key once per member.
    fn search_request(
        &self,
        query: &str,
        criteria: &FilterCriteria,
        page: u32,
        limit: u32,
    ) -> Result<RequestBuilder> {
        let url = self.endpoint(&["search"])?;
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("page", page.to_string()),
            ("limit", limit.to_string()),
        ];
        params.extend(criteria.query_pairs());
        Ok(self.request(Method::GET, url).query(&params))
    }

    async fn send(&self, builder: RequestBuilder, resource: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(%status, resource, "bibliography request failed");
        Err(classify_status(status, &body, resource))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BibError::Decoding(e.to_string()))
    }
}

impl BibliographyApi for HttpBackend {
    async fn list_page(&self, page: u32, limit: u32) -> Result<RecordPage> {
        let url = self.endpoint(&[])?;
        tracing::debug!(page, limit, "listing bibliography page");
        let builder = self
            .request(Method::GET, url)
            .query(&[("page", page), ("limit", limit)]);
        let response = self.send(builder, "/bibliography").await?;
        Self::decode::<ListEnvelope>(response).await?.into_page()
    }

    async fn search(
        &self,
        query: &str,
        criteria: &FilterCriteria,
        page: u32,
        limit: u32,
    ) -> Result<RecordPage> {
        tracing::debug!(query, page, filters = criteria.active_count(), "searching bibliography");
        let builder = self.search_request(query, criteria, page, limit)?;
        let response = self.send(builder, "/bibliography/search").await?;
        Self::decode::<ListEnvelope>(response).await?.into_page()
    }

    async fn get(&self, id: &str) -> Result<BibliographyRecord> {
        let url = self.endpoint(&[id])?;
        let response = self
            .send(self.request(Method::GET, url), &format!("/bibliography/{id}"))
            .await?;
        Self::decode::<RecordEnvelope>(response).await?.into_record()
    }

    async fn create(&self, draft: &RecordDraft) -> Result<BibliographyRecord> {
        let url = self.endpoint(&[])?;
        let body = draft.payload()?;
        tracing::debug!(fields = body.len(), "creating bibliography record");
        let builder = self.request(Method::POST, url).json(&body);
        let response = self.send(builder, "/bibliography").await?;
        Self::decode::<RecordEnvelope>(response).await?.into_record()
    }

    async fn update(&self, id: &str, record: &BibliographyRecord) -> Result<BibliographyRecord> {
        let url = self.endpoint(&[id])?;
        let body = record.fields.payload()?;
        tracing::debug!(id, fields = body.len(), "updating bibliography record");
        let builder = self.request(Method::PUT, url).json(&body);
        let response = self.send(builder, &format!("/bibliography/{id}")).await?;
        Self::decode::<RecordEnvelope>(response).await?.into_record()
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.endpoint(&[id])?;
        tracing::debug!(id, "deleting bibliography record");
        // Success carries no body; anything returned is ignored.
        self.send(
            self.request(Method::DELETE, url),
            &format!("/bibliography/{id}"),
        )
        .await?;
        Ok(())
    }
}
