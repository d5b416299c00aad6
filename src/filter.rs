//! Structured narrowing of the record list.
//!
//! [`FilterCriteria`] is replaced wholesale on every change. It is applied
//! locally when no free-text query is active and serialized into query
//! parameters for the remote search endpoint otherwise.

use std::collections::BTreeSet;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use unicase::UniCase;

use crate::record::BibliographyRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_from: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_to: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub authors: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub journals: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub keywords: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_researched: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_of_research: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_to: Option<Date>,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.year_from.is_none()
            && self.year_to.is_none()
            && self.authors.is_empty()
            && self.journals.is_empty()
            && self.keywords.is_empty()
            && self.exact_fields().iter().all(|(_, v)| v.is_none())
            && self.created_from.is_none()
            && self.created_to.is_none()
    }

    /// Number of active criteria, for "3 filters" style badges.
    pub fn active_count(&self) -> usize {
        let singles = [
            self.year.is_some(),
            self.year_from.is_some() || self.year_to.is_some(),
            !self.authors.is_empty(),
            !self.journals.is_empty(),
            !self.keywords.is_empty(),
            self.created_from.is_some() || self.created_to.is_some(),
        ];
        singles.iter().filter(|b| **b).count()
            + self
                .exact_fields()
                .iter()
                .filter(|(_, v)| v.is_some())
                .count()
    }

    /// Exact-match secondary fields, keyed by their wire name.
    fn exact_fields(&self) -> [(&'static str, Option<&str>); 5] {
        [
            ("languagePublished", self.language_published.as_deref()),
            ("languageResearched", self.language_researched.as_deref()),
            ("countryOfResearch", self.country_of_research.as_deref()),
            ("languageFamily", self.language_family.as_deref()),
            ("source", self.source.as_deref()),
        ]
    }

    /// Local predicate: every active criterion must hold.
    pub fn matches(&self, record: &BibliographyRecord) -> bool {
        let fields = &record.fields;

        if let Some(year) = self.year
            && fields.year != Some(year)
        {
            return false;
        }

        if self.year_from.is_some() || self.year_to.is_some() {
            let Some(year) = fields.year else {
                return false;
            };
            if self.year_from.is_some_and(|from| year < from)
                || self.year_to.is_some_and(|to| year > to)
            {
                return false;
            }
        }

        if !self.authors.is_empty() {
            let author = fields.author.to_lowercase();
            if !self
                .authors
                .iter()
                .any(|a| author.contains(&a.to_lowercase()))
            {
                return false;
            }
        }

        if !self.journals.is_empty() {
            let Some(publication) = fields.publication.as_deref() else {
                return false;
            };
            let publication = UniCase::new(publication.trim());
            if !self
                .journals
                .iter()
                .any(|j| UniCase::new(j.trim()) == publication)
            {
                return false;
            }
        }

        if !self.keywords.is_empty() {
            let keywords = fields.keywords.as_deref().unwrap_or("").to_lowercase();
            if !self
                .keywords
                .iter()
                .any(|k| keywords.contains(&k.to_lowercase()))
            {
                return false;
            }
        }

        let record_exact = [
            fields.language_published.as_deref(),
            fields.language_researched.as_deref(),
            fields.country_of_research.as_deref(),
            fields.language_family.as_deref(),
            fields.source.as_deref(),
        ];
        for ((_, wanted), actual) in self.exact_fields().iter().zip(record_exact) {
            if let Some(wanted) = wanted {
                match actual {
                    Some(actual) if UniCase::new(actual.trim()) == UniCase::new(wanted.trim()) => {}
                    _ => return false,
                }
            }
        }

        // Undated records are left to the server-side date filter.
        if (self.created_from.is_some() || self.created_to.is_some())
            && let Some(created) = record.created_on()
        {
            if self.created_from.is_some_and(|from| created < from)
                || self.created_to.is_some_and(|to| created > to)
            {
                return false;
            }
        }

        true
    }

    /// Query parameters for the remote search endpoint.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(year) = self.year {
            pairs.push(("year", year.to_string()));
        }
        if let Some(from) = self.year_from {
            pairs.push(("yearFrom", from.to_string()));
        }
        if let Some(to) = self.year_to {
            pairs.push(("yearTo", to.to_string()));
        }
        for (key, set) in [
            ("authors", &self.authors),
            ("journals", &self.journals),
            ("keywords", &self.keywords),
        ] {
            // One pair per member; author names carry commas of their own
            pairs.extend(set.iter().map(|value| (key, value.clone())));
        }
        for (key, value) in self.exact_fields() {
            if let Some(value) = value {
                pairs.push((key, value.to_string()));
            }
        }
        if let Some(from) = self.created_from {
            pairs.push(("createdFrom", from.to_string()));
        }
        if let Some(to) = self.created_to {
            pairs.push(("createdTo", to.to_string()));
        }
        pairs
    }
}

/// Case-insensitive substring search over the fields a user is likely to type.
pub fn matches_text(record: &BibliographyRecord, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    let fields = &record.fields;
    [
        Some(fields.title.as_str()),
        Some(fields.author.as_str()),
        fields.keywords.as_deref(),
        fields.publication.as_deref(),
        fields.source.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|value| value.to_lowercase().contains(&query))
}

/// Records passing both the text query and the criteria, in list order.
pub fn filter_records(
    records: &[BibliographyRecord],
    query: &str,
    criteria: &FilterCriteria,
) -> Vec<BibliographyRecord> {
    if query.trim().is_empty() && criteria.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| matches_text(r, query) && criteria.matches(r))
        .cloned()
        .collect()
}
