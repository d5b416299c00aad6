use std::collections::BTreeSet;

use clap::{Args, Parser, Subcommand};
use jiff::civil::Date;

use crate::filter::FilterCriteria;
use crate::record::RecordFields;

#[derive(Parser)]
#[command(name = "bibkeeper")]
#[command(about = "Browse and edit a remote bibliography collection")]
#[command(version)]
pub struct Cli {
    /// Log requests and state changes to stderr (same as BIBKEEPER_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format shared by every command
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputOptions {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List records, page by page
    #[command(visible_alias = "ls")]
    List {
        /// Page to load (default: 1)
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Keep loading until the last page
        #[arg(long, conflicts_with = "page")]
        all: bool,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Search the collection on the server
    #[command(visible_alias = "s")]
    Search {
        /// Free-text query
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Show a single record
    Show {
        /// Record identifier
        id: String,

        /// Look the record up in the first page instead of asking for it
        #[arg(long)]
        local: bool,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Create a record
    #[command(visible_alias = "new")]
    Add {
        #[command(flatten)]
        fields: RecordArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Change fields of an existing record
    Edit {
        /// Record identifier
        id: String,

        #[command(flatten)]
        fields: RecordArgs,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Delete a record
    #[command(visible_alias = "delete")]
    Rm {
        /// Record identifier
        id: String,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Interactive search: each line typed on stdin becomes the query
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show {
        #[command(flatten)]
        output: OutputOptions,
    },

    /// Print one configuration value
    Get {
        /// Key (base_url, page_size, request_timeout, connect_timeout, search_debounce_ms, auth.token)
        key: String,

        #[command(flatten)]
        output: OutputOptions,
    },

    /// Set one configuration value
    Set {
        /// Key (base_url, page_size, request_timeout, connect_timeout, search_debounce_ms, auth.token)
        key: String,

        /// New value
        value: String,

        #[command(flatten)]
        output: OutputOptions,
    },
}

/// Structured filters, shared by `list`, `search` and `browse`
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Exact publication year
    #[arg(long)]
    pub year: Option<i32>,

    /// Earliest publication year (inclusive)
    #[arg(long)]
    pub year_from: Option<i32>,

    /// Latest publication year (inclusive)
    #[arg(long)]
    pub year_to: Option<i32>,

    /// Author name or part of it (repeatable, any may match)
    #[arg(long = "by")]
    pub authors: Vec<String>,

    /// Journal or venue (repeatable, any may match)
    #[arg(long = "journal")]
    pub journals: Vec<String>,

    /// Keyword (repeatable, any may match)
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    #[arg(long)]
    pub language_published: Option<String>,

    #[arg(long)]
    pub language_researched: Option<String>,

    #[arg(long = "country")]
    pub country_of_research: Option<String>,

    #[arg(long)]
    pub language_family: Option<String>,

    /// Where the entry came from
    #[arg(long = "from-source")]
    pub source: Option<String>,

    /// Created on or after (YYYY-MM-DD)
    #[arg(long)]
    pub created_from: Option<Date>,

    /// Created on or before (YYYY-MM-DD)
    #[arg(long)]
    pub created_to: Option<Date>,
}

impl FilterArgs {
    pub fn into_criteria(self) -> FilterCriteria {
        let clean = |values: Vec<String>| -> BTreeSet<String> {
            values
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect()
        };
        FilterCriteria {
            year: self.year,
            year_from: self.year_from,
            year_to: self.year_to,
            authors: clean(self.authors),
            journals: clean(self.journals),
            keywords: clean(self.keywords),
            language_published: self.language_published,
            language_researched: self.language_researched,
            country_of_research: self.country_of_research,
            language_family: self.language_family,
            source: self.source,
            created_from: self.created_from,
            created_to: self.created_to,
        }
    }
}

/// Record fields settable from the command line
#[derive(Debug, Clone, Default, Args)]
pub struct RecordArgs {
    #[arg(short, long)]
    pub title: Option<String>,

    #[arg(short, long)]
    pub author: Option<String>,

    #[arg(short, long)]
    pub year: Option<i32>,

    /// Journal or venue
    #[arg(long)]
    pub publication: Option<String>,

    #[arg(long)]
    pub publisher: Option<String>,

    #[arg(long)]
    pub source: Option<String>,

    /// Comma-separated keywords
    #[arg(short, long)]
    pub keywords: Option<String>,

    #[arg(long)]
    pub language_published: Option<String>,

    #[arg(long)]
    pub language_researched: Option<String>,

    #[arg(long = "country")]
    pub country_of_research: Option<String>,

    #[arg(long)]
    pub language_family: Option<String>,

    #[arg(long)]
    pub isbn: Option<String>,

    #[arg(long)]
    pub issn: Option<String>,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long)]
    pub date_of_entry: Option<String>,
}

impl RecordArgs {
    /// True when no field was given at all
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.year.is_none()
            && [
                &self.publication,
                &self.publisher,
                &self.source,
                &self.keywords,
                &self.language_published,
                &self.language_researched,
                &self.country_of_research,
                &self.language_family,
                &self.isbn,
                &self.issn,
                &self.url,
                &self.date_of_entry,
            ]
            .iter()
            .all(|v| v.is_none())
    }

    /// Overwrite the given fields of `fields`. An empty string clears an
    /// optional field.
    pub fn apply_to(self, fields: &mut RecordFields) {
        fn set(slot: &mut Option<String>, value: Option<String>) {
            if let Some(value) = value {
                let value = value.trim().to_string();
                *slot = (!value.is_empty()).then_some(value);
            }
        }

        if let Some(title) = self.title {
            fields.title = title;
        }
        if let Some(author) = self.author {
            fields.author = author;
        }
        if self.year.is_some() {
            fields.year = self.year;
        }
        set(&mut fields.publication, self.publication);
        set(&mut fields.publisher, self.publisher);
        set(&mut fields.source, self.source);
        set(&mut fields.keywords, self.keywords);
        set(&mut fields.language_published, self.language_published);
        set(&mut fields.language_researched, self.language_researched);
        set(&mut fields.country_of_research, self.country_of_research);
        set(&mut fields.language_family, self.language_family);
        set(&mut fields.isbn, self.isbn);
        set(&mut fields.issn, self.issn);
        set(&mut fields.url, self.url);
        set(&mut fields.date_of_entry, self.date_of_entry);
    }

    pub fn into_draft(self) -> RecordFields {
        let mut draft = RecordFields::default();
        self.apply_to(&mut draft);
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_filter_args_to_criteria() {
        let cli = Cli::try_parse_from([
            "bibkeeper",
            "list",
            "--by",
            "Smith",
            "--by",
            " ",
            "--year-from",
            "1990",
            "--created-from",
            "2024-01-31",
        ])
        .unwrap();
        let Commands::List { filters, .. } = cli.command else {
            panic!("expected list");
        };
        let criteria = filters.into_criteria();
        assert_eq!(criteria.authors.len(), 1);
        assert_eq!(criteria.year_from, Some(1990));
        assert_eq!(criteria.created_from, Some(jiff::civil::date(2024, 1, 31)));
    }

    #[test]
    fn test_record_args_clear_and_set() {
        let mut fields = RecordFields {
            publisher: Some("Old Press".to_string()),
            ..RecordFields::new("T", "A")
        };
        RecordArgs {
            publisher: Some(String::new()),
            isbn: Some("978-3".to_string()),
            ..Default::default()
        }
        .apply_to(&mut fields);
        assert_eq!(fields.publisher, None);
        assert_eq!(fields.isbn.as_deref(), Some("978-3"));
        assert_eq!(fields.title, "T");
    }

    #[test]
    fn test_json_flag_after_positional() {
        let cli = Cli::try_parse_from(["bibkeeper", "show", "abc", "--json"]).unwrap();
        let Commands::Show { output, .. } = cli.command else {
            panic!("expected show");
        };
        assert!(output.json);
    }
}
