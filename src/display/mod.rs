use owo_colors::OwoColorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::collection::PageCursor;
use crate::filter::FilterCriteria;
use crate::record::BibliographyRecord;

const TITLE_WIDTH: usize = 60;

/// A row in the record list table
#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Publication")]
    publication: String,
}

impl From<&BibliographyRecord> for RecordRow {
    fn from(record: &BibliographyRecord) -> Self {
        let fields = &record.fields;
        RecordRow {
            id: record.id().unwrap_or("-").to_string(),
            year: fields
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "-".to_string()),
            title: truncate(&fields.title, TITLE_WIDTH),
            author: fields.author.clone(),
            publication: fields.publication.clone().unwrap_or_default(),
        }
    }
}

pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// Records as a rounded table
pub fn format_record_table(records: &[BibliographyRecord]) -> String {
    let rows: Vec<RecordRow> = records.iter().map(RecordRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Single-line form used by `browse`
pub fn format_record_line(record: &BibliographyRecord) -> String {
    let id = format!("{:10}", record.id().unwrap_or("(unsaved)"));
    let year = record
        .fields
        .year
        .map(|y| format!("[{y}]"))
        .unwrap_or_else(|| "[----]".to_string());
    format!(
        "{} {} {} - {}",
        id.cyan(),
        year.yellow(),
        truncate(&record.fields.title, TITLE_WIDTH),
        record.fields.author.dimmed()
    )
}

/// Every populated field, one per line
pub fn format_record_detail(record: &BibliographyRecord) -> String {
    let f = &record.fields;
    let mut out = String::new();
    out.push_str(&format!("{}\n", f.title.bold()));
    out.push_str(&format!("{}\n\n", f.author));

    let year = f.year.map(|y| y.to_string());
    let rows: [(&str, Option<&str>); 15] = [
        ("id", record.id()),
        ("year", year.as_deref()),
        ("publication", f.publication.as_deref()),
        ("publisher", f.publisher.as_deref()),
        ("source", f.source.as_deref()),
        ("keywords", f.keywords.as_deref()),
        ("language published", f.language_published.as_deref()),
        ("language researched", f.language_researched.as_deref()),
        ("country of research", f.country_of_research.as_deref()),
        ("language family", f.language_family.as_deref()),
        ("isbn", f.isbn.as_deref()),
        ("issn", f.issn.as_deref()),
        ("url", f.url.as_deref()),
        ("date of entry", f.date_of_entry.as_deref()),
        ("created", record.created_at.as_deref()),
    ];
    for (label, value) in rows {
        if let Some(value) = value {
            out.push_str(&format!("{:>20}: {}\n", label.cyan(), value));
        }
    }
    if let Some(updated) = &record.updated_at {
        out.push_str(&format!("{:>20}: {}\n", "updated".cyan(), updated));
    }
    out.trim_end().to_string()
}

/// Footer under a listing: counts, and a hint only when more pages exist.
pub fn format_page_footer(cursor: &PageCursor, shown: usize) -> String {
    let mut footer = format!(
        "{} of {} record(s), page {} of {}",
        shown,
        cursor.total_count,
        cursor.current_page,
        cursor.total_pages.max(1)
    );
    if cursor.has_next_page {
        footer.push_str(&format!(
            "\n{}",
            format!("More pages available (next: page {})", cursor.current_page + 1).dimmed()
        ));
    }
    footer
}

/// "3 filters: year 1999, by Smith, ..." or an empty string
pub fn format_criteria(criteria: &FilterCriteria) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let mut parts = Vec::new();
    if let Some(year) = criteria.year {
        parts.push(format!("year {year}"));
    }
    match (criteria.year_from, criteria.year_to) {
        (Some(from), Some(to)) => parts.push(format!("years {from}-{to}")),
        (Some(from), None) => parts.push(format!("since {from}")),
        (None, Some(to)) => parts.push(format!("until {to}")),
        (None, None) => {}
    }
    for author in &criteria.authors {
        parts.push(format!("by {author}"));
    }
    for journal in &criteria.journals {
        parts.push(format!("in {journal}"));
    }
    for keyword in &criteria.keywords {
        parts.push(format!("#{keyword}"));
    }
    let count = criteria.active_count();
    let noun = if count == 1 { "filter" } else { "filters" };
    if parts.is_empty() {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}: {}", parts.join(", "))
    }
}
