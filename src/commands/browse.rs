//! Interactive browsing on top of a [`Projector`].
//!
//! Every line read from stdin replaces the query. Lines are debounced like
//! keystrokes, so pasting several lines quickly runs a single search. A few
//! lines are commands instead of queries:
//!
//! - `:more` loads the next page
//! - `:refresh` runs the current inputs again
//! - `:q` (or end of input) quits

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::collection::{Collection, CollectionEvent};
use crate::display::{format_criteria, format_page_footer, format_record_line};
use crate::error::Result;
use crate::filter::FilterCriteria;
use crate::projector::Projector;
use crate::record::BibliographyRecord;
use crate::remote::BibliographyApi;

/// Lines printed per update before eliding the rest
const MAX_LINES: usize = 25;

pub async fn cmd_browse<A: BibliographyApi + 'static>(
    collection: Arc<Collection<A>>,
    criteria: FilterCriteria,
    debounce: Duration,
) -> Result<()> {
    let mut events = collection.subscribe();
    let projector = Projector::spawn(collection, debounce);
    let mut visible = projector.subscribe();

    let summary = format_criteria(&criteria);
    projector.set_criteria(criteria);
    if let Err(e) = projector.reload().await {
        eprintln!("{}", e.user_message().red());
    }
    if !summary.is_empty() {
        eprintln!("{}", summary.dimmed());
    }
    eprintln!(
        "{}",
        "Type to search, :more for the next page, :q to quit".dimmed()
    );
    print_visible(&projector.visible(), &projector);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    ":q" | ":quit" => break,
                    ":more" => {
                        // Failures surface through ErrorChanged below
                        let _ = projector.collection().load_next().await;
                    }
                    ":refresh" => {
                        let _ = projector.reload().await;
                    }
                    query => projector.set_query(query),
                }
            }
            changed = visible.changed() => {
                if changed.is_err() {
                    break;
                }
                let records = visible.borrow_and_update().clone();
                print_visible(&records, &projector);
            }
            event = events.recv() => match event {
                Ok(CollectionEvent::ErrorChanged(Some(message))) => {
                    eprintln!("{}", message.red());
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

fn print_visible<A: BibliographyApi + 'static>(
    records: &[BibliographyRecord],
    projector: &Projector<A>,
) {
    let settled = projector.settled();
    let heading = if settled.has_query() {
        format!("Results for \"{}\"", settled.query.trim())
    } else {
        "All records".to_string()
    };
    println!("\n{}", heading.bold());
    for record in records.iter().take(MAX_LINES) {
        println!("{}", format_record_line(record));
    }
    if records.len() > MAX_LINES {
        println!("{}", format!("... {} more", records.len() - MAX_LINES).dimmed());
    }
    println!(
        "{}",
        format_page_footer(&projector.collection().cursor(), records.len())
    );
}
