#![allow(dead_code)]

use std::process::{Command, Output};
use std::sync::Arc;

use tempfile::TempDir;

use bibkeeper::{BibliographyRecord, Collection, MemoryBackend, RecordFields};

/// Runs the `bibkeeper` binary against a config file in a temp directory.
///
/// The environment is set on the child process only, so these tests do not
/// need to be serialized.
pub struct BibkeeperTest {
    pub temp_dir: TempDir,
}

impl BibkeeperTest {
    pub fn new() -> Self {
        BibkeeperTest {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_bibkeeper"))
            .args(args)
            .current_dir(self.temp_dir.path())
            .env("BIBKEEPER_CONFIG", self.config_path())
            .env_remove("BIBKEEPER_URL")
            .env_remove("BIBKEEPER_TOKEN")
            .env_remove("BIBKEEPER_LOG")
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute bibkeeper command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }
}

/// A stored record with the given id and fields
pub fn stored(id: &str, fields: RecordFields) -> BibliographyRecord {
    BibliographyRecord {
        id: Some(id.to_string()),
        fields,
        created_at: Some("2024-03-01T10:00:00.000Z".to_string()),
        updated_at: None,
    }
}

/// A small, varied library for filter tests
pub fn library() -> Vec<BibliographyRecord> {
    vec![
        stored(
            "b1",
            RecordFields {
                year: Some(1998),
                publication: Some("Journal of Phonetics".to_string()),
                keywords: Some("tone, prosody".to_string()),
                language_published: Some("English".to_string()),
                ..RecordFields::new("Tone in Yoruba", "Akinlabi, Akinbiyi")
            },
        ),
        stored(
            "b2",
            RecordFields {
                year: Some(2005),
                publication: Some("Language".to_string()),
                keywords: Some("syntax".to_string()),
                language_published: Some("French".to_string()),
                ..RecordFields::new("Clitics revisited", "Smith, Anna")
            },
        ),
        stored(
            "b3",
            RecordFields {
                year: Some(2012),
                publication: Some("journal of phonetics".to_string()),
                keywords: Some("vowels,prosody".to_string()),
                ..RecordFields::new("Vowel harmony", "Smith, Bo")
            },
        ),
        stored("b4", RecordFields::new("Undated notes", "Doe, J.")),
    ]
}

pub fn memory_collection(
    records: Vec<BibliographyRecord>,
    page_size: u32,
) -> Arc<Collection<MemoryBackend>> {
    Arc::new(Collection::new(
        MemoryBackend::with_records(records),
        page_size,
    ))
}
