//! Core data structures for the mkdown application.
//!
//! This module contains the note metadata record stored in the index and the
//! timestamp format shared by every record.
use std::fmt;

use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// On-disk timestamp format, e.g. `2024-05-01-13-45-09`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Title used when a note is created with a blank title.
pub const DEFAULT_TITLE: &str = "No Title";

/// Longest filename stem derived from a title, in bytes. Leaves room for a
/// uuid suffix and the extension within the usual 255-byte name limit.
pub const MAX_STEM_BYTES: usize = 100;

/// Local wall-clock time with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        Timestamp(now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map(Timestamp)
    }

    pub fn as_datetime(&self) -> NaiveDateTime {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(|e| {
            serde::de::Error::custom(format!("invalid timestamp '{}': {}", raw, e))
        })
    }
}

/// The two editors a note can be opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Plain,
    Markdown,
}

impl NoteKind {
    /// File extension (with the dot) for content files of this kind
    pub fn extension(&self) -> &'static str {
        match self {
            NoteKind::Plain => ".txt",
            NoteKind::Markdown => ".md",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteKind::Plain => write!(f, "plain"),
            NoteKind::Markdown => write!(f, "markdown"),
        }
    }
}

/// Metadata for a single note. The text itself lives in `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Display title
    pub title: String,
    /// Content filename, relative to the index base path
    pub file: String,
    /// Unique identifier for the note
    pub uuid: String,
    /// When the note was created
    pub created: Timestamp,
    /// Last time the content actually changed
    pub edited: Timestamp,
    /// Older index files have no type field; those notes are plain text.
    #[serde(rename = "type", default)]
    pub kind: NoteKind,
}

impl NoteRecord {
    /// Creates a record stamped with the current time and a fresh uuid.
    ///
    /// Blank titles fall back to [`DEFAULT_TITLE`]. The filename is left empty;
    /// the index assigns one that is unique within it.
    pub fn new(title: &str, kind: NoteKind) -> Self {
        let title = if title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            title.to_string()
        };
        let now = Timestamp::now();

        NoteRecord {
            title,
            file: String::new(),
            uuid: Uuid::new_v4().to_string(),
            created: now,
            edited: now,
            kind,
        }
    }

    /// Labelled metadata, in the order the info panel shows it.
    pub fn info(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Title", self.title.clone()),
            ("File", self.file.clone()),
            ("UUID", self.uuid.clone()),
            ("Created", self.created.to_string()),
            ("Edited", self.edited.to_string()),
            ("Type", self.kind.to_string()),
        ]
    }
}

/// Derives a content filename from a title: spaces and path separators become
/// underscores, the stem is cut to [`MAX_STEM_BYTES`] on a char boundary and
/// the extension follows the note kind.
pub fn file_name_for(title: &str, kind: NoteKind) -> String {
    let mut stem = String::with_capacity(title.len().min(MAX_STEM_BYTES));
    for c in title.chars() {
        if stem.len() + c.len_utf8() > MAX_STEM_BYTES {
            break;
        }
        stem.push(match c {
            ' ' | '/' | '\\' => '_',
            c => c,
        });
    }
    format!("{}{}", stem, kind.extension())
}
