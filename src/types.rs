//! Shared result and report types, plus the command-line surface.
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};

use crate::{MkError, NoteKind, NoteRecord};

/// A specialized Result type for mkdown operations.
pub type Result<T> = std::result::Result<T, MkError>;

/// What a delete actually managed to do
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    /// The record that was removed from the index
    pub record: NoteRecord,
    /// False when the index entry is gone but the content file could not be removed
    pub file_removed: bool,
}

/// Disagreements between the index and the notes directory
#[derive(Debug, Clone, Default)]
pub struct ConsistencyReport {
    /// Records whose content file is missing
    pub orphaned_entries: Vec<NoteRecord>,
    /// Files in the notes directory that no record references
    pub stray_files: Vec<PathBuf>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.orphaned_entries.is_empty() && self.stray_files.is_empty()
    }
}

/// Sort order for the note gallery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SortBy {
    #[default]
    Created,
    Edited,
    Title,
}

/// Available subcommands for the mkdown application
#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty notes directory with a fresh index
    Init,

    /// Create a new note
    New {
        /// Title of the note
        #[clap(default_value = "")]
        title: String,

        /// Editor the note opens in
        #[clap(short, long, value_enum, default_value_t = NoteKind::Plain)]
        kind: NoteKind,

        /// Initial content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file containing the note's initial content
        #[clap(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// List notes in the gallery
    List {
        /// Sort order
        #[clap(short, long, value_enum, default_value_t = SortBy::Created)]
        sort: SortBy,

        /// Reverse the sort order
        #[clap(short, long)]
        descending: bool,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note UUIDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Print the content of a note
    Show {
        /// UUID of the note
        uuid: String,

        /// Prefix lines with (possibly relative) line numbers
        #[clap(short, long)]
        numbered: bool,

        /// Cursor line that relative numbers count from
        #[clap(long, default_value_t = 1, requires = "numbered")]
        cursor: usize,

        /// Print markdown notes rendered as HTML
        #[clap(short, long, conflicts_with = "numbered")]
        render: bool,
    },

    /// Show the metadata of a note
    Info {
        /// UUID of the note
        uuid: String,
    },

    /// Replace the content of a note
    Write {
        /// UUID of the note
        uuid: String,

        /// New content
        #[clap(short, long)]
        content: Option<String>,

        /// Path to a file with the new content; `-` reads stdin
        #[clap(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,
    },

    /// Open a note in the external editor
    Edit {
        /// UUID of the note
        uuid: String,
    },

    /// Delete a note and its content file
    Delete {
        /// UUID of the note
        uuid: String,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Copy a note, content included, under a new UUID
    Duplicate {
        /// UUID of the note
        uuid: String,
    },

    /// Search note titles
    Search {
        /// Search query text
        query: String,

        /// Limit the number of search results
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },

    /// Show or change editor settings
    Settings {
        /// Update a setting, e.g. `font_size=14`
        #[clap(short, long)]
        set: Vec<String>,
    },

    /// Compare the index against the notes directory
    Check {
        /// Remove index entries whose content file is missing
        #[clap(long)]
        fix: bool,
    },
}
