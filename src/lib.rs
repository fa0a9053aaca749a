//! Note-taking application library
//!
//! This library keeps a notes directory consistent: one JSON index holding
//! global settings and every note's metadata, plus one flat text file per note.
//! Plain and markdown notes are supported.

mod cli;
mod config;
mod editor;
mod errors;
mod helper;
mod index;
mod note;
mod preview;
mod settings;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use editor::*;
pub use errors::*;
pub use helper::*;
pub use index::*;
pub use note::*;
pub use preview::*;
pub use settings::*;
pub use storage::*;
pub use types::*;
