//! CLI module for the mkdown application
//!
//! This module handles the command-line interface for interacting with the
//! note store.
use std::{
    fs::read_to_string,
    io::{stdin, stdout, Read, Write},
    path::Path,
    process::Command,
};

use log::{info, warn};
use shell_words::split;
use tempfile::Builder;

use crate::{
    cursor_position, line_numbers, parse_key_value, Commands, Config, MkError, NoteKind,
    NoteRecord, NoteStore, Result, SortBy,
};

/// Characters of content shown per note in the gallery listing
const PREVIEW_CHARS: usize = 100;

/// CLI Application handler - processes CLI commands and interfaces with NoteStore
pub struct App {
    /// The note store backend
    store: NoteStore,

    /// Application configuration
    config: Config,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    /// Create a new CLI application with the given store and config
    pub fn new(store: NoteStore, config: Config, verbose: bool) -> Self {
        Self {
            store,
            config,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Init => {
                return Err(MkError::IndexExists {
                    path: self.store.index_path().to_path_buf(),
                })
            }

            Commands::New {
                title,
                kind,
                content,
                file,
            } => self.create_note(&title, kind, content, file.as_deref())?,

            Commands::List {
                sort,
                descending,
                json,
                brief,
            } => {
                let notes = sort_notes(self.store.list_notes()?, sort, descending);
                self.display_notes(&notes, json, brief)?;
            }

            Commands::Show {
                uuid,
                numbered,
                cursor,
                render,
            } => self.show_note(&uuid, numbered, cursor, render)?,

            Commands::Info { uuid } => self.show_info(&uuid)?,

            Commands::Write {
                uuid,
                content,
                file,
            } => {
                let content = match (content, file) {
                    (Some(c), _) => c,
                    (None, Some(path)) if path.as_path() != Path::new("-") => {
                        read_content_from_file(&path)?
                    }
                    _ => read_stdin()?,
                };
                self.save_content(&uuid, &content)?;
            }

            Commands::Edit { uuid } => self.handle_edit(&uuid)?,

            Commands::Delete { uuid, force } => self.handle_delete(&uuid, force)?,

            Commands::Duplicate { uuid } => {
                let copy = self.store.duplicate_note(&uuid)?;
                println!("Note duplicated as {} ({})", copy.uuid, copy.file);
            }

            Commands::Search { query, limit } => {
                let mut results = self.store.search_notes(&query)?;
                if limit > 0 {
                    results.truncate(limit);
                }
                if results.is_empty() {
                    println!("No notes found matching query: \"{}\"", query);
                } else {
                    self.display_notes(&results, false, true)?;
                }
            }

            Commands::Settings { set } => self.handle_settings(&set)?,

            Commands::Check { fix } => self.handle_check(fix)?,
        }

        Ok(())
    }

    fn create_note(
        &self,
        title: &str,
        kind: NoteKind,
        content: Option<String>,
        file: Option<&Path>,
    ) -> Result<()> {
        let initial = match (content, file) {
            (Some(c), _) => Some(c),
            (None, Some(path)) => Some(read_content_from_file(path)?),
            (None, None) => None,
        };

        let record = self.store.create_note(title, kind)?;
        if let Some(text) = initial {
            self.store.write_content(&record.uuid, &text)?;
        }

        println!("Note created with UUID: {}", record.uuid);
        if self.verbose {
            println!("Content file: {}", record.file);
        }
        Ok(())
    }

    fn show_note(&self, uuid: &str, numbered: bool, cursor: usize, render: bool) -> Result<()> {
        if render {
            println!("{}", self.store.render(uuid)?);
            return Ok(());
        }

        let content = self.store.read_content(uuid)?;
        if !numbered {
            print!("{}", content);
            return Ok(());
        }

        let settings = self.store.settings()?;
        let lines: Vec<&str> = content.lines().collect();
        let gutter = line_numbers(lines.len(), cursor, settings.relative_line_numbers);
        let width = gutter.iter().map(String::len).max().unwrap_or(1);
        for (number, line) in gutter.iter().zip(lines) {
            println!("{:>width$} {}", console::style(number).dim(), line, width = width);
        }
        Ok(())
    }

    fn show_info(&self, uuid: &str) -> Result<()> {
        let record = self.store.get_note(uuid)?;
        for (label, value) in record.info() {
            println!("{:<8} {}", console::style(label).bold(), value);
        }

        match self.store.read_content(uuid) {
            Ok(content) => {
                let (line, column) = cursor_position(&content, content.chars().count());
                println!(
                    "{:<8} {} lines, last column {}",
                    console::style("Size").bold(),
                    line,
                    column
                );
            }
            Err(MkError::ContentMissing { path, .. }) => {
                println!(
                    "{}",
                    console::style(format!("Content file missing: {}", path.display())).red()
                );
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn save_content(&self, uuid: &str, content: &str) -> Result<()> {
        if self.store.write_content(uuid, content)? {
            println!("Note {} saved", uuid);
        } else {
            println!("Note {} unchanged", uuid);
        }
        Ok(())
    }

    /// Display notes as JSON or as gallery cards
    fn display_notes(&self, notes: &[NoteRecord], json: bool, brief: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(notes)?);
            return Ok(());
        }

        if notes.is_empty() {
            println!("No notes yet. Create one with `mkdown new <title>`.");
            return Ok(());
        }

        // Use terminal width for formatting if available
        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        for (i, note) in notes.iter().enumerate() {
            if brief {
                println!("{}  {}", note.uuid, console::style(&note.title).bold());
                continue;
            }

            if i > 0 {
                println!("{}", "-".repeat(term_width.min(50)));
            }
            println!(
                "{} [{}]  edited {}",
                console::style(&note.title).bold(),
                note.kind,
                note.edited
            );
            println!("UUID: {}", note.uuid);

            match self.store.preview(&note.uuid, PREVIEW_CHARS) {
                Ok(preview) if !preview.is_empty() => println!("\n{}", preview),
                Ok(_) => {}
                Err(MkError::ContentMissing { .. }) => {
                    println!("{}", console::style("[content file missing]").red())
                }
                Err(e) => return Err(e),
            }
        }

        println!(
            "\nFound {} note{}",
            notes.len(),
            if notes.len() == 1 { "" } else { "s" }
        );
        Ok(())
    }

    fn handle_edit(&self, uuid: &str) -> Result<()> {
        let record = self.store.get_note(uuid)?;
        let original = self.store.read_content(uuid)?;

        let edited = self.open_editor_with_content(&record, &original)?;
        if edited == original {
            println!("No changes to {}", record.title);
            return Ok(());
        }

        let settings = self.store.settings()?;
        if !settings.save_on_file_exit && !confirm("Save changes?")? {
            println!("Changes discarded.");
            return Ok(());
        }

        self.save_content(uuid, &edited)
    }

    fn open_editor_with_content(&self, record: &NoteRecord, content: &str) -> Result<String> {
        let mut temp_file = Builder::new()
            .prefix("mkdown-")
            .suffix(record.kind.extension())
            .tempfile()?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;

        let editor_cmd = self.config.get_editor_command();
        info!("Opening '{}' in {}", record.title, editor_cmd);
        launch_editor(&editor_cmd, temp_file.path())?;

        Ok(read_to_string(temp_file.path())?)
    }

    fn handle_delete(&self, uuid: &str, force: bool) -> Result<()> {
        let note = self.store.get_note(uuid)?;

        if !force {
            println!("You are about to delete the following note:");
            println!("UUID:    {}", note.uuid);
            println!("Title:   {}", note.title);
            println!("Created: {}", note.created);

            println!("\nThis action cannot be undone!");
            if !confirm("Are you sure you want to delete this note?")? {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let outcome = self.store.delete_note(uuid)?;
        if !outcome.file_removed {
            warn!("Content file {} was left on disk", outcome.record.file);
            println!(
                "Note deleted, but its file {} could not be removed.",
                outcome.record.file
            );
        }
        println!(
            "Note '{}' ({}) has been permanently deleted.",
            note.title, note.uuid
        );
        Ok(())
    }

    fn handle_settings(&self, pairs: &[String]) -> Result<()> {
        if pairs.is_empty() {
            println!("{}", self.store.load_settings()?);
            return Ok(());
        }

        let mut settings = self.store.load_settings()?;
        for pair in pairs {
            let (key, value) = parse_key_value(pair).ok_or_else(|| MkError::InvalidSetting {
                message: format!("expected key=value, got '{}'", pair),
            })?;
            settings.set(key, value)?;
        }
        self.store.save_settings(settings.clone())?;

        println!("{}", settings);
        Ok(())
    }

    fn handle_check(&self, fix: bool) -> Result<()> {
        let report = self.store.check()?;
        if report.is_consistent() {
            println!("Index and notes directory are consistent.");
            return Ok(());
        }

        for record in &report.orphaned_entries {
            println!(
                "{} {} ({}): content file {} is missing",
                console::style("orphaned").red(),
                record.title,
                record.uuid,
                record.file
            );
        }
        for path in &report.stray_files {
            println!(
                "{} {} is not referenced by any note",
                console::style("stray").yellow(),
                path.display()
            );
        }

        if fix && !report.orphaned_entries.is_empty() {
            let removed = self.store.remove_orphans()?;
            println!("Removed {} orphaned entries.", removed.len());
        }
        Ok(())
    }
}

/// Sort notes by specified criteria
pub fn sort_notes(mut notes: Vec<NoteRecord>, sort_by: SortBy, descending: bool) -> Vec<NoteRecord> {
    match sort_by {
        // index order is creation order
        SortBy::Created => {}
        SortBy::Edited => notes.sort_by(|a, b| a.edited.cmp(&b.edited)),
        SortBy::Title => notes.sort_by_key(|n| n.title.to_lowercase()),
    }
    if descending {
        notes.reverse();
    }
    notes
}

fn launch_editor(editor_cmd: &str, file_path: &Path) -> Result<()> {
    // Handle shell-like command parsing
    let args = split(editor_cmd).map_err(|e| MkError::EditorError {
        message: format!("Failed to parse editor command: {}", e),
    })?;

    let (program, rest) = args.split_first().ok_or_else(|| MkError::EditorError {
        message: "Empty editor command".to_string(),
    })?;

    let status = Command::new(program)
        .args(rest)
        .arg(file_path)
        .status()
        .map_err(|e| MkError::EditorError {
            message: format!("Failed to execute editor command '{}': {}", program, e),
        })?;

    if !status.success() {
        return Err(MkError::EditorError {
            message: "Editor exited with non-zero status".to_string(),
        });
    }
    Ok(())
}

// Helper function for reading content from a file
fn read_content_from_file(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(MkError::ConfigError {
            message: format!("Not a readable file: {}", path.display()),
        });
    }
    read_to_string(path).map_err(MkError::Io)
}

fn read_stdin() -> Result<String> {
    let mut content = String::new();
    stdin().read_to_string(&mut content)?;
    Ok(content)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    stdout().flush()?;

    let mut input = String::new();
    stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;

    fn record(title: &str, edited: &str) -> NoteRecord {
        let mut record = NoteRecord::new(title, NoteKind::Plain);
        record.edited = Timestamp::parse(edited).unwrap();
        record
    }

    #[test]
    fn sorts_by_title_case_insensitively() {
        let notes = vec![record("beta", "2024-01-01-00-00-00"), record("Alpha", "2024-01-02-00-00-00")];
        let sorted = sort_notes(notes, SortBy::Title, false);
        assert_eq!(sorted[0].title, "Alpha");
    }

    #[test]
    fn sorts_by_edited_descending() {
        let notes = vec![
            record("old", "2024-01-01-00-00-00"),
            record("new", "2024-06-01-00-00-00"),
            record("mid", "2024-03-01-00-00-00"),
        ];
        let sorted = sort_notes(notes, SortBy::Edited, true);
        let titles: Vec<_> = sorted.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[test]
    fn created_order_is_index_order() {
        let notes = vec![record("first", "2024-06-01-00-00-00"), record("second", "2024-01-01-00-00-00")];
        let sorted = sort_notes(notes, SortBy::Created, false);
        assert_eq!(sorted[0].title, "first");
    }
}
