//! The note index: one JSON document holding the base path, the global
//! settings and the metadata of every note.
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, error, trace};
use serde::{Deserialize, Serialize};

use crate::{
    file_name_for, to_json_pretty, write_atomic, MkError, NoteKind, NoteRecord, Result, Settings,
};

/// Name of the index file inside the notes directory
pub const INDEX_FILE: &str = "settings.json";

/// In-memory copy of the whole index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteIndex {
    /// Directory holding the index and all content files, with a trailing slash
    pub base_path: String,
    pub settings: Settings,
    /// Records in creation order
    pub notes: Vec<NoteRecord>,
}

impl NoteIndex {
    /// An empty index rooted at `base_path`.
    pub fn new(base_path: &Path, settings: Settings) -> Result<Self> {
        Ok(NoteIndex {
            base_path: base_path_string(base_path)?,
            settings,
            notes: Vec::new(),
        })
    }

    /// Points `base_path` at `dir`. Returns whether it named another directory.
    pub fn rebase(&mut self, dir: &Path) -> Result<bool> {
        let base_path = base_path_string(dir)?;
        if base_path == self.base_path {
            return Ok(false);
        }
        self.base_path = base_path;
        Ok(true)
    }

    /// Reads and validates the index file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading index from {}", path.display());
        let corrupt = |message: String| {
            error!("Index {} is unusable: {}", path.display(), message);
            MkError::CorruptIndex {
                path: path.to_path_buf(),
                message,
            }
        };

        let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => corrupt("index file does not exist".to_string()),
            _ => corrupt(e.to_string()),
        })?;
        let index: NoteIndex = serde_json::from_str(&raw).map_err(|e| corrupt(e.to_string()))?;
        index.validate().map_err(corrupt)?;

        trace!("Loaded index with {} notes", index.notes.len());
        Ok(index)
    }

    /// Atomically overwrites the index file at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = to_json_pretty(self)?;
        write_atomic(path, &json)?;
        debug!("Saved index with {} notes to {}", self.notes.len(), path.display());
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        self.settings.validate().map_err(|e| e.to_string())?;

        let mut uuids = HashSet::with_capacity(self.notes.len());
        let mut files = HashSet::with_capacity(self.notes.len());
        for note in &self.notes {
            if note.uuid.is_empty() {
                return Err(format!("note '{}' has an empty uuid", note.title));
            }
            if note.file.is_empty() {
                return Err(format!("note {} has an empty file name", note.uuid));
            }
            if !uuids.insert(note.uuid.as_str()) {
                return Err(format!("duplicate uuid {}", note.uuid));
            }
            if !files.insert(note.file.as_str()) {
                return Err(format!("file {} is referenced twice", note.file));
            }
        }
        Ok(())
    }

    pub fn find_by_uuid(&self, uuid: &str) -> Result<&NoteRecord> {
        self.notes
            .iter()
            .find(|note| note.uuid == uuid)
            .ok_or_else(|| MkError::NotFound {
                uuid: uuid.to_string(),
            })
    }

    /// Inserts a new record, or refreshes the `edited` stamp of an existing one.
    pub fn upsert(&mut self, record: NoteRecord) -> Result<()> {
        if let Some(existing) = self.notes.iter_mut().find(|n| n.uuid == record.uuid) {
            trace!("Updating edited time of note {}", record.uuid);
            existing.edited = record.edited;
            return Ok(());
        }

        if self.notes.iter().any(|n| n.file == record.file) {
            return Err(MkError::FileConflict { file: record.file });
        }
        trace!("Inserting note {} ({})", record.uuid, record.file);
        self.notes.push(record);
        Ok(())
    }

    /// Drops the record from the index. The content file is left alone.
    pub fn remove(&mut self, uuid: &str) -> Result<NoteRecord> {
        let position = self
            .notes
            .iter()
            .position(|note| note.uuid == uuid)
            .ok_or_else(|| MkError::NotFound {
                uuid: uuid.to_string(),
            })?;
        Ok(self.notes.remove(position))
    }

    pub fn base_dir(&self) -> &Path {
        Path::new(&self.base_path)
    }

    pub fn content_path(&self, record: &NoteRecord) -> PathBuf {
        self.base_dir().join(&record.file)
    }

    /// Picks a content filename for a new note. The title-derived name is used
    /// unless another record or an existing file already has it, in which case
    /// the start of the uuid is appended to the stem.
    pub fn unique_file_name(&self, title: &str, kind: NoteKind, uuid: &str) -> Result<String> {
        let candidate = file_name_for(title, kind);
        if self.is_file_free(&candidate)? {
            return Ok(candidate);
        }

        let stem = candidate
            .strip_suffix(kind.extension())
            .unwrap_or(candidate.as_str());
        let short: String = uuid.chars().filter(|c| *c != '-').take(8).collect();
        let suffixed = format!("{}_{}{}", stem, short, kind.extension());
        if self.is_file_free(&suffixed)? {
            debug!("File {} already taken, using {}", candidate, suffixed);
            return Ok(suffixed);
        }

        let full = format!("{}_{}{}", stem, uuid, kind.extension());
        if self.is_file_free(&full)? {
            return Ok(full);
        }
        Err(MkError::FileConflict { file: full })
    }

    fn is_file_free(&self, file: &str) -> Result<bool> {
        if file == INDEX_FILE || self.notes.iter().any(|n| n.file == file) {
            return Ok(false);
        }
        let path = self.base_dir().join(file);
        let taken = path
            .try_exists()
            .map_err(|source| MkError::PersistError { path, source })?;
        Ok(!taken)
    }
}

/// The textual form of `dir` stored in the index, with a trailing separator.
/// The index is JSON, so a directory that is not valid UTF-8 cannot be stored.
pub fn base_path_string(dir: &Path) -> Result<String> {
    let mut base_path = dir
        .to_str()
        .ok_or_else(|| MkError::ConfigError {
            message: format!("Notes directory {} is not valid UTF-8", dir.display()),
        })?
        .to_string();
    if !base_path.ends_with(std::path::MAIN_SEPARATOR) && !base_path.ends_with('/') {
        base_path.push(std::path::MAIN_SEPARATOR);
    }
    Ok(base_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(title: &str, file: &str) -> NoteRecord {
        let mut record = NoteRecord::new(title, NoteKind::Plain);
        record.file = file.to_string();
        record
    }

    #[test]
    fn base_path_keeps_trailing_separator() {
        let index = NoteIndex::new(Path::new("/tmp/x"), Settings::default()).unwrap();
        assert!(index.base_path.ends_with('/'));
        let again = NoteIndex::new(Path::new("/tmp/x/"), Settings::default()).unwrap();
        assert_eq!(again.base_path, "/tmp/x/");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_base_path_is_rejected() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let dir = Path::new("/tmp").join(OsStr::from_bytes(b"notes\xff"));
        assert!(matches!(
            NoteIndex::new(&dir, Settings::default()),
            Err(MkError::ConfigError { .. })
        ));
        assert!(matches!(
            base_path_string(&dir),
            Err(MkError::ConfigError { .. })
        ));
    }

    #[test]
    fn rebase_reports_change() {
        let mut index = NoteIndex::new(Path::new("/tmp/a"), Settings::default()).unwrap();
        assert!(!index.rebase(Path::new("/tmp/a/")).unwrap());
        assert!(index.rebase(Path::new("/tmp/b")).unwrap());
        assert_eq!(index.base_dir(), Path::new("/tmp/b/"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE);
        let mut index = NoteIndex::new(dir.path(), Settings::default()).unwrap();
        index.upsert(record("A", "A.txt")).unwrap();
        index.save(&path).unwrap();

        let loaded = NoteIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn missing_index_is_corrupt() {
        let dir = tempdir().unwrap();
        let result = NoteIndex::load(&dir.path().join(INDEX_FILE));
        assert!(matches!(result, Err(MkError::CorruptIndex { .. })));
    }

    #[test]
    fn schema_violations_are_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE);

        fs::write(&path, "{\"base_path\": \"/tmp/\", \"notes\": []}").unwrap();
        assert!(matches!(
            NoteIndex::load(&path),
            Err(MkError::CorruptIndex { .. })
        ));

        fs::write(
            &path,
            r#"{"base_path": "/tmp/", "settings": {"save_on_file_exit": true, "font_size": 99}, "notes": []}"#,
        )
        .unwrap();
        assert!(matches!(
            NoteIndex::load(&path),
            Err(MkError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn duplicate_uuid_is_corrupt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE);
        let mut index = NoteIndex::new(dir.path(), Settings::default()).unwrap();
        let first = record("A", "A.txt");
        let mut second = record("B", "B.txt");
        second.uuid = first.uuid.clone();
        index.notes.push(first);
        index.notes.push(second);
        index.save(&path).unwrap();

        assert!(matches!(
            NoteIndex::load(&path),
            Err(MkError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn upsert_only_touches_edited() {
        let mut index = NoteIndex::new(Path::new("/tmp/x"), Settings::default()).unwrap();
        let original = record("A", "A.txt");
        index.upsert(original.clone()).unwrap();

        let mut changed = original.clone();
        changed.title = "Renamed".to_string();
        changed.edited = crate::Timestamp::parse("2030-01-01-00-00-00").unwrap();
        index.upsert(changed.clone()).unwrap();

        let stored = index.find_by_uuid(&original.uuid).unwrap();
        assert_eq!(stored.title, "A");
        assert_eq!(stored.edited, changed.edited);
        assert_eq!(index.notes.len(), 1);
    }

    #[test]
    fn upsert_rejects_file_collision() {
        let mut index = NoteIndex::new(Path::new("/tmp/x"), Settings::default()).unwrap();
        index.upsert(record("A", "A.txt")).unwrap();
        assert!(matches!(
            index.upsert(record("A", "A.txt")),
            Err(MkError::FileConflict { .. })
        ));
    }

    #[test]
    fn remove_unknown_uuid() {
        let mut index = NoteIndex::new(Path::new("/tmp/x"), Settings::default()).unwrap();
        assert!(matches!(
            index.remove("missing"),
            Err(MkError::NotFound { .. })
        ));
    }

    #[test]
    fn unique_file_name_avoids_collisions() {
        let dir = tempdir().unwrap();
        let mut index = NoteIndex::new(dir.path(), Settings::default()).unwrap();
        index.upsert(record("My Note", "My_Note.txt")).unwrap();
        fs::write(dir.path().join("Stray.md"), "").unwrap();

        let uuid = "1a2b3c4d-0000-4000-8000-000000000000";
        assert_eq!(
            index.unique_file_name("My Note", NoteKind::Plain, uuid).unwrap(),
            "My_Note_1a2b3c4d.txt"
        );
        assert_eq!(
            index.unique_file_name("Stray", NoteKind::Markdown, uuid).unwrap(),
            "Stray_1a2b3c4d.md"
        );
        assert_eq!(
            index.unique_file_name("My Note", NoteKind::Markdown, uuid).unwrap(),
            "My_Note.md"
        );
    }

    #[test]
    fn directory_with_candidate_name_counts_as_taken() {
        let dir = tempdir().unwrap();
        let index = NoteIndex::new(dir.path(), Settings::default()).unwrap();
        fs::create_dir(dir.path().join("Plans.txt")).unwrap();

        let uuid = "1a2b3c4d-0000-4000-8000-000000000000";
        assert_eq!(
            index.unique_file_name("Plans", NoteKind::Plain, uuid).unwrap(),
            "Plans_1a2b3c4d.txt"
        );
    }
}
