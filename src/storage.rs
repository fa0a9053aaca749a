use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use log::{debug, error, info, trace, warn};
use walkdir::WalkDir;

use crate::{
    excerpt, is_temp_file_name, read_if_exists, render_markdown, write_atomic, ConsistencyReport,
    DeleteOutcome, MkError, NoteIndex, NoteKind, NoteRecord, Result, Settings, Timestamp,
    INDEX_FILE,
};

/// Writes an index to the given path
type PersistIndex = fn(&NoteIndex, &Path) -> Result<()>;

/// Keeps the index file and the note content files consistent.
///
/// Every operation that pairs a metadata change with a content-file change goes
/// through here. Mutations hold the lock while they reload the index from disk,
/// apply their change and save it, so two mutations never interleave.
pub struct NoteStore {
    /// Canonical notes directory; content paths always resolve against it
    base: PathBuf,

    /// Location of the index file
    index_path: PathBuf,

    persist_index: PersistIndex,

    /// Last index state this store loaded or saved
    index: Mutex<NoteIndex>,
}

impl NoteStore {
    /// Creates `dir` if needed and writes a fresh index with default settings.
    ///
    /// Fails with [`MkError::IndexExists`] rather than overwriting an index
    /// that is already there.
    pub fn init(dir: &Path) -> Result<Self> {
        info!("Initializing notes directory: {}", dir.display());

        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create notes directory {}: {}", dir.display(), e);
            MkError::PersistError {
                path: dir.to_path_buf(),
                source: e,
            }
        })?;

        let index_path = dir.join(INDEX_FILE);
        if index_path.exists() {
            return Err(MkError::IndexExists { path: index_path });
        }

        let base = fs::canonicalize(dir)?;
        NoteIndex::new(&base, Settings::default())?.save(&index_path)?;

        Self::open(dir)
    }

    /// Loads the index in `dir`. A missing index is reported as
    /// [`MkError::CorruptIndex`]; nothing is created.
    ///
    /// Content files always live next to the index. An index whose
    /// `base_path` names another directory (the notes were copied or moved)
    /// is rebased onto `dir` and saved.
    pub fn open(dir: &Path) -> Result<Self> {
        let index_path = dir.join(INDEX_FILE);
        let mut index = NoteIndex::load(&index_path)?;
        let base = fs::canonicalize(dir)?;

        let previous = index.base_path.clone();
        if index.rebase(&base)? {
            warn!(
                "Index {} pointed at {}, rebasing onto {}",
                index_path.display(),
                previous,
                index.base_path
            );
            if let Err(e) = index.save(&index_path) {
                warn!("Failed to save rebased index: {}", e);
            }
        }
        info!(
            "Opened index {} with {} notes",
            index_path.display(),
            index.notes.len()
        );

        Ok(Self {
            base,
            index_path,
            persist_index: NoteIndex::save,
            index: Mutex::new(index),
        })
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, NoteIndex>> {
        self.index
            .lock()
            .map_err(|_| MkError::LockAcquisitionFailed {
                message: "Failed to acquire lock on note index".to_string(),
            })
    }

    /// Reads the index from disk, rooted at this store's directory whatever
    /// `base_path` the file holds.
    fn load_index(&self) -> Result<NoteIndex> {
        let mut index = NoteIndex::load(&self.index_path)?;
        if index.rebase(&self.base)? {
            debug!("Index base path rewritten to {}", index.base_path);
        }
        Ok(index)
    }

    fn save_index(&self, index: &NoteIndex) -> Result<()> {
        (self.persist_index)(index, &self.index_path)
    }

    /// Replaces the in-memory index with the one on disk.
    pub fn refresh(&self) -> Result<()> {
        let mut cached = self.lock()?;
        *cached = self.load_index()?;
        debug!("Index refreshed, {} notes", cached.notes.len());
        Ok(())
    }

    /// Creates a note with an empty content file.
    ///
    /// The content file is written before the index entry, so a failure never
    /// leaves a record without its file.
    pub fn create_note(&self, title: &str, kind: NoteKind) -> Result<NoteRecord> {
        info!("Creating {} note: '{}'", kind, title);
        let mut cached = self.lock()?;
        let index = self.load_index()?;

        let mut record = NoteRecord::new(title, kind);
        record.file = index.unique_file_name(&record.title, kind, &record.uuid)?;

        self.insert_note(&mut cached, index, &record, b"")?;
        info!("Note created: {} ({})", record.uuid, record.file);
        Ok(record)
    }

    /// Writes the content file, then records the note in the index. If the
    /// index cannot be saved the new content file is removed again.
    fn insert_note(
        &self,
        cached: &mut NoteIndex,
        mut index: NoteIndex,
        record: &NoteRecord,
        content: &[u8],
    ) -> Result<()> {
        let path = index.content_path(record);
        debug!("Writing content file: {}", path.display());
        write_atomic(&path, content)?;

        let saved = index
            .upsert(record.clone())
            .and_then(|_| self.save_index(&index));
        if let Err(e) = saved {
            error!("Failed to record note {} in index: {}", record.uuid, e);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(
                    "Failed to remove unreferenced content file {}: {}",
                    path.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        *cached = index;
        Ok(())
    }

    pub fn get_note(&self, uuid: &str) -> Result<NoteRecord> {
        self.lock()?.find_by_uuid(uuid).cloned()
    }

    /// All records, in creation order
    pub fn list_notes(&self) -> Result<Vec<NoteRecord>> {
        Ok(self.lock()?.notes.clone())
    }

    /// Reads a note's text. A record whose file has disappeared yields
    /// [`MkError::ContentMissing`].
    pub fn read_content(&self, uuid: &str) -> Result<String> {
        let path = {
            let index = self.lock()?;
            let record = index.find_by_uuid(uuid)?;
            index.content_path(record)
        };

        trace!("Reading content of {} from {}", uuid, path.display());
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Note {} has no content file at {}", uuid, path.display());
                Err(MkError::ContentMissing {
                    uuid: uuid.to_string(),
                    path,
                })
            }
            Err(e) => Err(MkError::Io(e)),
        }
    }

    /// Replaces a note's text and returns whether it changed.
    ///
    /// The content file is always rewritten. The `edited` stamp and the index
    /// are only touched when the bytes differ from what was stored. If the
    /// index save fails after the content write, the error is returned and the
    /// index keeps its previous `edited` value.
    pub fn write_content(&self, uuid: &str, content: &str) -> Result<bool> {
        debug!("Writing content of note {}", uuid);
        let mut cached = self.lock()?;
        let mut index = self.load_index()?;

        let mut record = index.find_by_uuid(uuid)?.clone();
        let path = index.content_path(&record);

        let previous = read_if_exists(&path)?;
        if previous.is_none() {
            warn!("Content file {} was missing, recreating it", path.display());
        }
        let changed = previous.as_deref() != Some(content.as_bytes());

        write_atomic(&path, content.as_bytes())?;

        if !changed {
            debug!("Content of note {} unchanged", uuid);
            *cached = index;
            return Ok(false);
        }

        record.edited = Timestamp::now();
        index.upsert(record)?;
        self.save_index(&index)?;
        *cached = index;

        info!("Note {} saved", uuid);
        Ok(true)
    }

    /// Removes a note: the index entry first, then the content file.
    ///
    /// Once the index is saved the delete has happened. A content file that
    /// cannot be removed afterwards is only logged and reported in the outcome.
    pub fn delete_note(&self, uuid: &str) -> Result<DeleteOutcome> {
        info!("Deleting note: {}", uuid);
        let mut cached = self.lock()?;
        let mut index = self.load_index()?;

        let record = index.remove(uuid)?;
        let path = index.content_path(&record);
        self.save_index(&index)?;
        *cached = index;

        let file_removed = match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Content file removed: {}", path.display());
                true
            }
            Err(e) => {
                warn!(
                    "Note {} removed from index but its file {} could not be deleted: {}",
                    uuid,
                    path.display(),
                    e
                );
                false
            }
        };

        info!("Note {} successfully deleted", uuid);
        Ok(DeleteOutcome {
            record,
            file_removed,
        })
    }

    /// Copies a note under a fresh uuid, filename and timestamps.
    pub fn duplicate_note(&self, uuid: &str) -> Result<NoteRecord> {
        info!("Duplicating note: {}", uuid);
        let mut cached = self.lock()?;
        let index = self.load_index()?;

        let source = index.find_by_uuid(uuid)?.clone();
        let source_path = index.content_path(&source);
        let content = read_if_exists(&source_path)?.ok_or_else(|| MkError::ContentMissing {
            uuid: uuid.to_string(),
            path: source_path.clone(),
        })?;

        let mut record = NoteRecord::new(&format!("{} (copy)", source.title), source.kind);
        record.file = index.unique_file_name(&record.title, record.kind, &record.uuid)?;

        self.insert_note(&mut cached, index, &record, &content)?;
        info!("Note {} duplicated as {}", uuid, record.uuid);
        Ok(record)
    }

    /// Fuzzy-matches note titles, best match first
    pub fn search_notes(&self, query: &str) -> Result<Vec<NoteRecord>> {
        use fuzzy_matcher::skim::SkimMatcherV2;
        use fuzzy_matcher::FuzzyMatcher;

        info!("Searching notes with query: '{}'", query);
        let matcher = SkimMatcherV2::default();
        let notes = self.list_notes()?;

        let mut scored: Vec<(i64, NoteRecord)> = notes
            .into_iter()
            .filter_map(|note| {
                matcher
                    .fuzzy_match(&note.title, query)
                    .map(|score| (score, note))
            })
            .collect();
        // stable: equal scores keep creation order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        debug!("Found {} matching notes", scored.len());
        Ok(scored.into_iter().map(|(_, note)| note).collect())
    }

    /// Settings as last loaded
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.lock()?.settings.clone())
    }

    /// Reloads the index and returns its settings.
    pub fn load_settings(&self) -> Result<Settings> {
        let mut cached = self.lock()?;
        *cached = self.load_index()?;
        Ok(cached.settings.clone())
    }

    /// Validates and persists new settings, replacing the previous ones whole.
    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        settings.validate().map_err(|e| {
            warn!("Rejected settings: {}", e);
            e
        })?;

        let mut cached = self.lock()?;
        let mut index = self.load_index()?;
        index.settings = settings;
        self.save_index(&index)?;
        *cached = index;

        info!("Settings saved");
        Ok(())
    }

    /// Compares the index with the files actually present in the notes directory.
    pub fn check(&self) -> Result<ConsistencyReport> {
        let index = {
            let mut cached = self.lock()?;
            *cached = self.load_index()?;
            cached.clone()
        };

        let mut report = ConsistencyReport::default();
        for record in &index.notes {
            if !index.content_path(record).is_file() {
                debug!("Orphaned entry: {} ({})", record.uuid, record.file);
                report.orphaned_entries.push(record.clone());
            }
        }

        let referenced: HashSet<&str> = index.notes.iter().map(|n| n.file.as_str()).collect();
        report.stray_files = stray_files(index.base_dir(), &referenced)?;

        info!(
            "Consistency check: {} orphaned entries, {} stray files",
            report.orphaned_entries.len(),
            report.stray_files.len()
        );
        Ok(report)
    }

    /// Drops every index entry whose content file is missing and returns them.
    pub fn remove_orphans(&self) -> Result<Vec<NoteRecord>> {
        let mut cached = self.lock()?;
        let mut index = self.load_index()?;

        let base = index.base_dir().to_path_buf();
        let (kept, orphans): (Vec<_>, Vec<_>) = index
            .notes
            .drain(..)
            .partition(|record| base.join(&record.file).is_file());
        index.notes = kept;

        if !orphans.is_empty() {
            self.save_index(&index)?;
            info!("Removed {} orphaned entries", orphans.len());
        }
        *cached = index;
        Ok(orphans)
    }

    /// Gallery text for a note
    pub fn preview(&self, uuid: &str, max_chars: usize) -> Result<String> {
        Ok(excerpt(&self.read_content(uuid)?, max_chars))
    }

    /// HTML for markdown notes, the raw text for plain ones.
    pub fn render(&self, uuid: &str) -> Result<String> {
        let record = self.get_note(uuid)?;
        let content = self.read_content(uuid)?;
        Ok(match record.kind {
            NoteKind::Markdown => render_markdown(&content),
            NoteKind::Plain => content,
        })
    }
}

/// Files directly in `base` that no record references, sorted. The index file
/// and in-flight temporary files are skipped. An unreadable directory is an
/// error rather than an empty result.
fn stray_files(base: &Path, referenced: &HashSet<&str>) -> Result<Vec<PathBuf>> {
    let mut strays = Vec::new();
    for entry in WalkDir::new(base).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            warn!("Failed to scan notes directory {}: {}", base.display(), e);
            MkError::Io(e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name == INDEX_FILE || is_temp_file_name(&name) || referenced.contains(&*name) {
            continue;
        }
        debug!("Stray file: {}", entry.path().display());
        strays.push(entry.path().to_path_buf());
    }
    strays.sort();
    Ok(strays)
}
