use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use log::{debug, error, trace};
use serde::Serialize;
use tempfile::{Builder, NamedTempFile};

use crate::{MkError, Result};

/// Prefix of the scratch files created next to their target
pub const TEMP_FILE_PREFIX: &str = ".tmp";

/// Random characters following [`TEMP_FILE_PREFIX`] in a scratch file name
pub const TEMP_FILE_RAND_LEN: usize = 6;

/// Whether `name` is one of our scratch files: the prefix followed by exactly
/// [`TEMP_FILE_RAND_LEN`] alphanumerics and nothing else.
pub fn is_temp_file_name(name: &str) -> bool {
    name.strip_prefix(TEMP_FILE_PREFIX).is_some_and(|rest| {
        rest.len() == TEMP_FILE_RAND_LEN && rest.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

/// Atomically replaces `path` with `contents`.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic_with(path, |file| file.write_all(contents))
}

/// Writes through `fill` into a temporary file in the target's directory, then
/// renames it over `path`. Readers see either the old file or the new one;
/// if `fill` or the rename fails the temporary file is dropped and `path` is
/// left untouched.
pub fn write_atomic_with<F>(path: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> io::Result<()>,
{
    let persist_error = |source: io::Error| MkError::PersistError {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    debug!("Creating temporary file in directory: {}", dir.display());
    let mut temp_file = Builder::new()
        .prefix(TEMP_FILE_PREFIX)
        .rand_bytes(TEMP_FILE_RAND_LEN)
        .tempfile_in(dir)
        .map_err(|e| {
            error!("Failed to create temporary file: {}", e);
            persist_error(e)
        })?;

    trace!("Writing to temporary file");
    fill(&mut temp_file).map_err(|e| {
        error!("Failed to write to temporary file for {}: {}", path.display(), e);
        persist_error(e)
    })?;

    temp_file.flush().map_err(persist_error)?;
    temp_file.as_file().sync_all().map_err(|e| {
        error!("Failed to sync temporary file: {}", e);
        persist_error(e)
    })?;

    debug!("Performing atomic move of temporary file to {}", path.display());
    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        persist_error(e.error)
    })?;

    Ok(())
}

/// Serializes with the four-space indentation the index file has always used.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

/// Reads a file, mapping "does not exist" to `None`.
pub fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MkError::Io(e)),
    }
}

// Helper method for parsing `key=value` pairs
pub fn parse_key_value(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn atomic_write_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn interrupted_write_keeps_old_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        write_atomic(&path, b"{\"complete\": true}").unwrap();

        let result = write_atomic_with(&path, |file| {
            file.write_all(b"{\"compl")?;
            Err(io::Error::other("disk full"))
        });

        assert!(matches!(result, Err(MkError::PersistError { .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"complete\": true}");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "temporary file must be cleaned up");
    }

    #[test]
    fn json_uses_four_space_indent() {
        let bytes = to_json_pretty(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n    \"a\": 1\n}");
    }

    #[test]
    fn read_if_exists_maps_missing_to_none() {
        let dir = tempdir().unwrap();
        assert!(read_if_exists(&dir.path().join("nope")).unwrap().is_none());
    }

    #[test]
    fn temp_file_names() {
        assert!(is_temp_file_name(".tmpAb12Cd"));
        assert!(!is_temp_file_name(".tmp_plan.txt"));
        assert!(!is_temp_file_name(".tmpAb12C"));
        assert!(!is_temp_file_name("notes.tmpAb12Cd"));
    }

    #[test]
    fn scratch_files_match_temp_pattern() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("note.txt");
        let mut seen = None;
        let _ = write_atomic_with(&path, |file| {
            seen = file
                .path()
                .file_name()
                .map(|n| n.to_string_lossy().into_owned());
            Err(io::Error::other("stop before rename"))
        });
        assert!(is_temp_file_name(&seen.unwrap()));
    }

    #[test]
    fn key_value_pairs() {
        assert_eq!(parse_key_value("font_size = 14"), Some(("font_size", "14")));
        assert_eq!(parse_key_value("font_size"), None);
        assert_eq!(parse_key_value("=14"), None);
    }
}
