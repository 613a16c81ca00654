use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::core::error::{PatchError, PatchResultOf};

/// Read a UTF-8 text file; a missing file is `FileNotFound`
pub fn read_text(path: &Path) -> PatchResultOf<String> {
    read_optional(path)?.ok_or_else(|| PatchError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Read a UTF-8 text file, `None` when it does not exist
pub fn read_optional(path: &Path) -> PatchResultOf<Option<String>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PatchError::io(path, e)),
    };

    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| PatchError::invalid(format!("{} is not valid UTF-8: {e}", path.display())))
}

/// Atomic write: same-dir tempfile, fsync, then rename over the target
pub fn write_atomic(path: &Path, data: &[u8]) -> PatchResultOf<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| PatchError::io(dir, e))?;

    // Preserve original permissions
    let perms = fs::metadata(path).map(|m| m.permissions()).ok();

    let tmp = match tempfile::NamedTempFile::new_in(dir) {
        Ok(t) => t,
        Err(_) => tempfile::NamedTempFile::new().map_err(|e| PatchError::io(path, e))?,
    };

    let mut file = tmp.as_file();
    file.write_all(data)
        .and_then(|_| file.sync_all())
        .map_err(|e| PatchError::io(tmp.path(), e))?;

    if let Some(perms) = perms {
        fs::set_permissions(tmp.path(), perms).map_err(|e| PatchError::io(tmp.path(), e))?;
    }

    // fsync parent dir for durability on Unix
    #[cfg(unix)]
    {
        if let Ok(parent_file) = fs::File::open(dir) {
            let _ = parent_file.sync_all();
        }
    }

    if let Err(e) = tmp.persist(path) {
        // Different filesystem: copy fallback
        fs::copy(e.file.path(), path).map_err(|err| PatchError::io(path, err))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.txt");

        assert!(read_optional(&path).unwrap().is_none());
        assert!(matches!(
            read_text(&path).unwrap_err(),
            PatchError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_write_atomic_replaces_and_creates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt");

        write_atomic(&path, b"first\n").unwrap();
        assert_eq!(read_text(&path).unwrap(), "first\n");

        write_atomic(&path, b"second\n").unwrap();
        assert_eq!(read_text(&path).unwrap(), "second\n");
    }

    #[test]
    fn test_invalid_utf8_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.dat");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = read_text(&path).unwrap_err();
        assert_eq!(err.code_str(), "rpatch::invalid_input");
    }
}
