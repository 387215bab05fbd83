//! Persisted dependency snapshots

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Record of a subject's dependency names as of its last successful build.
///
/// Stored as one name per line under
/// `<output_dir>/saved-deps/<kind>/<subject>`.
#[derive(Debug, Clone)]
pub struct SavedDeps {
    path: PathBuf,
}

impl SavedDeps {
    /// Snapshot location for one (subject, task kind) pair
    pub fn new(output_dir: &Path, kind_name: &str, subject: &str) -> Self {
        Self {
            path: output_dir.join("saved-deps").join(kind_name).join(subject),
        }
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved dependency names; `None` if there is no record
    pub fn load(&self) -> io::Result<Option<Vec<String>>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents.lines().map(String::from).collect())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether `current` differs from the saved record.
    ///
    /// A missing record counts as a change only when `current` is non-empty.
    pub fn changed(&self, current: &[String]) -> io::Result<bool> {
        let changed = match self.load()? {
            Some(last) => last != current,
            None => !current.is_empty(),
        };
        if changed {
            debug!(path = %self.path.display(), "saved dependencies differ");
        }
        Ok(changed)
    }

    /// Save `current`, or remove the record when there are no dependencies
    pub fn persist(&self, current: &[String]) -> io::Result<()> {
        if current.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            };
        }

        safe_create(&self.path, |file| {
            let mut writer = BufWriter::new(file);
            for name in current {
                writeln!(writer, "{}", name)?;
            }
            writer.flush()
        })
    }
}

/// Create `path` atomically.
///
/// The content is written to a uniquely named temporary file in the same
/// directory and renamed into place, so readers never observe a partial file
/// and concurrent writers of the same path do not collide. Which writer wins
/// is unspecified. On error the temporary file is removed.
pub fn safe_create<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let suffix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tmp = tempfile::Builder::new()
        .prefix(".tmp")
        .suffix(&suffix)
        .tempfile_in(dir)?;

    write(tmp.as_file_mut())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o644))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
