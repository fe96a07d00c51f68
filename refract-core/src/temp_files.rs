//! Temporary file management utilities.
//!
//! Two kinds of transient resources live here. `TempWorkspace` owns the pair
//! of frame directories used by one video upscale run and removes them when it
//! is dropped, on success, error and unwinding alike. The staging helpers
//! create a temp file beside a final output so a result only appears at its
//! destination once it is complete.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use tempfile::{Builder as TempFileBuilder, NamedTempFile, TempDir};
use walkdir::WalkDir;

use crate::error::{CoreError, CoreResult};

/// Prefix of the extracted-frames directory.
pub const FRAMES_DIR_PREFIX: &str = "refract_frames_";

/// Prefix of the upscaled-frames directory.
pub const UPSCALED_DIR_PREFIX: &str = "refract_frames_up_";

/// Process-wide counter so two runs in the same millisecond never collide.
static WORKSPACE_SEQ: AtomicU64 = AtomicU64::new(0);

/// The frames-in / frames-out directory pair owned by one pipeline run.
#[derive(Debug)]
pub struct TempWorkspace {
    frames_dir: PathBuf,
    upscaled_dir: PathBuf,
    keep: bool,
}

impl TempWorkspace {
    /// Creates both directories under `root` with exclusive `create_dir`.
    ///
    /// The names combine a millisecond timestamp, the process id and a
    /// counter; an existing directory is an error, never shared.
    pub fn create(root: &Path, keep: bool) -> CoreResult<Self> {
        fs::create_dir_all(root)?;

        let qualifier = format!(
            "{}_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            std::process::id(),
            WORKSPACE_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let frames_dir = root.join(format!("{FRAMES_DIR_PREFIX}{qualifier}"));
        let upscaled_dir = root.join(format!("{UPSCALED_DIR_PREFIX}{qualifier}"));

        fs::create_dir(&frames_dir).map_err(|e| workspace_error(&frames_dir, e))?;
        if let Err(e) = fs::create_dir(&upscaled_dir) {
            remove_tree(&frames_dir);
            return Err(workspace_error(&upscaled_dir, e));
        }

        debug!(
            "Created temp workspace {} and {}",
            frames_dir.display(),
            upscaled_dir.display()
        );
        Ok(Self {
            frames_dir,
            upscaled_dir,
            keep,
        })
    }

    /// Directory receiving extracted frames.
    #[must_use]
    pub fn frames_dir(&self) -> &Path {
        &self.frames_dir
    }

    /// Directory receiving upscaled frames.
    #[must_use]
    pub fn upscaled_dir(&self) -> &Path {
        &self.upscaled_dir
    }

    #[must_use]
    pub fn keeps_files(&self) -> bool {
        self.keep
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        if self.keep {
            info!(
                "Keeping temp frames in {} and {}",
                self.frames_dir.display(),
                self.upscaled_dir.display()
            );
            return;
        }
        let failures = remove_tree(&self.frames_dir) + remove_tree(&self.upscaled_dir);
        if failures > 0 {
            warn!("Temp workspace cleanup left {failures} entries behind");
        } else {
            debug!("Removed temp workspace");
        }
    }
}

fn workspace_error(path: &Path, err: io::Error) -> CoreError {
    if err.kind() == io::ErrorKind::AlreadyExists {
        CoreError::PathError(format!(
            "temp directory {} already exists",
            path.display()
        ))
    } else {
        CoreError::Io(err)
    }
}

/// Deletes `root` and everything under it, deepest entries first.
///
/// Individual failures are logged and skipped; returns how many entries
/// could not be removed.
pub fn remove_tree(root: &Path) -> usize {
    if !root.exists() {
        return 0;
    }
    let mut failures = 0;
    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable temp entry: {e}");
                failures += 1;
                continue;
            }
        };
        let path = entry.path();
        let result = if entry.file_type().is_dir() {
            fs::remove_dir(path)
        } else {
            fs::remove_file(path)
        };
        if let Err(e) = result {
            debug!("Failed to remove {}: {e}", path.display());
            failures += 1;
        }
    }
    failures
}

/// Creates a temporary directory with prefix under `root`. Auto-cleaned when dropped.
pub fn create_temp_dir(root: &Path, prefix: &str) -> CoreResult<TempDir> {
    fs::create_dir_all(root)?;
    Ok(TempFileBuilder::new().prefix(prefix).tempdir_in(root)?)
}

/// Creates a hidden staging file beside `destination`, keeping its extension
/// so encoders that pick a container from the name still work. On Unix the
/// file is created with the same mode a plain `File::create` would give it.
pub fn create_staging_file(destination: &Path) -> CoreResult<NamedTempFile> {
    let dir = parent_dir(destination);
    fs::create_dir_all(&dir)?;

    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let suffix = destination
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let prefix = format!(".{stem}.");
    let mut builder = TempFileBuilder::new();
    builder.prefix(&prefix).suffix(&suffix);
    // Published outputs get 0666 minus the umask, like any created file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    Ok(builder.tempfile_in(&dir)?)
}

/// Atomically moves a finished staging file onto `destination`.
pub fn persist_staging_file(staging: NamedTempFile, destination: &Path) -> CoreResult<()> {
    staging
        .persist(destination)
        .map_err(|e| CoreError::Io(e.error))?;
    debug!("Published {}", destination.display());
    Ok(())
}

/// Parent directory of `path`, `.` for bare file names.
#[must_use]
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
