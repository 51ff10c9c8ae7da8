//! PEM key files on disk.

use anyhow::{Context, Result, bail};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::crypto::random;

/// A key file written atomically.
///
/// Private key files are created owner-read/write only on Unix.
#[derive(Debug, Clone)]
pub struct KeyFile {
    path: PathBuf,
    private: bool,
}

impl KeyFile {
    /// A file for public material.
    pub fn public(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            private: false,
        }
    }

    /// A file for private keys and secrets.
    pub fn private(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            private: true,
        }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file as text.
    pub fn load(&self) -> Result<Zeroizing<String>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read key file {}", self.path.display()))?;
        Ok(Zeroizing::new(text))
    }

    /// Writes `contents`, replacing any existing file.
    ///
    /// The data goes to a fresh temporary file in the same directory, which
    /// is synced and then renamed over the target, so readers see either the
    /// old key or the new one. Parent directories are created as needed.
    pub fn save(&self, contents: &str) -> Result<()> {
        if self.path.file_name().is_none() {
            bail!("key file path has no file name: {}", self.path.display());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.random_tmp_path()?;

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            if self.private {
                options.mode(0o600);
            }
        }
        let mut tmp_file = options
            .open(&tmp_path)
            .context("failed to create temporary file")?;

        tmp_file.write_all(contents.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        if let Err(e) = self.atomic_replace(&tmp_path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                File::open(parent)?.sync_all()?;
            }
        }

        Ok(())
    }

    /// `name.tmp.<16 hex chars>` next to the target.
    fn random_tmp_path(&self) -> Result<PathBuf> {
        let suffix = hex::encode(random::random_bytes(8)?);
        let file_name = self
            .path
            .file_name()
            .context("key file path has no file name")?
            .to_string_lossy();
        Ok(self.path.with_file_name(format!("{file_name}.tmp.{suffix}")))
    }

    #[cfg(target_os = "windows")]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        use std::ffi::OsStr;
        use std::os::windows::ffi::OsStrExt;
        use windows_sys::Win32::Storage::FileSystem::{
            MOVEFILE_REPLACE_EXISTING, MOVEFILE_WRITE_THROUGH, MoveFileExW, REPLACEFILE_WRITE_THROUGH,
            ReplaceFileW,
        };

        fn to_wide(s: &OsStr) -> Vec<u16> {
            s.encode_wide().chain(std::iter::once(0)).collect()
        }

        let target_w = to_wide(self.path.as_os_str());
        let tmp_w = to_wide(tmp_path.as_os_str());

        // SAFETY: both buffers are NUL-terminated UTF-16 and outlive the call.
        let result = unsafe {
            if self.path.exists() {
                ReplaceFileW(
                    target_w.as_ptr(),
                    tmp_w.as_ptr(),
                    std::ptr::null(),
                    REPLACEFILE_WRITE_THROUGH,
                    std::ptr::null(),
                    std::ptr::null(),
                )
            } else {
                MoveFileExW(
                    tmp_w.as_ptr(),
                    target_w.as_ptr(),
                    MOVEFILE_REPLACE_EXISTING | MOVEFILE_WRITE_THROUGH,
                )
            }
        };

        if result == 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context("atomic replace failed");
        }

        Ok(())
    }

    #[cfg(not(target_os = "windows"))]
    fn atomic_replace(&self, tmp_path: &Path) -> Result<()> {
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }
}
