//! Filesystem infrastructure: implements `SystemFs` against the real host.

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use anyhow::{Context, Result};
use rustix::fs::chown;
use rustix::io::Errno;
use rustix::process::{Gid, Uid};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::application::ports::SystemFs;

/// Production filesystem implementation of `SystemFs`.
pub struct LocalSystemFs;

fn ensure_parent(path: &Path) -> Result<&Path> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("creating directory {}", parent.display()))?;
    Ok(parent)
}

/// Rename, falling back to copy + remove when `src` and `dest` live on
/// different filesystems (uploads usually land in `/tmp` or `/home`).
fn move_file(src: &Path, dest: &Path) -> Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(Errno::XDEV.raw_os_error()) => {
            debug!(src = %src.display(), dest = %dest.display(), "cross-device move, copying");
            std::fs::copy(src, dest)
                .with_context(|| format!("copying {} to {}", src.display(), dest.display()))?;
            std::fs::remove_file(src).with_context(|| format!("removing {}", src.display()))
        }
        Err(e) => Err(e).with_context(|| format!("moving {} to {}", src.display(), dest.display())),
    }
}

impl SystemFs for LocalSystemFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn size(&self, path: &Path) -> Option<u64> {
        std::fs::metadata(path).ok().map(|m| m.len())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).with_context(|| format!("reading file {}", path.display()))
    }

    fn install_private(&self, src: &Path, dest: &Path) -> Result<()> {
        chown(src, Some(Uid::ROOT), Some(Gid::ROOT))
            .with_context(|| format!("changing owner of {}", src.display()))?;
        std::fs::set_permissions(src, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", src.display()))?;
        ensure_parent(dest)?;
        move_file(src, dest)
    }

    fn write_atomic(&self, path: &Path, content: &[u8], mode: u32) -> Result<()> {
        let parent = ensure_parent(path)?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("creating temporary file in {}", parent.display()))?;
        tmp.write_all(content)
            .with_context(|| format!("writing {}", tmp.path().display()))?;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode))
            .context("setting permissions on temporary file")?;
        tmp.as_file().sync_all().context("syncing temporary file")?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }
}
