use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Allocates one scratch directory per execution attempt
///
/// Every attempt gets a fresh, uniquely named directory under `root`, so
/// concurrent verifications never share file names. The directory and all
/// compiler byproducts inside it are removed when the [`Workspace`] is
/// dropped, whatever path the attempt took.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn allocate(&self) -> io::Result<Workspace> {
        let dir = tempfile::Builder::new()
            .prefix("exercise_")
            .tempdir_in(&self.root)?;
        log::debug!("Allocated workspace {}", dir.path().display());
        Ok(Workspace { dir })
    }
}

/// A scoped scratch directory, removed recursively on drop
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file into the workspace and returns its full path
    pub fn write_file(&self, name: &str, contents: &str) -> io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Strips the workspace location from a message
    ///
    /// Diagnostics that mention absolute paths would otherwise differ
    /// between two runs of the same submission.
    pub fn scrub(&self, message: &str) -> String {
        let prefix = format!("{}/", self.dir.path().display());
        message
            .replace(&prefix, "")
            .replace(&self.dir.path().display().to_string(), ".")
    }

    /// Removes the workspace now, reporting failures instead of ignoring them
    pub fn close(self) -> io::Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        log::debug!("Removed workspace {}", path.display());
        Ok(())
    }
}
