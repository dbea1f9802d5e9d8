use anyhow::{Context, Result};
use lh_core::LocalHistory;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Create workspace with initial files
    pub fn with_files(files: &BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let workspace = Self::empty()?;
        for (path, content) in files {
            workspace.write_file(path, content)?;
        }
        Ok(workspace)
    }

    /// Directory holding fixture workspaces
    pub fn fixture_path(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name)
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Initialize local history in workspace
    pub fn init_history(&self) -> Result<LocalHistory> {
        Ok(LocalHistory::init(self.path())?)
    }

    /// Open existing local history
    pub fn open_history(&self) -> Result<LocalHistory> {
        Ok(LocalHistory::open(self.path())?)
    }

    /// Write file to workspace
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.path().join(path);

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Read file from workspace
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.path().join(path);
        fs::read(&full_path).with_context(|| format!("Failed to read file: {}", path))
    }

    /// Workspace files (excluding `.lh`) as sorted relative paths
    pub fn list_files(&self) -> Result<Vec<String>> {
        let mut out = Vec::new();
        list_recursive(self.path(), "", &mut out)?;
        out.sort();
        Ok(out)
    }
}

fn list_recursive(dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if prefix.is_empty() && name == lh_core::LH_DIR {
            continue;
        }
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            list_recursive(&entry.path(), &rel, out)?;
        } else {
            out.push(rel);
        }
    }
    Ok(())
}

/// Recursively read a directory into relative path -> content
pub fn read_dir_recursive(src: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
    fn go(dir: &Path, prefix: &str, out: &mut BTreeMap<String, Vec<u8>>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            if entry.file_type()?.is_dir() {
                go(&entry.path(), &rel, out)?;
            } else {
                out.insert(rel, fs::read(entry.path())?);
            }
        }
        Ok(())
    }

    let mut out = BTreeMap::new();
    go(src, "", &mut out)?;
    Ok(out)
}
