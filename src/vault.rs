use crate::index::{scan_list_items, ListItem, StructuralIndex};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        VaultError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Host document store. Paths are vault-relative and `/`-separated.
pub trait DocumentStore {
    fn list_documents(&self) -> Result<Vec<String>, VaultError>;
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<String, VaultError>;
    fn write(&self, path: &str, content: &str) -> Result<(), VaultError>;
    /// Appends `text` verbatim to the end of the document.
    fn append(&self, path: &str, text: &str) -> Result<(), VaultError>;
}

/// A directory of markdown files.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsVault { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a vault path. Paths that step out of the root
    /// through `..` have none.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut full = self.root.clone();
        for part in path.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part == ".." {
                return None;
            }
            full.push(part);
        }
        Some(full)
    }

    /// An existing document file, or [`VaultError::NotFound`].
    fn document_file(&self, path: &str) -> Result<PathBuf, VaultError> {
        match self.resolve(path) {
            Some(full) if full.is_file() => Ok(full),
            _ => Err(VaultError::NotFound(path.to_string())),
        }
    }

    /// Vault-relative path for an absolute filesystem path under the root.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    fn collect(&self, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden {
                continue;
            }
            if entry.file_type()?.is_dir() {
                self.collect(&path, out)?;
            } else if is_markdown(&path) {
                if let Some(rel) = self.relative_path(&path) {
                    out.push(rel);
                }
            }
        }
        Ok(())
    }
}

pub fn is_markdown(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}

impl DocumentStore for FsVault {
    fn list_documents(&self) -> Result<Vec<String>, VaultError> {
        let mut docs = Vec::new();
        self.collect(&self.root, &mut docs)
            .map_err(|e| VaultError::io(self.root.display().to_string(), e))?;
        docs.sort();
        Ok(docs)
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map_or(false, |full| full.is_file())
    }

    fn read(&self, path: &str) -> Result<String, VaultError> {
        let full = self.document_file(path)?;
        fs::read_to_string(&full).map_err(|e| VaultError::io(path, e))
    }

    fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
        let full = self.document_file(path)?;
        fs::write(&full, content).map_err(|e| VaultError::io(path, e))
    }

    fn append(&self, path: &str, text: &str) -> Result<(), VaultError> {
        let full = self.document_file(path)?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&full)
            .map_err(|e| VaultError::io(path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| VaultError::io(path, e))
    }
}

impl StructuralIndex for FsVault {
    fn list_items(&self, document_path: &str) -> Option<Vec<ListItem>> {
        let text = self.read(document_path).ok()?;
        Some(scan_list_items(&text))
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory vault for unit tests.

    use super::{DocumentStore, VaultError};
    use crate::index::{scan_list_items, ListItem, StructuralIndex};
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;

    #[derive(Default)]
    pub struct MemoryVault {
        pub docs: RefCell<BTreeMap<String, String>>,
        pub writes: Cell<usize>,
        pub fail_writes: Cell<bool>,
    }

    impl MemoryVault {
        pub fn with(docs: &[(&str, &str)]) -> Self {
            let vault = MemoryVault::default();
            for (path, text) in docs {
                vault
                    .docs
                    .borrow_mut()
                    .insert(path.to_string(), text.to_string());
            }
            vault
        }

        pub fn text(&self, path: &str) -> String {
            self.docs.borrow().get(path).cloned().unwrap_or_default()
        }

        fn check_writable(&self, path: &str) -> Result<(), VaultError> {
            if !self.docs.borrow().contains_key(path) {
                return Err(VaultError::NotFound(path.to_string()));
            }
            if self.fail_writes.get() {
                return Err(VaultError::Io {
                    path: path.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
    }

    impl DocumentStore for MemoryVault {
        fn list_documents(&self) -> Result<Vec<String>, VaultError> {
            Ok(self.docs.borrow().keys().cloned().collect())
        }

        fn exists(&self, path: &str) -> bool {
            self.docs.borrow().contains_key(path)
        }

        fn read(&self, path: &str) -> Result<String, VaultError> {
            self.docs
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| VaultError::NotFound(path.to_string()))
        }

        fn write(&self, path: &str, content: &str) -> Result<(), VaultError> {
            self.check_writable(path)?;
            self.docs
                .borrow_mut()
                .insert(path.to_string(), content.to_string());
            Ok(())
        }

        fn append(&self, path: &str, text: &str) -> Result<(), VaultError> {
            self.check_writable(path)?;
            if let Some(doc) = self.docs.borrow_mut().get_mut(path) {
                doc.push_str(text);
            }
            Ok(())
        }
    }

    impl StructuralIndex for MemoryVault {
        fn list_items(&self, document_path: &str) -> Option<Vec<ListItem>> {
            self.docs
                .borrow()
                .get(document_path)
                .map(|text| scan_list_items(text))
        }
    }
}
