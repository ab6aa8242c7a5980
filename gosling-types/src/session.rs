//! Project session: the one mutable object of the front end.
//!
//! A [`Session`] owns the shared interner, the authoritative set of parsed
//! files, and the current [`Snapshot`]. Readers clone the snapshot `Arc`
//! under a read lock and resolve against it for as long as they like;
//! updates re-parse the changed file, rebuild a fresh snapshot, and swap
//! it in under the write lock. A resolution therefore never observes a
//! half-rebuilt index, and a reparse never races a walk — the walk just
//! finishes against the version it started with.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use gosling_lexer::Interner;
use gosling_parser::{parse_file, ParseMode, ParsedFile};

use crate::snapshot::Snapshot;

/// Maps an import path to the source directory holding that package,
/// consulting GOPATH/GOROOT or whatever project model the host provides.
/// A `None` becomes an unresolved-import warning, never a parse failure.
pub trait ImportResolver: Send + Sync {
    fn resolve_dir(&self, import_path: &str) -> Option<Arc<str>>;
}

/// Resolver that places nothing; every import gets a warning.
#[derive(Debug, Default)]
pub struct NoImports;

impl ImportResolver for NoImports {
    fn resolve_dir(&self, _import_path: &str) -> Option<Arc<str>> {
        None
    }
}

/// Resolver backed by a fixed import-path → directory table, for tests
/// and self-contained projects.
#[derive(Debug, Default)]
pub struct TableImports {
    table: HashMap<String, Arc<str>>,
}

impl TableImports {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, import_path: &str, dir: &str) {
        self.table.insert(import_path.to_owned(), Arc::from(dir));
    }
}

impl ImportResolver for TableImports {
    fn resolve_dir(&self, import_path: &str) -> Option<Arc<str>> {
        self.table.get(import_path).cloned()
    }
}

pub struct Session {
    interner: Interner,
    resolver: Box<dyn ImportResolver>,
    files: Mutex<HashMap<Arc<str>, Arc<ParsedFile>>>,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Session {
    #[must_use]
    pub fn new(resolver: Box<dyn ImportResolver>) -> Self {
        Self {
            interner: Interner::new(),
            resolver,
            files: Mutex::new(HashMap::new()),
            snapshot: RwLock::new(Snapshot::empty()),
        }
    }

    #[must_use]
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// The current immutable index. Hold the `Arc`, not the lock.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    #[must_use]
    pub fn file(&self, path: &str) -> Option<Arc<ParsedFile>> {
        self.files.lock().get(path).cloned()
    }

    /// Parse (or re-parse) one file and swap in a rebuilt snapshot.
    /// One parse per file is in flight at a time; re-parse is a
    /// synchronous replace of the old translation unit.
    pub fn update_file(&self, path: &str, source: &str, mode: ParseMode) -> Arc<ParsedFile> {
        let parsed = Arc::new(parse_file(&self.interner, path, source, mode));
        let mut files = self.files.lock();
        files.insert(Arc::clone(&parsed.path), Arc::clone(&parsed));
        self.rebuild(&files);
        parsed
    }

    /// Drop a file and swap in a rebuilt snapshot.
    pub fn remove_file(&self, path: &str) {
        let mut files = self.files.lock();
        if files.remove(path).is_some() {
            self.rebuild(&files);
        }
    }

    /// Rebuild wholesale. Called with the file-map lock held so rebuilds
    /// are serialized and each snapshot version reflects exactly one
    /// file-set state.
    fn rebuild(&self, files: &HashMap<Arc<str>, Arc<ParsedFile>>) {
        let mut import_dirs = HashMap::new();
        for file in files.values() {
            for import in &file.imports {
                if import_dirs.contains_key(&import.path) {
                    continue;
                }
                if let Some(dir) = self.resolver.resolve_dir(&import.path) {
                    import_dirs.insert(import.path.clone(), dir);
                }
            }
        }
        let version = self.snapshot.read().version() + 1;
        let next = Snapshot::build(version, files, import_dirs);
        tracing::debug!(version, files = files.len(), "snapshot rebuilt");
        *self.snapshot.write() = next;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("files", &self.files.lock().len())
            .field("snapshot", &self.snapshot.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_bumps_snapshot_version() {
        let session = Session::new(Box::new(NoImports));
        assert_eq!(session.snapshot().version(), 0);
        session.update_file("a/a.go", "package a\n", ParseMode::Full);
        assert_eq!(session.snapshot().version(), 1);
        session.update_file("a/b.go", "package a\n", ParseMode::Full);
        assert_eq!(session.snapshot().version(), 2);
        let snap = session.snapshot();
        assert_eq!(
            snap.package_of("a/a.go").map(|p| p.files.len()),
            Some(2)
        );
    }

    #[test]
    fn unresolved_import_becomes_a_warning() {
        let session = Session::new(Box::new(NoImports));
        session.update_file("a/a.go", "package a\n\nimport \"fmt\"\n", ParseMode::Full);
        let snap = session.snapshot();
        let warnings = snap.import_warnings("a/a.go");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("fmt"));
    }

    #[test]
    fn removed_file_leaves_the_package() {
        let session = Session::new(Box::new(NoImports));
        session.update_file("a/a.go", "package a\n", ParseMode::Full);
        session.remove_file("a/a.go");
        assert!(session.snapshot().package_of("a/a.go").is_none());
    }
}
