//! Immutable cross-file package index.
//!
//! A [`Snapshot`] binds together every parsed file of every known package
//! at one instant. It is rebuilt wholesale when the file set changes and
//! never patched in place, so a resolution that holds an `Arc<Snapshot>`
//! can never observe a half-updated view. The only interior mutability is
//! the per-file import-alias cache, which is a pure memo.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use gosling_lexer::Name;
use gosling_parser::ast::DeclId;
use gosling_parser::{Diagnostic, ParsedFile, Severity, SymbolId};

/// Identity of one package: resolved source directory plus package name.
/// Two files belong to the same package iff their keys are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    pub dir: Arc<str>,
    pub name: Name,
}

/// All parsed files of one package, in stable path order.
#[derive(Debug)]
pub struct Package {
    pub key: PackageKey,
    pub files: Vec<Arc<ParsedFile>>,
}

/// Directory portion of a file path; `"."` for bare file names.
#[must_use]
pub fn dir_of(path: &str) -> Arc<str> {
    match path.rfind('/') {
        Some(0) => Arc::from("/"),
        Some(i) => Arc::from(&path[..i]),
        None => Arc::from("."),
    }
}

/// One immutable version of the project-wide index.
pub struct Snapshot {
    version: u64,
    packages: HashMap<PackageKey, Arc<Package>>,
    /// File path → owning package.
    by_path: HashMap<Arc<str>, PackageKey>,
    /// Import path → resolved source directory, for the imports that the
    /// session's resolver could place.
    import_dirs: HashMap<String, Arc<str>>,
    /// Unresolved-import warnings, keyed by file path.
    import_warnings: HashMap<Arc<str>, Vec<Diagnostic>>,
    /// (file path, alias) → package, filled on first lookup.
    alias_cache: DashMap<(Arc<str>, Name), Option<PackageKey>>,
}

impl Snapshot {
    /// The version-zero snapshot with no packages.
    #[must_use]
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            version: 0,
            packages: HashMap::new(),
            by_path: HashMap::new(),
            import_dirs: HashMap::new(),
            import_warnings: HashMap::new(),
            alias_cache: DashMap::new(),
        })
    }

    /// Aggregate `files` into packages. `import_dirs` maps the import paths
    /// the session resolver could place; imports missing from it get a
    /// warning attached to the importing file.
    #[must_use]
    pub fn build(
        version: u64,
        files: &HashMap<Arc<str>, Arc<ParsedFile>>,
        import_dirs: HashMap<String, Arc<str>>,
    ) -> Arc<Self> {
        let mut packages: HashMap<PackageKey, Vec<Arc<ParsedFile>>> = HashMap::new();
        let mut by_path = HashMap::new();
        let mut import_warnings: HashMap<Arc<str>, Vec<Diagnostic>> = HashMap::new();

        for (path, file) in files {
            let Some(name) = file.ast.package_name else {
                continue;
            };
            let key = PackageKey {
                dir: dir_of(path),
                name,
            };
            packages.entry(key.clone()).or_default().push(Arc::clone(file));
            by_path.insert(Arc::clone(path), key);

            for import in &file.imports {
                if import_dirs.contains_key(&import.path) {
                    continue;
                }
                let spec = file.arena.spec(import.spec);
                let tok = file.token(spec.range.first);
                import_warnings
                    .entry(Arc::clone(path))
                    .or_default()
                    .push(Diagnostic {
                        severity: Severity::Warning,
                        file: Arc::clone(&file.path),
                        line: tok.line,
                        column: tok.column,
                        length: tok.length,
                        message: format!("cannot resolve import \"{}\"", import.path),
                    });
            }
        }

        let packages = packages
            .into_iter()
            .map(|(key, mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                (key.clone(), Arc::new(Package { key, files }))
            })
            .collect();

        Arc::new(Self {
            version,
            packages,
            by_path,
            import_dirs,
            import_warnings,
            alias_cache: DashMap::new(),
        })
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub fn package(&self, key: &PackageKey) -> Option<&Arc<Package>> {
        self.packages.get(key)
    }

    /// Package owning the file at `path`.
    #[must_use]
    pub fn package_of(&self, path: &str) -> Option<&Arc<Package>> {
        self.packages.get(self.by_path.get(path)?)
    }

    pub fn iter_packages(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.packages.values()
    }

    /// Warnings about imports the session resolver could not place.
    #[must_use]
    pub fn import_warnings(&self, path: &str) -> &[Diagnostic] {
        self.import_warnings
            .get(path)
            .map_or(&[], Vec::as_slice)
    }

    /// Package referred to by an import alias in `file`, if the import's
    /// path resolved to a directory holding a known package. Memoized per
    /// (file, alias).
    #[must_use]
    pub fn package_for_alias(&self, file: &ParsedFile, alias: Name) -> Option<PackageKey> {
        let cache_key = (Arc::clone(&file.path), alias);
        if let Some(hit) = self.alias_cache.get(&cache_key) {
            return hit.clone();
        }
        let resolved = self.resolve_alias(file, alias);
        self.alias_cache.insert(cache_key, resolved.clone());
        resolved
    }

    fn resolve_alias(&self, file: &ParsedFile, alias: Name) -> Option<PackageKey> {
        let import = file.imports.iter().find(|i| i.alias == alias)?;
        let dir = self.import_dirs.get(&import.path)?;
        self.packages
            .keys()
            .find(|key| key.dir == *dir)
            .cloned()
    }

    /// Package-level symbol lookup across all files of a package.
    #[must_use]
    pub fn find_package_symbol(
        &self,
        key: &PackageKey,
        name: Name,
    ) -> Option<(Arc<ParsedFile>, SymbolId)> {
        let package = self.packages.get(key)?;
        for file in &package.files {
            if let Some(sym) = file.scopes.find(file.file_scope, name) {
                return Some((Arc::clone(file), sym));
            }
        }
        None
    }

    /// Method lookup across all files of a package: any file may add a
    /// method to a type declared in a sibling file.
    #[must_use]
    pub fn find_method(
        &self,
        key: &PackageKey,
        recv: Name,
        method: Name,
    ) -> Option<(Arc<ParsedFile>, DeclId)> {
        let package = self.packages.get(key)?;
        for file in &package.files {
            if let Some(&decl) = file.methods.get(&(recv, method)) {
                return Some((Arc::clone(file), decl));
            }
        }
        None
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("packages", &self.packages.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_of_splits_paths() {
        assert_eq!(&*dir_of("a/b/c.go"), "a/b");
        assert_eq!(&*dir_of("/c.go"), "/");
        assert_eq!(&*dir_of("c.go"), ".");
    }
}
