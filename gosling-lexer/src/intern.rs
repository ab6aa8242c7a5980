//! Content-interned identifier, string-literal, and comment table.
//!
//! One [`Interner`] exists per project session and is shared by every
//! translation unit. The table is append-only: handles stay valid for the
//! whole session and entries are never removed. Reads take a shared lock;
//! inserting a new entry upgrades to an exclusive lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Handle to an interned byte string. Equality by handle is equality by
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name(pub u32);

/// Pre-interned well-known names: Go builtin type identifiers, predeclared
/// constants, builtin pseudo-functions, and the blank identifier. Their
/// handles are fixed so the parser and resolver can compare against them
/// without touching the table.
pub mod known {
    use super::Name;

    pub const BOOL: Name = Name(0);
    pub const BYTE: Name = Name(1);
    pub const COMPLEX64: Name = Name(2);
    pub const COMPLEX128: Name = Name(3);
    pub const ERROR: Name = Name(4);
    pub const FLOAT32: Name = Name(5);
    pub const FLOAT64: Name = Name(6);
    pub const INT: Name = Name(7);
    pub const INT8: Name = Name(8);
    pub const INT16: Name = Name(9);
    pub const INT32: Name = Name(10);
    pub const INT64: Name = Name(11);
    pub const RUNE: Name = Name(12);
    pub const STRING: Name = Name(13);
    pub const UINT: Name = Name(14);
    pub const UINT8: Name = Name(15);
    pub const UINT16: Name = Name(16);
    pub const UINT32: Name = Name(17);
    pub const UINT64: Name = Name(18);
    pub const UINTPTR: Name = Name(19);

    pub const TRUE: Name = Name(20);
    pub const FALSE: Name = Name(21);
    pub const IOTA: Name = Name(22);
    pub const NIL: Name = Name(23);

    pub const APPEND: Name = Name(24);
    pub const CAP: Name = Name(25);
    pub const CLOSE: Name = Name(26);
    pub const COMPLEX: Name = Name(27);
    pub const COPY: Name = Name(28);
    pub const DELETE: Name = Name(29);
    pub const IMAG: Name = Name(30);
    pub const LEN: Name = Name(31);
    pub const MAKE: Name = Name(32);
    pub const NEW: Name = Name(33);
    pub const PANIC: Name = Name(34);
    pub const PRINT: Name = Name(35);
    pub const PRINTLN: Name = Name(36);
    pub const REAL: Name = Name(37);
    pub const RECOVER: Name = Name(38);

    pub const BLANK: Name = Name(39);

    /// Spelled-out table, in handle order. `Interner::new` seeds the table
    /// from this list.
    pub(super) const ALL: &[&str] = &[
        "bool", "byte", "complex64", "complex128", "error", "float32", "float64", "int", "int8",
        "int16", "int32", "int64", "rune", "string", "uint", "uint8", "uint16", "uint32", "uint64",
        "uintptr", "true", "false", "iota", "nil", "append", "cap", "close", "complex", "copy",
        "delete", "imag", "len", "make", "new", "panic", "print", "println", "real", "recover",
        "_",
    ];

    /// Handle range covering the builtin type identifiers.
    #[must_use]
    pub fn is_builtin_type(name: Name) -> bool {
        name.0 <= UINTPTR.0
    }

    /// Handle range covering the builtin pseudo-functions (`len`, `make`, ...).
    #[must_use]
    pub fn is_builtin_func(name: Name) -> bool {
        (APPEND.0..=RECOVER.0).contains(&name.0)
    }
}

#[derive(Default)]
struct Inner {
    map: HashMap<Arc<str>, Name>,
    texts: Vec<Arc<str>>,
}

/// Append-only content-hashed name table.
pub struct Interner {
    inner: RwLock<Inner>,
}

impl Interner {
    /// Create a table pre-seeded with the [`known`] names.
    #[must_use]
    pub fn new() -> Self {
        let interner = Self {
            inner: RwLock::new(Inner::default()),
        };
        for text in known::ALL {
            interner.intern(text);
        }
        interner
    }

    /// Intern `text`, returning its stable handle.
    pub fn intern(&self, text: &str) -> Name {
        if let Some(&name) = self.inner.read().map.get(text) {
            return name;
        }
        let mut inner = self.inner.write();
        // Re-check: another writer may have inserted between the locks.
        if let Some(&name) = inner.map.get(text) {
            return name;
        }
        let name = Name(u32::try_from(inner.texts.len()).unwrap_or(u32::MAX));
        let text: Arc<str> = Arc::from(text);
        inner.texts.push(Arc::clone(&text));
        inner.map.insert(text, name);
        name
    }

    /// Resolve a handle back to its text.
    ///
    /// # Panics
    /// Panics if `name` was not produced by this table.
    #[must_use]
    pub fn resolve(&self, name: Name) -> Arc<str> {
        Arc::clone(&self.inner.read().texts[name.0 as usize])
    }

    /// Number of distinct entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_handles_match_seed_order() {
        let interner = Interner::new();
        assert_eq!(&*interner.resolve(known::INT), "int");
        assert_eq!(&*interner.resolve(known::STRING), "string");
        assert_eq!(&*interner.resolve(known::ERROR), "error");
        assert_eq!(&*interner.resolve(known::NEW), "new");
        assert_eq!(&*interner.resolve(known::MAKE), "make");
        assert_eq!(&*interner.resolve(known::BLANK), "_");
        assert_eq!(interner.len(), known::ALL.len());
    }

    #[test]
    fn intern_is_idempotent_by_content() {
        let interner = Interner::new();
        let a = interner.intern("fooBar");
        let b = interner.intern("fooBar");
        assert_eq!(a, b);
        assert_eq!(&*interner.resolve(a), "fooBar");
    }

    #[test]
    fn seeded_names_do_not_duplicate() {
        let interner = Interner::new();
        assert_eq!(interner.intern("int"), known::INT);
        assert_eq!(interner.len(), known::ALL.len());
    }

    #[test]
    fn builtin_classification() {
        assert!(known::is_builtin_type(known::UINTPTR));
        assert!(!known::is_builtin_type(known::TRUE));
        assert!(known::is_builtin_func(known::LEN));
        assert!(!known::is_builtin_func(known::NIL));
    }
}
