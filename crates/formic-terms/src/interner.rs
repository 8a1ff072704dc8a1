//! String interner for symbol names and string literals.
//!
//! Interned strings are passed around as `Atom`s (a `u32` index), so name
//! comparisons are integer comparisons and each distinct string is stored
//! once per table.

use rustc_hash::FxHashMap;

/// An interned string identifier.
///
/// Atoms are cheap to copy and can be compared with `==` in O(1). To get the
/// actual string, use [`StringInterner::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Atom(pub u32);

impl Atom {
    /// Sentinel value representing no atom / empty string.
    pub const NONE: Atom = Atom(0);

    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Single-owner string interner. Index 0 is always the empty string.
#[derive(Debug, Default)]
pub struct StringInterner {
    strings: Vec<Box<str>>,
    map: FxHashMap<Box<str>, u32>,
}

impl StringInterner {
    pub fn new() -> Self {
        let mut interner = StringInterner {
            strings: Vec::new(),
            map: FxHashMap::default(),
        };
        interner.intern("");
        interner
    }

    pub fn intern(&mut self, s: &str) -> Atom {
        if let Some(&idx) = self.map.get(s) {
            return Atom(idx);
        }
        let idx = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.map.insert(boxed, idx);
        Atom(idx)
    }

    /// Look up an already-interned string without inserting it.
    pub fn get(&self, s: &str) -> Option<Atom> {
        self.map.get(s).map(|&idx| Atom(idx))
    }

    /// Resolve an atom back to its string.
    ///
    /// Panics if the atom was minted by a different interner.
    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        // Index 0 is pre-seeded, so the interner is never truly empty.
        self.strings.len() <= 1
    }
}
