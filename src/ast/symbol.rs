use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Mutex;
use string_interner::{DefaultStringInterner, DefaultSymbol};

static INTERNED_STRINGS: Lazy<Mutex<DefaultStringInterner>> =
    Lazy::new(|| Mutex::new(DefaultStringInterner::new()));

/// An interned string, used for variable names and extern call targets.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    pub fn intern(string: &str) -> Self {
        let mut interned = INTERNED_STRINGS.lock().unwrap();
        Symbol(interned.get_or_intern(string))
    }

    pub fn to_owned(self) -> String {
        let interned = INTERNED_STRINGS.lock().unwrap();
        interned.resolve(self.0).unwrap().to_owned()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interned = INTERNED_STRINGS.lock().unwrap();
        fmt::Debug::fmt(interned.resolve(self.0).unwrap(), f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let interned = INTERNED_STRINGS.lock().unwrap();
        fmt::Display::fmt(interned.resolve(self.0).unwrap(), f)
    }
}
