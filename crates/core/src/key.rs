//! Flat-namespace keys.
//!
//! v3 keys are byte strings. They are compared and deleted by their raw
//! bytes; text output shows valid UTF-8 as-is and every invalid byte as
//! `\xNN`.

use std::borrow::Borrow;
use std::fmt::{self, Write as _};

use serde::{Serialize, Serializer};

/// A raw flat key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FlatKey(Vec<u8>);

impl FlatKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key as text, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// The key in double quotes with C-style escapes, e.g. `"/a\x00\xff"`.
    pub fn quoted(&self) -> Quoted<'_> {
        Quoted(self)
    }
}

impl From<Vec<u8>> for FlatKey {
    fn from(bytes: Vec<u8>) -> Self {
        FlatKey(bytes)
    }
}

impl From<&[u8]> for FlatKey {
    fn from(bytes: &[u8]) -> Self {
        FlatKey(bytes.to_vec())
    }
}

impl From<String> for FlatKey {
    fn from(key: String) -> Self {
        FlatKey(key.into_bytes())
    }
}

impl From<&str> for FlatKey {
    fn from(key: &str) -> Self {
        FlatKey(key.as_bytes().to_vec())
    }
}

impl From<&FlatKey> for FlatKey {
    fn from(key: &FlatKey) -> Self {
        key.clone()
    }
}

impl Borrow<[u8]> for FlatKey {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for FlatKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<str> for FlatKey {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for FlatKey {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for FlatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.0.utf8_chunks() {
            f.write_str(chunk.valid())?;
            for byte in chunk.invalid() {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FlatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.quoted(), f)
    }
}

impl Serialize for FlatKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Display adapter returned by [`FlatKey::quoted`].
pub struct Quoted<'a>(&'a FlatKey);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for chunk in self.0 .0.utf8_chunks() {
            for c in chunk.valid().chars() {
                write_quoted_char(f, c)?;
            }
            for byte in chunk.invalid() {
                write!(f, "\\x{byte:02x}")?;
            }
        }
        f.write_char('"')
    }
}

fn write_quoted_char(f: &mut fmt::Formatter<'_>, c: char) -> fmt::Result {
    match c {
        '"' => f.write_str("\\\""),
        '\\' => f.write_str("\\\\"),
        '\x07' => f.write_str("\\a"),
        '\x08' => f.write_str("\\b"),
        '\x0c' => f.write_str("\\f"),
        '\n' => f.write_str("\\n"),
        '\r' => f.write_str("\\r"),
        '\t' => f.write_str("\\t"),
        '\x0b' => f.write_str("\\v"),
        c if (c as u32) < 0x20 || c == '\x7f' => write!(f, "\\x{:02x}", c as u32),
        c if c.is_control() => write!(f, "\\u{:04x}", c as u32),
        c => f.write_char(c),
    }
}
