//! The unit of data flowing through a pipeline.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An opaque, immutable text record.
///
/// Cloning is cheap: the payload is reference counted, so a record peeked on a
/// stream and later read from it share the same allocation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Record(Arc<str>);

impl Record {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for Record {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Record {
    fn from(text: &str) -> Self {
        Self(Arc::from(text))
    }
}

impl From<String> for Record {
    fn from(text: String) -> Self {
        Self(Arc::from(text))
    }
}

impl PartialEq<str> for Record {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Record {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}
