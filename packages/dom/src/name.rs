//! Qualified names for elements and attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A qualified name: an optional prefix plus a local name.
///
/// Namespace *resolution* is out of scope for the core; prefixes are kept
/// verbatim and compared literally.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    /// A name with no prefix.
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    /// A prefixed name.
    pub fn prefixed(prefix: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

impl From<&str> for QName {
    fn from(value: &str) -> Self {
        match value.split_once(':') {
            Some((prefix, local)) => Self::prefixed(prefix, local),
            None => Self::local(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        assert_eq!(QName::local("p").to_string(), "p");
        assert_eq!(QName::prefixed("tei", "note").to_string(), "tei:note");
        assert_eq!(QName::from("tei:note"), QName::prefixed("tei", "note"));
        assert_eq!(QName::from("note"), QName::local("note"));
    }
}
