//! Keypaths locate a value inside a nested configuration structure

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step into a nested structure
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    /// Mapping key
    Key(String),
    /// Sequence index
    Index(usize),
}

/// Path from the root of a structure to one of its values
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keypath(Vec<KeySegment>);

impl Keypath {
    /// The empty path (the structure itself)
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a keypath from mapping keys
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(|k| KeySegment::Key(k.into())).collect())
    }

    /// A new path one mapping key deeper
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(KeySegment::Key(key.into()));
        Self(segments)
    }

    /// A new path one sequence index deeper
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(KeySegment::Index(index));
        Self(segments)
    }

    /// This path re-rooted below `prefix`
    pub fn prefixed(&self, prefix: &Keypath) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Keypath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                KeySegment::Key(key) if i == 0 => write!(f, "{}", key)?,
                KeySegment::Key(key) => write!(f, ".{}", key)?,
                KeySegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypath_display() {
        let path = Keypath::root().key("models").key("pre-hook").index(2);
        assert_eq!(path.to_string(), "models.pre-hook[2]");
        assert_eq!(Keypath::root().to_string(), "<root>");
    }

    #[test]
    fn test_keypath_from_keys() {
        let path = Keypath::from_keys(["outputs", "dev", "host"]);
        assert_eq!(path.to_string(), "outputs.dev.host");
        assert_eq!(path.segments().len(), 3);
        assert!(!path.is_root());
    }

    #[test]
    fn test_keypath_prefixed() {
        let path = Keypath::root().key("credentials").key("port");
        let rooted = path.prefixed(&Keypath::from_keys(["profile"]));
        assert_eq!(rooted.to_string(), "profile.credentials.port");
        assert_eq!(Keypath::root().prefixed(&Keypath::from_keys(["project"])).to_string(), "project");
    }
}
