//! Field paths for nested access (e.g. "country" or "contacts[0].type")

use serde::{Serialize, Serializer};
use std::fmt;

/// Segment of a field path
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathSegment {
    /// Field key: .fieldName
    Property(String),
    /// Array item: [0], [1], etc.
    Index(usize),
    /// Any array item, used for schema-level paths: [*]
    ArrayWildcard,
}

/// Path to a field inside a form or its value snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Create a root path (empty)
    pub fn root() -> Self {
        Self { segments: vec![] }
    }

    /// Path of a top-level field
    pub fn key(key: &str) -> Self {
        Self::root().push_property(key)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn push_property(&self, name: &str) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Property(name.to_string()));
        new
    }

    pub fn push_index(&self, idx: usize) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::Index(idx));
        new
    }

    pub fn push_wildcard(&self) -> Self {
        let mut new = self.clone();
        new.segments.push(PathSegment::ArrayWildcard);
        new
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Key of the last property segment, if the path ends in one
    pub fn field_key(&self) -> Option<&str> {
        match self.segments.last() {
            Some(PathSegment::Property(name)) => Some(name),
            _ => None,
        }
    }

    /// Parent path (without the last segment)
    pub fn parent(&self) -> Self {
        let mut new = self.clone();
        new.segments.pop();
        new
    }

    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Replace every concrete index with a wildcard ("items[2].email" -> "items[*].email")
    pub fn to_schema_path(&self) -> Self {
        let segments = self
            .segments
            .iter()
            .map(|seg| match seg {
                PathSegment::Index(_) => PathSegment::ArrayWildcard,
                other => other.clone(),
            })
            .collect();
        Self { segments }
    }

    /// Parse a path string ("user.address[0].city", "items[*].name")
    ///
    /// Parsing is lenient: a bracket holding anything other than a number or
    /// `*` is dropped, so `"a[x].b"` parses as `a.b`. Field keys never contain
    /// `.`, `[` or `]`, so every path to a declared field round-trips.
    pub fn parse(s: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = s.chars();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Property(std::mem::take(&mut current)));
                    }
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(PathSegment::Property(std::mem::take(&mut current)));
                    }
                    let index_str: String = chars.by_ref().take_while(|&c| c != ']').collect();
                    if index_str == "*" {
                        segments.push(PathSegment::ArrayWildcard);
                    } else if let Ok(idx) = index_str.trim().parse::<usize>() {
                        segments.push(PathSegment::Index(idx));
                    }
                }
                _ => current.push(ch),
            }
        }

        if !current.is_empty() {
            segments.push(PathSegment::Property(current));
        }

        Self { segments }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "<root>");
        }
        for (i, seg) in self.segments.iter().enumerate() {
            match seg {
                PathSegment::Property(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Property(name) => write!(f, ".{}", name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
                PathSegment::ArrayWildcard => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl From<&str> for PropertyPath {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
