//! Include/exclude name matching.
//!
//! Pattern lists mix exact names with regexes. An entry wrapped in `/`
//! delimiters is compiled as a regex; anything else matches by equality.
//! Exclusion always wins over inclusion.

use regex::Regex;

use crate::error::{DumpError, Result};

/// One entry of a pattern list.
#[derive(Debug, Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    /// Parse a raw config entry, treating `/.../`-delimited entries as regexes.
    pub fn parse(raw: &str) -> Result<Self> {
        if let Some(body) = raw
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix('/'))
        {
            let regex = Regex::new(body).map_err(|e| {
                DumpError::Config(format!("Invalid pattern '{}': {}", raw, e))
            })?;
            Ok(Pattern::Regex(regex))
        } else {
            Ok(Pattern::Literal(raw.to_string()))
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Literal(lit) => lit == name,
            Pattern::Regex(re) => re.is_match(name),
        }
    }

    /// The entry as the user wrote it, for error reporting.
    pub fn source(&self) -> String {
        match self {
            Pattern::Literal(lit) => lit.clone(),
            Pattern::Regex(re) => format!("/{}/", re.as_str()),
        }
    }
}

/// Parse a whole pattern list.
pub fn parse_patterns(raw: &[String]) -> Result<Vec<Pattern>> {
    raw.iter().map(|entry| Pattern::parse(entry)).collect()
}

/// Membership evaluation over an include list and an exclude list.
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl NameFilter {
    pub fn new(include: Vec<Pattern>, exclude: Vec<Pattern>) -> Self {
        Self { include, exclude }
    }

    /// Whether `name` survives the filter. An empty include list admits
    /// everything not excluded.
    pub fn admits(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(name))
    }

    /// Include entries that matched none of the enumerated names.
    ///
    /// A non-empty return means the caller asked for objects the catalog
    /// does not have, which is fatal for the dump.
    pub fn unresolved_includes(&self, names: &[String]) -> Vec<String> {
        self.include
            .iter()
            .filter(|p| !names.iter().any(|n| p.matches(n)))
            .map(Pattern::source)
            .collect()
    }
}
