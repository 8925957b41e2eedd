//! Culture (locale tag) used for template lookup

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a culture tag cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid culture tag: {0:?}")]
pub struct InvalidCulture(pub String);

/// A BCP-47-like locale tag such as `fr-FR` or `en`.
///
/// The empty tag is the invariant culture. Tags are stored with `-` as the
/// subtag separator; `_` is accepted on input and normalised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Culture(String);

impl Culture {
    /// Parse a culture tag
    pub fn parse(tag: &str) -> Result<Self, InvalidCulture> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Ok(Self::invariant());
        }

        let valid = tag
            .split(['-', '_'])
            .all(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()));
        if !valid {
            return Err(InvalidCulture(tag.to_string()));
        }

        Ok(Self(tag.replace('_', "-")))
    }

    /// The invariant (culture-neutral) culture
    pub fn invariant() -> Self {
        Self(String::new())
    }

    pub fn is_invariant(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The next less specific culture: `fr-FR` -> `fr` -> invariant.
    ///
    /// Returns `None` for the invariant culture.
    pub fn parent(&self) -> Option<Self> {
        if self.is_invariant() {
            return None;
        }

        match self.0.rfind('-') {
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => Some(Self::invariant()),
        }
    }

    /// This culture followed by all of its parents, ending with the invariant culture
    pub fn lineage(&self) -> impl Iterator<Item = Culture> {
        std::iter::successors(Some(self.clone()), Culture::parent)
    }

    /// Compare two cultures ignoring ASCII case (`fr-fr` matches `fr-FR`)
    pub fn matches(&self, other: &Culture) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl std::fmt::Display for Culture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_invariant() {
            f.write_str("(invariant)")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl std::str::FromStr for Culture {
    type Err = InvalidCulture;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Culture {
    type Error = InvalidCulture;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Culture> for String {
    fn from(culture: Culture) -> Self {
        culture.0
    }
}
