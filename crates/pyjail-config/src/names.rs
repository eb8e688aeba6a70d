//! Name lists used by the script denylist.
//!
//! Operators write lists either as TOML arrays or, in environment variables
//! and CLI flags, as comma-separated strings. Both forms deserialise into the
//! same [`NameList`], so a configured list always replaces the default rather
//! than extending it.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered, de-duplicated set of identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameList(BTreeSet<String>);

impl NameList {
    /// Builds a list from borrowed names.
    #[must_use]
    pub fn from_static(names: &[&str]) -> Self {
        names.iter().copied().map(str::to_owned).collect()
    }

    /// Returns whether `name` is listed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Iterates over the names in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of listed names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for NameList {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|name| name.trim().to_owned())
                .filter(|name| !name.is_empty())
                .collect(),
        )
    }
}

impl FromStr for NameList {
    type Err = Infallible;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(input.split(',').map(str::to_owned).collect())
    }
}

impl fmt::Display for NameList {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self.iter().collect::<Vec<_>>().join(",");
        formatter.write_str(&joined)
    }
}

impl Serialize for NameList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNameList {
    Joined(String),
    Items(Vec<String>),
}

impl<'de> Deserialize<'de> for NameList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawNameList::deserialize(deserializer)? {
            RawNameList::Joined(joined) => joined.split(',').map(str::to_owned).collect(),
            RawNameList::Items(items) => items.into_iter().collect(),
        })
    }
}
