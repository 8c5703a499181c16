//! Metric identities.
//!
//! An [`Id`] is the name and tag set naming a single metric stream. It renders itself two ways:
//!
//! - the **internal key**, which sorts tags by key and is only ever used for in-process lookups, such as caching meters
//!   in a [`Registry`][crate::Registry], and
//! - the **wire identifier**, which replaces every character outside of `[A-Za-z0-9._~-]` with `_` and is what gets
//!   sent to SpectatorD as part of each line.
//!
//! Both renderings are computed lazily, on first use, and then cached for the lifetime of the `Id`.
use std::{
    collections::HashMap,
    fmt,
    hash::{Hash, Hasher},
};

use once_cell::race::OnceBox;

/// Tags attached to a metric.
pub type Tags = HashMap<String, String>;

const INTERNAL_KEY_DELIMITER: char = '|';

/// A metric identity: a name plus an unordered set of tags.
///
/// Tags are copied on construction, so later changes to the caller's map have no effect on the `Id`.
///
/// The internal key and wire identifier are cached with compute-then-cache semantics: if two threads ask for a key at
/// the same time, both may compute it, but only one result is stored and both callers observe that stored value.
/// Exactly-once execution is not guaranteed, only convergence.
pub struct Id {
    name: String,
    tags: Tags,
    internal_key: OnceBox<String>,
    wire_identifier: OnceBox<String>,
}

impl Id {
    /// Creates a new `Id` from a name and any iterator of tag pairs.
    pub fn new<N, I, K, V>(name: N, tags: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_parts(name.into(), tags.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Creates a new `Id` with no tags.
    pub fn from_name<N>(name: N) -> Self
    where
        N: Into<String>,
    {
        Self::from_parts(name.into(), Tags::new())
    }

    fn from_parts(name: String, tags: Tags) -> Self {
        Self { name, tags, internal_key: OnceBox::new(), wire_identifier: OnceBox::new() }
    }

    /// Name of this metric.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tags of this metric.
    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    /// Returns a new `Id` with the same name and the given tags merged in.
    ///
    /// Tags in `extra` replace existing tags with the same key. `self` is left untouched.
    #[must_use]
    pub fn with_tags<I, K, V>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut tags = self.tags.clone();
        tags.extend(extra.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self::from_parts(self.name.clone(), tags)
    }

    /// Returns a new `Id` with the same name and one additional tag.
    #[must_use]
    pub fn with_tag<K, V>(&self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.with_tags([(key, value)])
    }

    /// The key used to look this identity up in process-local maps.
    ///
    /// Tags are sorted by key, so two `Id`s with the same name and tag set always share an internal key regardless of
    /// the order in which their tags were inserted.
    pub fn internal_key(&self) -> &str {
        self.internal_key.get_or_init(|| Box::new(internal_key(&self.name, &self.tags)))
    }

    /// The sanitized identifier sent to SpectatorD.
    ///
    /// Tag order follows the iteration order of the tag map at the time of the first call, and is stable for the life
    /// of this `Id`.
    pub fn wire_identifier(&self) -> &str {
        self.wire_identifier.get_or_init(|| Box::new(wire_identifier(&self.name, &self.tags)))
    }
}

impl Clone for Id {
    fn clone(&self) -> Self {
        let cloned = Self::from_parts(self.name.clone(), self.tags.clone());

        // Carry over anything already cached so a clone renders identically to its source.
        if let Some(key) = self.internal_key.get() {
            let _ = cloned.internal_key.set(Box::new(key.clone()));
        }
        if let Some(identifier) = self.wire_identifier.get() {
            let _ = cloned.wire_identifier.set(Box::new(identifier.clone()));
        }

        cloned
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.tags == other.tags
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.internal_key().hash(state);
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Id").field("name", &self.name).field("tags", &self.tags).finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_identifier())
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Id::from_name(name)
    }
}

impl From<String> for Id {
    fn from(name: String) -> Self {
        Id::from_name(name)
    }
}

/// Builds the internal key for the given name and tags.
///
/// The result is `name` followed by `|key|value` for every tag, in ascending key order.
pub fn internal_key(name: &str, tags: &Tags) -> String {
    let mut sorted: Vec<(&String, &String)> = tags.iter().collect();
    sorted.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let len = sorted.iter().fold(name.len(), |acc, (k, v)| acc + k.len() + v.len() + 2);
    let mut key = String::with_capacity(len);
    key.push_str(name);
    for (k, v) in sorted {
        key.push(INTERNAL_KEY_DELIMITER);
        key.push_str(k);
        key.push(INTERNAL_KEY_DELIMITER);
        key.push_str(v);
    }

    key
}

/// Builds the wire identifier for the given name and tags.
///
/// Every character outside of `[A-Za-z0-9._~-]` in the name, tag keys, and tag values is replaced with `_`. This
/// includes `,`, `=`, and `:`, so the result never contains a delimiter of the line protocol except where it was
/// placed deliberately.
pub fn wire_identifier(name: &str, tags: &Tags) -> String {
    let len = tags.iter().fold(name.len(), |acc, (k, v)| acc + k.len() + v.len() + 2);
    let mut identifier = String::with_capacity(len);
    push_sanitized(&mut identifier, name);
    for (k, v) in tags {
        identifier.push(',');
        push_sanitized(&mut identifier, k);
        identifier.push('=');
        push_sanitized(&mut identifier, v);
    }

    identifier
}

fn is_valid_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~')
}

fn push_sanitized(buf: &mut String, input: &str) {
    buf.extend(input.chars().map(|c| if is_valid_char(c) { c } else { '_' }));
}
