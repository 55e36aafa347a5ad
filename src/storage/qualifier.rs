//! Multi-part column qualifiers and the name-substitution hook.

use std::borrow::Cow;
use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::{PushdownError, Result};

/// Reserved byte joining the parts of a qualifier.
pub const VALUE_SEPARATOR: u8 = 0x1F;

/// Bijective string mapping applied to names stored in qualifiers.
///
/// Writers `deflate` property names, keys, metadata keys and labels to save
/// space; the resolution path `inflate`s them back. Visibilities are stored
/// raw. Implementations must guarantee `inflate(deflate(s)) == s` for every
/// `s`.
pub trait NameSubstitution: Send + Sync {
    /// Maps a stored name back to its full form.
    fn inflate<'a>(&self, stored: &'a str) -> Cow<'a, str>;

    /// Maps a full name to its stored form.
    fn deflate<'a>(&self, name: &'a str) -> Cow<'a, str>;
}

/// Substitution that stores names verbatim.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityNameSubstitution;

impl NameSubstitution for IdentityNameSubstitution {
    fn inflate<'a>(&self, stored: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(stored)
    }

    fn deflate<'a>(&self, name: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(name)
    }
}

/// Table-driven substitution built from `(stored, full)` pairs.
///
/// Names missing from the table pass through unchanged, except those that
/// collide with a stored form or start with [`MapNameSubstitution::ESCAPE`];
/// those are written with one leading escape character.
#[derive(Clone, Default)]
pub struct MapNameSubstitution {
    inflate: FxHashMap<String, String>,
    deflate: FxHashMap<String, String>,
}

impl MapNameSubstitution {
    /// Prefix marking a stored name that must not be looked up in the table.
    pub const ESCAPE: char = '\u{1E}';

    /// Builds the table, rejecting pairs that would break the bijection.
    ///
    /// Stored forms may not be empty or start with [`Self::ESCAPE`].
    pub fn from_pairs<I, A, B>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        let mut table = Self::default();
        for (stored, full) in pairs {
            let (stored, full): (String, String) = (stored.into(), full.into());
            if stored.is_empty() || stored.starts_with(Self::ESCAPE) {
                return Err(PushdownError::Invalid(
                    "stored names must be non-empty and unescaped",
                ));
            }
            if table.inflate.contains_key(&stored) || table.deflate.contains_key(&full) {
                return Err(PushdownError::Invalid(
                    "name substitution pairs must be one-to-one",
                ));
            }
            table.inflate.insert(stored.clone(), full.clone());
            table.deflate.insert(full, stored);
        }
        Ok(table)
    }

    /// Number of substitution pairs.
    pub fn len(&self) -> usize {
        self.inflate.len()
    }

    /// Returns `true` when no pairs are registered.
    pub fn is_empty(&self) -> bool {
        self.inflate.is_empty()
    }
}

impl fmt::Debug for MapNameSubstitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapNameSubstitution")
            .field("pairs", &self.inflate.len())
            .finish()
    }
}

impl NameSubstitution for MapNameSubstitution {
    fn inflate<'a>(&self, stored: &'a str) -> Cow<'a, str> {
        if let Some(raw) = stored.strip_prefix(Self::ESCAPE) {
            return Cow::Borrowed(raw);
        }
        match self.inflate.get(stored) {
            Some(full) => Cow::Owned(full.clone()),
            None => Cow::Borrowed(stored),
        }
    }

    fn deflate<'a>(&self, name: &'a str) -> Cow<'a, str> {
        if let Some(stored) = self.deflate.get(name) {
            return Cow::Owned(stored.clone());
        }
        if name.starts_with(Self::ESCAPE) || self.inflate.contains_key(name) {
            let mut escaped = String::with_capacity(name.len() + Self::ESCAPE.len_utf8());
            escaped.push(Self::ESCAPE);
            escaped.push_str(name);
            return Cow::Owned(escaped);
        }
        Cow::Borrowed(name)
    }
}

/// Splits `qualifier` into exactly `N` separator-delimited UTF-8 parts.
pub fn split_parts<'a, const N: usize>(
    qualifier: &'a [u8],
    context: &'static str,
) -> Result<[&'a str; N]> {
    let found = qualifier
        .iter()
        .filter(|b| **b == VALUE_SEPARATOR)
        .count()
        + 1;
    if found != N {
        return Err(PushdownError::Configuration {
            context,
            expected: N,
            found,
        });
    }
    let mut parts = [""; N];
    for (slot, raw) in parts
        .iter_mut()
        .zip(qualifier.split(|b| *b == VALUE_SEPARATOR))
    {
        *slot = std::str::from_utf8(raw)
            .map_err(|err| PushdownError::format(context, "UTF-8 qualifier", err))?;
    }
    Ok(parts)
}

/// Joins parts with [`VALUE_SEPARATOR`].
pub fn join_parts(parts: &[&str]) -> Vec<u8> {
    let len = parts.iter().map(|p| p.len() + 1).sum::<usize>();
    let mut out = Vec::with_capacity(len);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(VALUE_SEPARATOR);
        }
        out.extend_from_slice(part.as_bytes());
    }
    out
}

/// Identity shared by a property's value, metadata, soft-delete and hidden
/// columns.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PropertySlot {
    /// Property key (distinguishes multi-valued properties).
    pub key: String,
    /// Property name.
    pub name: String,
    /// Visibility expression of the property value.
    pub visibility: String,
}

impl PropertySlot {
    /// Creates a slot from its three parts.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        visibility: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            visibility: visibility.into(),
        }
    }

    /// Parses a `name␟key` qualifier; visibility comes from the column.
    pub fn from_value_qualifier(
        qualifier: &[u8],
        visibility: &str,
        names: &dyn NameSubstitution,
    ) -> Result<Self> {
        let [name, key] = split_parts::<2>(qualifier, "property")?;
        Ok(Self {
            key: names.inflate(key).into_owned(),
            name: names.inflate(name).into_owned(),
            visibility: visibility.to_owned(),
        })
    }

    /// Parses a `name␟key␟visibility` qualifier of a hidden marker.
    pub fn from_hidden_qualifier(qualifier: &[u8], names: &dyn NameSubstitution) -> Result<Self> {
        let [name, key, visibility] = split_parts::<3>(qualifier, "property hidden")?;
        Ok(Self {
            key: names.inflate(key).into_owned(),
            name: names.inflate(name).into_owned(),
            visibility: visibility.to_owned(),
        })
    }

    /// Parses a `name␟key␟visibility␟metadataKey` qualifier.
    pub fn from_metadata_qualifier(
        qualifier: &[u8],
        names: &dyn NameSubstitution,
    ) -> Result<(Self, String)> {
        let [name, key, visibility, metadata_key] =
            split_parts::<4>(qualifier, "property metadata")?;
        let slot = Self {
            key: names.inflate(key).into_owned(),
            name: names.inflate(name).into_owned(),
            visibility: visibility.to_owned(),
        };
        Ok((slot, names.inflate(metadata_key).into_owned()))
    }

    /// Qualifier for value and soft-delete columns.
    pub fn value_qualifier(&self, names: &dyn NameSubstitution) -> Vec<u8> {
        let name = names.deflate(&self.name);
        let key = names.deflate(&self.key);
        join_parts(&[name.as_ref(), key.as_ref()])
    }

    /// Qualifier for hidden-marker columns.
    pub fn hidden_qualifier(&self, names: &dyn NameSubstitution) -> Vec<u8> {
        let name = names.deflate(&self.name);
        let key = names.deflate(&self.key);
        join_parts(&[name.as_ref(), key.as_ref(), self.visibility.as_str()])
    }

    /// Qualifier for a metadata column carrying `metadata_key`.
    pub fn metadata_qualifier(&self, metadata_key: &str, names: &dyn NameSubstitution) -> Vec<u8> {
        let name = names.deflate(&self.name);
        let key = names.deflate(&self.key);
        let metadata_key = names.deflate(metadata_key);
        join_parts(&[
            name.as_ref(),
            key.as_ref(),
            self.visibility.as_str(),
            metadata_key.as_ref(),
        ])
    }
}
