use std::collections::BTreeMap;

use serde::Serialize;
use url::Url;

use crate::{Error, Result};

/// Variables established by `EXT-X-DEFINE` tags, in one playlist scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableList {
    values: BTreeMap<String, String>,
}

impl VariableList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Define `name`. A name that is already defined keeps its first value.
    pub fn define(&mut self, name: &str, value: &str) -> Result<()> {
        if self.values.contains_key(name) {
            return Err(Error::DuplicateVariable(name.to_string()));
        }
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Copy `name` from the variables of the parent multivariant playlist.
    pub fn import(&mut self, name: &str, parent: Option<&VariableList>) -> Result<()> {
        let value = parent
            .and_then(|p| p.get(name))
            .ok_or_else(|| Error::ImportNotFound(name.to_string()))?;
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Define `name` from the query string of the playlist URL.
    ///
    /// A missing parameter is reported, and the name is still defined as
    /// empty so later references expand to nothing.
    pub fn define_from_query(&mut self, name: &str, playlist_url: &str) -> Result<()> {
        let value = Url::parse(playlist_url).ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.into_owned())
        });

        match value {
            Some(value) => self.define(name, &value),
            None => {
                // The missing parameter is the error reported to the caller.
                if let Err(e) = self.define(name, "") {
                    tracing::debug!("QUERYPARAM fallback for {:?} not defined: {}", name, e);
                }
                Err(Error::QueryParamNotFound {
                    name: name.to_string(),
                    url: playlist_url.to_string(),
                })
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A `{$name}` reference found in a text.
struct Reference<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

fn next_reference(text: &str, from: usize) -> Option<Reference<'_>> {
    let bytes = text.as_bytes();
    let mut pos = from;
    while let Some(offset) = text[pos..].find("{$") {
        let start = pos + offset;
        let name_start = start + 2;
        let mut name_end = name_start;
        while name_end < bytes.len() && is_name_byte(bytes[name_end]) {
            name_end += 1;
        }
        if name_end > name_start && bytes.get(name_end) == Some(&b'}') {
            return Some(Reference {
                start,
                end: name_end + 1,
                name: &text[name_start..name_end],
            });
        }
        pos = start + 2;
    }
    None
}

/// True when `text` contains at least one `{$name}` reference.
pub fn has_variable_references(text: &str) -> bool {
    next_reference(text, 0).is_some()
}

/// Expand every `{$name}` in `value` in a single pass.
///
/// Undefined references are left verbatim; the names of the undefined ones
/// are returned in order of appearance.
pub fn substitute_variables(value: &str, variables: Option<&VariableList>) -> (String, Vec<String>) {
    let mut output = String::with_capacity(value.len());
    let mut missing = Vec::new();
    let mut pos = 0;

    while let Some(reference) = next_reference(value, pos) {
        output.push_str(&value[pos..reference.start]);
        match variables.and_then(|v| v.get(reference.name)) {
            Some(resolved) => output.push_str(resolved),
            None => {
                output.push_str(&value[reference.start..reference.end]);
                missing.push(reference.name.to_string());
            }
        }
        pos = reference.end;
    }
    output.push_str(&value[pos..]);

    (output, missing)
}
