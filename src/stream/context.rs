use url::Url;

use crate::{
    Error, Result,
    hls::{
        AttrList, LevelKey, VariableList,
        variables::{has_variable_references, substitute_variables},
    },
};

/// Per-parse context shared by the builders: the playlist URL, the variable
/// scope and the error slot.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// URL the playlist was loaded from, as given by the caller.
    pub base_url: String,

    /// Parsed form of `base_url`, when it is absolute.
    base: Option<Url>,

    /// Variables defined so far. `None` until the first definition.
    pub variables: Option<VariableList>,

    /// Whether the playlist text contains any `{$name}` reference.
    pub has_variable_refs: bool,

    error: Option<Error>,
}

impl ParseContext {
    pub fn new(base_url: &str, text: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            base: Url::parse(base_url).ok(),
            variables: None,
            has_variable_refs: has_variable_references(text),
            error: None,
        }
    }

    /// Resolve a relative URL against the playlist URL.
    pub fn resolve_url(&self, relative: &str) -> Result<Url> {
        match &self.base {
            Some(base) => base.join(relative).map_err(Into::into),
            None => Url::parse(relative).map_err(Into::into),
        }
    }

    /// Resolve `relative`, falling back to the text itself when it cannot be
    /// made absolute.
    pub fn resolve(&self, relative: &str) -> String {
        match self.resolve_url(relative) {
            Ok(url) => url.to_string(),
            Err(e) => {
                tracing::debug!("Keeping unresolved URL {:?}: {}", relative, e);
                relative.to_string()
            }
        }
    }

    /// Record a violation. Only the first one is kept.
    pub fn report(&mut self, error: Error) {
        if self.error.is_none() {
            tracing::debug!("Playlist parsing error: {}", error);
            self.error = Some(error);
        } else {
            tracing::debug!("Additional playlist parsing error: {}", error);
        }
    }

    /// Replace whatever was recorded; used when a later finding supersedes
    /// the first.
    pub fn replace_error(&mut self, error: Error) {
        self.error = Some(error);
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Expand `{$name}` references, reporting the first undefined one.
    pub fn substitute(&mut self, value: &str) -> String {
        if self.variables.is_none() && !self.has_variable_refs {
            return value.to_string();
        }
        let (expanded, missing) = substitute_variables(value, self.variables.as_ref());
        for name in missing {
            self.report(Error::MissingVariable(name));
        }
        expanded
    }

    /// Decode an attribute list with variable substitution.
    pub fn attrs(&mut self, input: &str) -> AttrList {
        AttrList::parse_with(input, |value| self.substitute(value))
    }

    /// Apply an `EXT-X-DEFINE` tag. `parent` holds the variables of the
    /// multivariant playlist for `IMPORT`.
    pub fn define(&mut self, attrs: &AttrList, parent: Option<&VariableList>) {
        if let Some(name) = attrs.get("IMPORT")
            && parent.is_none_or(|p| !p.contains(name))
        {
            self.report(Error::ImportNotFound(name.to_string()));
            return;
        }

        let name = attrs.get("NAME").filter(|name| !name.is_empty());
        if name.is_none() && !attrs.contains("IMPORT") && !attrs.contains("QUERYPARAM") {
            tracing::warn!("Ignoring EXT-X-DEFINE without a variable name");
            return;
        }

        let variables = self.variables.get_or_insert_with(VariableList::new);
        let result = if let Some(name) = attrs.get("IMPORT") {
            variables.import(name, parent)
        } else if let Some(name) = attrs.get("QUERYPARAM") {
            variables.define_from_query(name, &self.base_url)
        } else {
            variables.define(name.unwrap_or_default(), attrs.get("VALUE").unwrap_or_default())
        };
        if let Err(e) = result {
            self.report(e);
        }
    }

    /// Decode an `EXT-X-KEY` / `EXT-X-SESSION-KEY` attribute string.
    pub fn parse_key(&mut self, input: &str) -> LevelKey {
        let attrs = self.attrs(input);
        LevelKey::from_attrs(&attrs, |uri| self.resolve(uri))
    }
}
