use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::{Error, Result};

/// Attributes whose unquoted value is a hexadecimal sequence.
const HEX_SEQUENCE_ATTRS: &[&str] = &["IV", "SCTE35-CMD", "SCTE35-IN", "SCTE35-OUT"];

/// Attributes that must always be written as quoted strings.
const QUOTED_ATTRS: &[&str] = &[
    "ALLOWED-CPC",
    "CLASS",
    "ASSOC-LANGUAGE",
    "AUDIO",
    "BYTERANGE",
    "CHANNELS",
    "CHARACTERISTICS",
    "CLOSED-CAPTIONS",
    "CODECS",
    "DATA-ID",
    "END-DATE",
    "GROUP-ID",
    "ID",
    "IMPORT",
    "INSTREAM-ID",
    "KEYFORMAT",
    "KEYFORMATVERSIONS",
    "LANGUAGE",
    "NAME",
    "PATHWAY-ID",
    "QUERYPARAM",
    "RECENTLY-REMOVED-DATERANGES",
    "SERVER-URI",
    "STABLE-RENDITION-ID",
    "STABLE-VARIANT-ID",
    "START-DATE",
    "SUBTITLES",
    "SUPPLEMENTAL-CODECS",
    "URI",
    "VALUE",
    "VIDEO",
    "X-ASSET-LIST",
    "X-ASSET-URI",
];

/// Width and height decoded from a `WxH` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Ordered `NAME=VALUE` mapping decoded from a tag's attribute string.
///
/// Values are stored raw (quotes removed). Typed accessors interpret them on
/// demand and return `None` for absent or malformed values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrList {
    entries: Vec<(String, String)>,
}

impl AttrList {
    /// Decode an attribute string without variable substitution.
    pub fn parse(input: &str) -> Self {
        Self::parse_with(input, |value| value.to_string())
    }

    /// Decode an attribute string, passing every quoted-string and
    /// hexadecimal-sequence value through `substitute`.
    pub fn parse_with(input: &str, mut substitute: impl FnMut(&str) -> String) -> Self {
        let mut attrs = Self::default();

        for (name, raw) in split_attributes(input) {
            let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');
            let value = if quoted {
                substitute(&raw[1..raw.len() - 1])
            } else if HEX_SEQUENCE_ATTRS.contains(&name) {
                substitute(raw)
            } else {
                if QUOTED_ATTRS.contains(&name) && !(name == "CLOSED-CAPTIONS" && raw == "NONE") {
                    tracing::warn!("{}: attribute {} is missing quotes", input, name);
                }
                raw.to_string()
            };
            attrs.insert(name, value);
        }

        attrs
    }

    /// Insert or replace a value, keeping the position of an existing name.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of client-defined (`X-` prefixed) attributes.
    pub fn client_attrs(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|n| n.starts_with("X-"))
            .collect()
    }

    pub fn decimal_integer(&self, name: &str) -> Option<u64> {
        let value = self.get(name)?.trim();
        let digits = value
            .find(|c: char| !c.is_ascii_digit())
            .map_or(value, |end| &value[..end]);
        digits.parse().ok()
    }

    /// Bytes of a `0x`-prefixed hexadecimal value, left-padded to an even
    /// number of digits.
    pub fn hexadecimal_integer(&self, name: &str) -> Option<Vec<u8>> {
        let value = self.get(name).filter(|v| !v.is_empty())?;
        match decode_hex(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("{} is not a hexadecimal sequence: {}", name, e);
                None
            }
        }
    }

    pub fn decimal_floating_point(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(leading_float)
    }

    /// Like [`decimal_floating_point`](Self::decimal_floating_point), with a
    /// fallback when the attribute is absent or empty.
    pub fn optional_float(&self, name: &str, default: f64) -> f64 {
        match self.get(name) {
            Some(value) if !value.is_empty() => leading_float(value).unwrap_or(default),
            _ => default,
        }
    }

    pub fn enumerated_string(&self, name: &str) -> Option<&str> {
        self.get(name)
    }

    /// Lower-cased identifiers from a space or comma separated list.
    pub fn enumerated_string_list(&self, name: &str) -> Vec<String> {
        self.get(name)
            .map(|value| {
                value
                    .split([' ', ','])
                    .filter(|s| !s.is_empty())
                    .map(str::to_lowercase)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn bool(&self, name: &str) -> bool {
        self.get(name) == Some("YES")
    }

    pub fn decimal_resolution(&self, name: &str) -> Option<Resolution> {
        let (width, height) = self.get(name)?.split_once('x')?;
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(width) || !all_digits(height) {
            return None;
        }
        Some(Resolution {
            width: width.parse().ok()?,
            height: height.parse().ok()?,
        })
    }
}

impl Serialize for AttrList {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Split `input` into `(name, raw value)` pairs on top-level commas.
fn split_attributes(input: &str) -> Vec<(&str, &str)> {
    let mut attrs = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            break;
        };
        let name = rest[..eq].trim();
        let after = &rest[eq + 1..];

        let value_end = if after.starts_with('"') {
            match after[1..].find('"') {
                Some(close) if matches!(after.as_bytes().get(close + 2), None | Some(b',')) => {
                    close + 2
                }
                _ => after.find(',').unwrap_or(after.len()),
            }
        } else {
            after.find(',').unwrap_or(after.len())
        };

        if !name.is_empty() {
            attrs.push((name, &after[..value_end]));
        }
        rest = after.get(value_end + 1..).unwrap_or("");
    }

    attrs
}

/// Decode a hexadecimal sequence with an optional `0x` prefix.
pub(crate) fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    if digits.len() % 2 == 1 {
        Ok(hex::decode(format!("0{}", digits))?)
    } else if digits.is_empty() {
        Err(Error::InvalidHex(value.to_string()))
    } else {
        Ok(hex::decode(digits)?)
    }
}

/// Parse the longest leading decimal number of `s`, ignoring leading
/// whitespace and any trailing garbage.
pub(crate) fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start || digits > 0 {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().ok()
}
