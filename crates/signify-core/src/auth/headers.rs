//! HTTP header sets and the structured `Signature-Input` / `Signature`
//! header values.

use std::fmt;

use crate::error::{Result, SignifyError};

pub const HEADER_RESOURCE: &str = "signify-resource";
pub const HEADER_SIG_TIME: &str = "signify-timestamp";
pub const HEADER_SIG_INPUT: &str = "signature-input";
pub const HEADER_SIG: &str = "signature";
pub const HEADER_CONTENT_TYPE: &str = "content-type";

const SIGNED_HEADERS: [&str; 4] = [HEADER_RESOURCE, HEADER_SIG_TIME, HEADER_SIG_INPUT, HEADER_SIG];

/// Case-insensitive, insertion-ordered header set.
///
/// Names are stored lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name`, replacing any existing values.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, value.into()));
    }

    /// Add a value without removing existing ones.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_ascii_lowercase(), value.into()));
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(n, _)| *n != name);
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

    /// Append the entries of `other`.
    ///
    /// The resource, timestamp and signature headers are never taken from
    /// `other`; they belong to the signature already on this set.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            if SIGNED_HEADERS.contains(&name) {
                continue;
            }
            self.append(name, value);
        }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.append(k.as_ref(), v);
        }
        headers
    }
}

/// One labelled entry of a `Signature-Input` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInput {
    pub name: String,
    pub fields: Vec<String>,
    pub created: i64,
    pub keyid: String,
    pub alg: String,
}

impl SignatureInput {
    /// The covered-fields and parameters string used in the signing base.
    pub fn params(&self) -> String {
        format!(
            "({});created={};keyid={};alg={}",
            self.fields.join(" "),
            self.created,
            self.keyid,
            self.alg
        )
    }

    /// Parse a `Signature-Input` header value into its entries.
    pub fn parse_header(value: &str) -> Result<Vec<Self>> {
        split_top_level(value, ',')
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| Self::parse_entry(s.trim()))
            .collect()
    }

    fn parse_entry(entry: &str) -> Result<Self> {
        let bad = |why: &str| SignifyError::Authentication(format!("{why} in signature input {entry:?}"));
        let (name, rest) = entry.split_once('=').ok_or_else(|| bad("missing label"))?;
        let rest = rest.trim();
        let inner_end = rest.find(')').ok_or_else(|| bad("unterminated field list"))?;
        let list = rest
            .strip_prefix('(')
            .and_then(|r| r.get(..inner_end - 1))
            .ok_or_else(|| bad("missing field list"))?;
        let fields = list
            .split_whitespace()
            .map(|f| unquote(f).to_owned())
            .collect();

        let mut input = Self {
            name: name.trim().to_owned(),
            fields,
            created: 0,
            keyid: String::new(),
            alg: String::new(),
        };
        let mut created = None;
        for param in rest[inner_end + 1..].split(';').filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=').ok_or_else(|| bad("malformed parameter"))?;
            let value = unquote(value.trim());
            match key.trim() {
                "created" => {
                    created = Some(value.parse::<i64>().map_err(|_| bad("non-numeric created"))?)
                }
                "keyid" => input.keyid = value.to_owned(),
                "alg" => input.alg = value.to_owned(),
                _ => {}
            }
        }
        input.created = created.ok_or_else(|| bad("missing created"))?;
        Ok(input)
    }
}

impl fmt::Display for SignatureInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.fields.iter().map(|f| format!("\"{f}\"")).collect();
        write!(
            f,
            "{}=({});created={};keyid=\"{}\";alg=\"{}\"",
            self.name,
            fields.join(" "),
            self.created,
            self.keyid,
            self.alg
        )
    }
}

/// A parsed `Signature` header: `indexed="?0";signify="0B..."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub indexed: bool,
    pub markers: Vec<(String, String)>,
}

impl SignatureHeader {
    pub fn new(indexed: bool) -> Self {
        Self {
            indexed,
            markers: Vec::new(),
        }
    }

    pub fn with_marker(mut self, name: impl Into<String>, signature: impl Into<String>) -> Self {
        self.markers.push((name.into(), signature.into()));
        self
    }

    pub fn marker(&self, name: &str) -> Option<&str> {
        self.markers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_str())
    }

    pub fn parse(value: &str) -> Result<Self> {
        let mut header = Self::new(false);
        for item in value.split(';').map(str::trim).filter(|i| !i.is_empty()) {
            let (key, val) = item.split_once('=').ok_or_else(|| {
                SignifyError::Authentication(format!("malformed signature item {item:?}"))
            })?;
            let val = unquote(val.trim());
            match key.trim() {
                "indexed" => header.indexed = val == "?1",
                name => header.markers.push((name.to_owned(), val.to_owned())),
            }
        }
        Ok(header)
    }
}

impl fmt::Display for SignatureHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.indexed { "?1" } else { "?0" };
        write!(f, "indexed=\"{flag}\"")?;
        for (name, sig) in &self.markers {
            write!(f, ";{name}=\"{sig}\"")?;
        }
        Ok(())
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

/// Split on `sep` outside of parentheses and quotes.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 && !quoted => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
