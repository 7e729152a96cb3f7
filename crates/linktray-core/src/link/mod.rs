// ── Connection link parsing ──
//
// A connection is configured by a single share link. The registry never
// interprets links itself: it asks a `LinkParser` for a flat, ordered map
// of display fields and keeps the raw link for the transport.

mod schema;
mod share;

use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

pub use schema::{EXCLUDED_KEYS, GeneralConfig};
pub use share::ShareLinkParser;

/// Turns a link string into its field map.
pub trait LinkParser: Send + Sync {
    fn parse(&self, link: &str) -> Result<LinkConfig, LinkError>;
}

/// Why a link could not be parsed.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid protocol type: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("invalid port: {value}")]
    InvalidPort { value: String },

    #[error("cannot decode link payload: {reason}")]
    Decode { reason: String },

    #[error(transparent)]
    Malformed(#[from] url::ParseError),
}

/// Link schemes understood by [`ShareLinkParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    Vless,
    Vmess,
    Trojan,
    #[strum(serialize = "ss", serialize = "shadowsocks", to_string = "shadowsocks")]
    Shadowsocks,
}

/// Parsed configuration fields of one connection, in display order.
///
/// Keys are capitalized. Base fields are always present (possibly empty),
/// protocol-specific extras follow them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkConfig(IndexMap<String, String>);

impl LinkConfig {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn protocol(&self) -> Option<&str> {
        self.get("Protocol")
    }

    pub fn address(&self) -> Option<&str> {
        self.get("Address")
    }

    pub fn port(&self) -> Option<u16> {
        self.get("Port").and_then(|p| p.parse().ok())
    }

    pub fn remark(&self) -> Option<&str> {
        self.get("Remark").filter(|r| !r.is_empty())
    }

    /// Fields with a non-empty value only.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, v)| !v.is_empty())
    }
}

impl From<IndexMap<String, String>> for LinkConfig {
    fn from(fields: IndexMap<String, String>) -> Self {
        Self(fields)
    }
}

impl<'a> IntoIterator for &'a LinkConfig {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn protocol_parses_scheme_names() {
        assert_eq!(Protocol::from_str("vless").ok(), Some(Protocol::Vless));
        assert_eq!(Protocol::from_str("VMESS").ok(), Some(Protocol::Vmess));
        assert_eq!(Protocol::from_str("ss").ok(), Some(Protocol::Shadowsocks));
        assert!(Protocol::from_str("wireguard").is_err());
        assert_eq!(Protocol::Shadowsocks.to_string(), "shadowsocks");
    }

    #[test]
    fn helpers_read_well_known_fields() {
        let mut fields = IndexMap::new();
        fields.insert("Protocol".to_owned(), "vless".to_owned());
        fields.insert("Port".to_owned(), "8443".to_owned());
        fields.insert("Remark".to_owned(), String::new());
        let config = LinkConfig::from(fields);

        assert_eq!(config.protocol(), Some("vless"));
        assert_eq!(config.port(), Some(8443));
        assert_eq!(config.remark(), None);
        assert_eq!(config.non_empty().count(), 2);
    }
}
