//! The shared field schema every protocol maps onto.
//!
//! Each parser fills a [`GeneralConfig`] explicitly and hands over whatever
//! protocol-specific parameters are left as `extras`. [`GeneralConfig::into_fields`]
//! then produces the final ordered map.

use indexmap::IndexMap;

use super::LinkConfig;

/// Protocol keys that duplicate a base field under another name, or carry
/// data that should not be shown. Compared case-sensitively against the raw
/// key, before capitalization.
pub const EXCLUDED_KEYS: &[&str] = &[
    "add",
    "ps",
    "sni",
    "fp",
    "id",
    "net",
    "scy",
    "headerType",
    "OrigLink",
];

/// Common connection fields, independent of the link scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneralConfig {
    pub protocol: String,
    pub address: String,
    pub security: String,
    pub aid: String,
    pub host: String,
    pub id: String,
    pub network: String,
    pub path: String,
    pub port: String,
    pub remark: String,
    pub tls: String,
    pub sni: String,
    pub alpn: String,
    pub tls_fingerprint: String,
    pub authority: String,
    pub service_name: String,
    pub mode: String,
    pub kind: String,
    /// The link this config was parsed from. Never emitted as a field.
    pub orig_link: String,
}

impl GeneralConfig {
    /// Base fields in display order.
    fn base_fields(self) -> [(&'static str, String); 18] {
        [
            ("Protocol", self.protocol),
            ("Address", self.address),
            ("Security", self.security),
            ("Aid", self.aid),
            ("Host", self.host),
            ("ID", self.id),
            ("Network", self.network),
            ("Path", self.path),
            ("Port", self.port),
            ("Remark", self.remark),
            ("TLS", self.tls),
            ("SNI", self.sni),
            ("ALPN", self.alpn),
            ("TlsFingerprint", self.tls_fingerprint),
            ("Authority", self.authority),
            ("ServiceName", self.service_name),
            ("Mode", self.mode),
            ("Type", self.kind),
        ]
    }

    /// Merge the base schema with protocol-specific `extras`.
    ///
    /// Excluded keys are dropped, the rest are capitalized, and an extra
    /// never overrides a base field (matched ignoring ASCII case).
    pub fn into_fields<I, K, V>(self, extras: I) -> LinkConfig
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut fields: IndexMap<String, String> = self
            .base_fields()
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();

        for (key, value) in extras {
            let key = key.as_ref();
            if key.is_empty() || EXCLUDED_KEYS.contains(&key) {
                continue;
            }
            let key = capitalize(key);
            if fields.keys().any(|k| k.eq_ignore_ascii_case(&key)) {
                continue;
            }
            fields.insert(key, value.into());
        }

        LinkConfig::from(fields)
    }
}

fn capitalize(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn base_fields_are_always_present_in_order() {
        let fields = GeneralConfig {
            protocol: "vless".into(),
            orig_link: "vless://x".into(),
            ..GeneralConfig::default()
        }
        .into_fields(Vec::<(String, String)>::new());

        let keys: Vec<&str> = fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 18);
        assert_eq!(keys[0], "Protocol");
        assert_eq!(keys[17], "Type");
        assert_eq!(fields.get("OrigLink"), None);
        assert_eq!(fields.get("Address"), Some(""));
    }

    #[test]
    fn extras_are_capitalized_and_excluded_keys_dropped() {
        let fields = GeneralConfig::default().into_fields([
            ("flow", "xtls-rprx-vision"),
            ("pbk", "abc"),
            ("sni", "example.com"),
            ("ps", "remark"),
            ("OrigLink", "vless://x"),
        ]);

        assert_eq!(fields.get("Flow"), Some("xtls-rprx-vision"));
        assert_eq!(fields.get("Pbk"), Some("abc"));
        assert_eq!(fields.get("Ps"), None);
        assert_eq!(fields.len(), 20);
    }

    #[test]
    fn extras_never_override_base_fields() {
        let fields = GeneralConfig {
            security: "reality".into(),
            ..GeneralConfig::default()
        }
        .into_fields([("security", "none"), ("type", "tcp"), ("alpn", "h2")]);

        assert_eq!(fields.get("Security"), Some("reality"));
        assert_eq!(fields.get("Type"), Some(""));
        assert_eq!(fields.get("ALPN"), Some(""));
        assert_eq!(fields.len(), 18);
    }

    #[test]
    fn capitalize_handles_unicode_and_empty() {
        assert_eq!(capitalize("serviceName"), "ServiceName");
        assert_eq!(capitalize("ä"), "Ä");
        assert_eq!(capitalize(""), "");
    }
}
