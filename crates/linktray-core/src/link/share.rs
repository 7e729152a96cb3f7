// ── Share-link parser ──
//
// Understands the common "share link" forms produced by proxy panels:
//
//   vless://<uuid>@<host>:<port>?<params>#<remark>
//   trojan://<password>@<host>:<port>?<params>#<remark>
//   vmess://<base64 JSON>
//   ss://<base64(method:password)>@<host>:<port>[/?plugin=..]#<tag>
//   ss://<base64(method:password@host:port)>#<tag>

use std::borrow::Cow;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use serde_json::Value;
use url::Url;

use super::{GeneralConfig, LinkConfig, LinkError, LinkParser, Protocol};

/// The default [`LinkParser`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareLinkParser;

impl LinkParser for ShareLinkParser {
    fn parse(&self, link: &str) -> Result<LinkConfig, LinkError> {
        let link = link.trim();
        let (scheme, rest) = link.split_once("://").unwrap_or((link, ""));
        let protocol = Protocol::from_str(scheme).map_err(|_| LinkError::UnsupportedScheme {
            scheme: scheme.to_owned(),
        })?;

        match protocol {
            Protocol::Vless | Protocol::Trojan => parse_url_link(protocol, link),
            Protocol::Vmess => parse_vmess(link, rest),
            Protocol::Shadowsocks => parse_shadowsocks(link, rest),
        }
    }
}

// ── vless / trojan ─────────────────────────────────────────────────

fn parse_url_link(protocol: Protocol, link: &str) -> Result<LinkConfig, LinkError> {
    let url = Url::parse(link)?;

    let id = percent_decode(url.username())?;
    if id.is_empty() {
        return Err(LinkError::MissingField {
            field: if protocol == Protocol::Trojan {
                "password"
            } else {
                "id"
            },
        });
    }
    let address = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(strip_brackets)
        .ok_or(LinkError::MissingField { field: "host" })?;
    let port = url.port().ok_or(LinkError::MissingField { field: "port" })?;
    check_port(port)?;

    let params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };

    let default_security = if protocol == Protocol::Trojan {
        "tls"
    } else {
        "none"
    };
    let security = Some(param("security"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default_security.to_owned());
    let network = Some(param("type"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "tcp".to_owned());

    let base = GeneralConfig {
        protocol: protocol.to_string(),
        address: address.to_owned(),
        tls: tls_from_security(&security),
        security,
        id,
        network,
        host: param("host"),
        path: param("path"),
        port: port.to_string(),
        remark: percent_decode(url.fragment().unwrap_or_default())?,
        sni: param("sni"),
        alpn: param("alpn"),
        tls_fingerprint: param("fp"),
        authority: param("authority"),
        service_name: param("serviceName"),
        mode: param("mode"),
        kind: param("headerType"),
        orig_link: link.to_owned(),
        ..GeneralConfig::default()
    };

    Ok(base.into_fields(params))
}

// ── vmess ──────────────────────────────────────────────────────────

fn parse_vmess(link: &str, payload: &str) -> Result<LinkConfig, LinkError> {
    let decoded = decode_base64(payload)?;
    let object: serde_json::Map<String, Value> =
        serde_json::from_str(&decoded).map_err(|e| LinkError::Decode {
            reason: format!("vmess payload is not a JSON object: {e}"),
        })?;

    let fields: Vec<(String, String)> = object
        .iter()
        .map(|(k, v)| (k.clone(), json_to_string(v)))
        .collect();
    let field = |key: &str| {
        fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    };

    let address = field("add");
    if address.is_empty() {
        return Err(LinkError::MissingField { field: "host" });
    }
    let id = field("id");
    if id.is_empty() {
        return Err(LinkError::MissingField { field: "id" });
    }
    let port = parse_port(&field("port"))?;

    let security = Some(field("scy"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "auto".to_owned());
    let network = Some(field("net"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "tcp".to_owned());

    let base = GeneralConfig {
        protocol: Protocol::Vmess.to_string(),
        address,
        security,
        aid: field("aid"),
        host: field("host"),
        id,
        network,
        path: field("path"),
        port: port.to_string(),
        remark: field("ps"),
        tls: field("tls"),
        sni: field("sni"),
        alpn: field("alpn"),
        tls_fingerprint: field("fp"),
        kind: field("type"),
        orig_link: link.to_owned(),
        ..GeneralConfig::default()
    };

    Ok(base.into_fields(fields))
}

fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ── shadowsocks ────────────────────────────────────────────────────

fn parse_shadowsocks(link: &str, body: &str) -> Result<LinkConfig, LinkError> {
    let (body, tag) = match body.split_once('#') {
        Some((body, tag)) => (body, percent_decode(tag)?),
        None => (body, String::new()),
    };
    let (body, query) = body.split_once('?').unwrap_or((body, ""));
    let body = body.trim_end_matches('/');

    let (method, password, host_port) = match body.rsplit_once('@') {
        // SIP002: userinfo is either base64 or percent-encoded plain text.
        Some((userinfo, host_port)) => {
            let userinfo = percent_decode(userinfo)?;
            let credentials = if userinfo.contains(':') {
                userinfo
            } else {
                decode_base64(&userinfo)?
            };
            let (method, password) = split_credentials(&credentials)?;
            (method, password, host_port.to_owned())
        }
        // Legacy: everything before the tag is one base64 blob.
        None => {
            let decoded = decode_base64(body)?;
            let (credentials, host_port) =
                decoded
                    .rsplit_once('@')
                    .ok_or(LinkError::MissingField { field: "host" })?;
            let (method, password) = split_credentials(credentials)?;
            (method, password, host_port.to_owned())
        }
    };

    let (address, port) = split_host_port(&host_port)?;

    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let base = GeneralConfig {
        protocol: Protocol::Shadowsocks.to_string(),
        address,
        security: method,
        id: password,
        network: "tcp".to_owned(),
        port: port.to_string(),
        remark: tag,
        orig_link: link.to_owned(),
        ..GeneralConfig::default()
    };

    Ok(base.into_fields(params))
}

fn split_credentials(credentials: &str) -> Result<(String, String), LinkError> {
    let (method, password) = credentials
        .split_once(':')
        .ok_or(LinkError::MissingField { field: "password" })?;
    if method.is_empty() {
        return Err(LinkError::MissingField { field: "method" });
    }
    Ok((method.to_owned(), password.to_owned()))
}

// ── Helpers ────────────────────────────────────────────────────────

fn percent_decode(raw: &str) -> Result<String, LinkError> {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .map_err(|e| LinkError::Decode {
            reason: e.to_string(),
        })
}

/// Decode base64 in any of the alphabets and padding styles seen in the wild.
fn decode_base64(raw: &str) -> Result<String, LinkError> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(&cleaned).ok())
        .ok_or_else(|| LinkError::Decode {
            reason: "payload is not valid base64".to_owned(),
        })?;
    String::from_utf8(bytes).map_err(|e| LinkError::Decode {
        reason: e.to_string(),
    })
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

fn split_host_port(raw: &str) -> Result<(String, u16), LinkError> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or(LinkError::MissingField { field: "port" })?;
    let host = strip_brackets(host);
    if host.is_empty() {
        return Err(LinkError::MissingField { field: "host" });
    }
    Ok((host.to_owned(), parse_port(port)?))
}

fn parse_port(raw: &str) -> Result<u16, LinkError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LinkError::MissingField { field: "port" });
    }
    let port = raw.parse::<u16>().map_err(|_| LinkError::InvalidPort {
        value: raw.to_owned(),
    })?;
    check_port(port)?;
    Ok(port)
}

fn check_port(port: u16) -> Result<(), LinkError> {
    if port == 0 {
        return Err(LinkError::InvalidPort {
            value: port.to_string(),
        });
    }
    Ok(())
}

fn tls_from_security(security: &str) -> String {
    match security {
        "" | "none" => String::new(),
        other => other.to_owned(),
    }
}
