// ── Core error types ──
//
// User-facing errors from linktray-core. Transport failures are passed
// through untouched so callers can surface the backend's own message;
// everything else is a registry or link-level problem the user can fix.

use thiserror::Error;

use crate::registry::ItemId;
use crate::transport::TransportError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Link errors ──────────────────────────────────────────────────
    #[error("invalid connection link: {reason}")]
    InvalidLink { link: String, reason: String },

    // ── Registry errors ──────────────────────────────────────────────
    #[error("connection not found: {id}")]
    ItemNotFound { id: ItemId },

    #[error("connection '{label}' is active, disconnect before editing")]
    ItemActive { label: String },

    // ── Transport errors ─────────────────────────────────────────────
    #[error(transparent)]
    Transport(TransportError),

    #[error("cannot create transport client: {reason}")]
    TransportInit { reason: String },

    #[error("transport did not disconnect within {timeout_secs}s")]
    DisconnectTimeout { timeout_secs: u64 },

    // ── Sampler errors ───────────────────────────────────────────────
    #[error("traffic sampler is already running")]
    SamplerRunning,

    #[error("no async runtime available to host the traffic sampler")]
    NoRuntime,
}

impl CoreError {
    pub(crate) fn invalid_link(link: &str, reason: impl ToString) -> Self {
        Self::InvalidLink {
            link: link.to_owned(),
            reason: reason.to_string(),
        }
    }

    /// `true` for errors caused by a malformed link (the `ConfigError` class).
    pub fn is_invalid_link(&self) -> bool {
        matches!(self, Self::InvalidLink { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_link_message_hides_link() {
        let err = CoreError::invalid_link("vless://secret@host:1", "missing port");
        assert_eq!(err.to_string(), "invalid connection link: missing port");
        assert!(err.is_invalid_link());
    }

    #[test]
    fn transport_errors_pass_through_unchanged() {
        let source: TransportError = "tun device busy".into();
        let err = CoreError::Transport(source);
        assert_eq!(err.to_string(), "tun device busy");
        assert!(!err.is_invalid_link());
    }

    #[test]
    fn active_item_message_names_label() {
        let err = CoreError::ItemActive {
            label: "Frankfurt".into(),
        };
        assert_eq!(
            err.to_string(),
            "connection 'Frankfurt' is active, disconnect before editing"
        );
    }
}
