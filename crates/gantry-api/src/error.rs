use thiserror::Error;

/// Top-level error type for the `gantry-api` crate.
///
/// Covers every failure mode of one request against a device: transport,
/// protocol (non-success status), and payload decoding. `gantry-core` maps
/// these into fleet-level diagnostics.
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Protocol ────────────────────────────────────────────────────
    /// Non-success HTTP status from the device, with the raw body.
    #[error("Device returned HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Payload shape mismatch (e.g. non-numeric where a float was expected).
    #[error("Unexpected payload: expected {expected}, got {got}")]
    Parse { expected: &'static str, got: String },
}

impl ApiError {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Retrying is the caller's responsibility and must never be applied to
    /// state-mutating calls -- the firmware gives no idempotency guarantees.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// The HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
