//! Error taxonomy for dispatched calls.
//!
//! Every failure surfaces synchronously from the call that caused it; the
//! dispatcher never logs and never swallows. The split worth knowing:
//!
//! - [`CallError::Timeout`] is a transport-level failure — the peer may
//!   still be processing the request, and the caller may retry at a higher
//!   level.
//! - [`CallError::FingerprintInvalid`], [`CallError::HorizonPassed`] and
//!   [`CallError::Remote`] are protocol-level rejections from the peer,
//!   fatal for this call.
//! - [`CallError::UnknownReplyKind`] is a version-mismatch bug, never a
//!   transient condition, and is never retried.

use std::time::Duration;

use crate::codec::CodecError;

/// Failure of a single dispatched call.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The total timeout elapsed with no terminal reply.
    #[error("call timed out after {elapsed:?}")]
    Timeout {
        /// Time spent in the retry loop before giving up.
        elapsed: Duration,
    },

    /// The peer rejected the call because its signature no longer matches
    /// what the peer expects (e.g. the service was redeployed).
    #[error("peer rejected call: fingerprint no longer valid")]
    FingerprintInvalid,

    /// The call arrived after the validity horizon the peer enforces.
    #[error("call arrived past validity horizon ({horizon_millis} ms since epoch)")]
    HorizonPassed {
        /// Peer-reported horizon, milliseconds since the Unix epoch.
        horizon_millis: u64,
    },

    /// The peer's handler raised an unexpected error.
    #[error("peer handler failed: {detail}")]
    Remote {
        /// Diagnostic text carried in the reply payload.
        detail: String,
    },

    /// A reply arrived with a name outside the protocol's reply set.
    #[error("unrecognized reply kind: {name:?}")]
    UnknownReplyKind {
        /// The offending wire name.
        name: String,
    },

    /// The invoked method is not declared in the bound service schema.
    #[error("method not in service schema: {method:?}")]
    UnknownMethod {
        /// The method name that failed to resolve.
        method: String,
    },

    /// The caller's cancellation token fired.
    #[error("call cancelled")]
    Cancelled,

    /// Payload encoding or decoding failed.
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),
}

impl CallError {
    /// Whether the caller may reasonably retry the whole call.
    ///
    /// Only timeouts qualify; protocol-level rejections are fatal for the
    /// call they answered.
    pub fn is_retriable(&self) -> bool {
        matches!(self, CallError::Timeout { .. })
    }
}
