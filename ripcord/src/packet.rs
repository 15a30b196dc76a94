//! Packet model: correlation ids, packet kinds, and terminal reply kinds.
//!
//! A call on the wire is a pair of [`Packet`]s sharing one [`CallId`]: the
//! request (possibly resent many times) and the single reply that settles
//! it. Packets are immutable value objects; all protocol behavior lives in
//! the dispatcher.

use serde::{Deserialize, Serialize};

/// 128-bit correlation id minted once per call.
///
/// Identity only: replies are matched by equality, never ordered. Both
/// halves are drawn from the thread-local RNG, so two concurrent calls do
/// not collide in practice.
///
/// # Examples
///
/// ```
/// use ripcord::CallId;
///
/// let id = CallId::random();
/// assert!(id.is_valid());
/// assert_ne!(id, CallId::random());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CallId {
    /// First 64 bits.
    pub first: u64,
    /// Second 64 bits.
    pub second: u64,
}

impl CallId {
    /// Create a call id with explicit halves.
    pub const fn new(first: u64, second: u64) -> Self {
        Self { first, second }
    }

    /// Mint a fresh random id for a new call.
    pub fn random() -> Self {
        Self {
            first: rand::random(),
            second: rand::random(),
        }
    }

    /// Check that the id is non-zero.
    ///
    /// The all-zero id is reserved as "no id" (it is also the `Default`).
    pub const fn is_valid(&self) -> bool {
        self.first != 0 || self.second != 0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}{:016x}", self.first, self.second)
    }
}

/// Direction of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PacketKind {
    /// Client-to-peer request. `Packet::name` carries the method name.
    Request,
    /// Peer-to-client reply. `Packet::name` carries the reply kind.
    Reply,
}

/// Terminal reply kinds a peer can send back for a call.
///
/// Any of these settles the call: the dispatcher stops resending the moment
/// one arrives. Reply packets carrying a name outside this set are a
/// protocol violation and fail the call immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplyKind {
    /// Success; the payload holds the encoded result value.
    Ok,
    /// The peer no longer recognizes the call's signature (e.g. redeployed).
    FingerprintInvalid,
    /// The call arrived past the peer's validity horizon; the payload holds
    /// the horizon timestamp in milliseconds since the Unix epoch.
    HorizonPassed,
    /// The peer's handler failed; the payload holds diagnostic text.
    InternalError,
}

impl ReplyKind {
    /// Name this reply kind carries on the wire.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            ReplyKind::Ok => "ok",
            ReplyKind::FingerprintInvalid => "fingerprint-invalid",
            ReplyKind::HorizonPassed => "horizon-passed",
            ReplyKind::InternalError => "internal-error",
        }
    }

    /// Parse a wire name back into a reply kind.
    ///
    /// Returns `None` for unrecognized names; the dispatcher treats that as
    /// a protocol violation, not a transient condition.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        match name {
            "ok" => Some(ReplyKind::Ok),
            "fingerprint-invalid" => Some(ReplyKind::FingerprintInvalid),
            "horizon-passed" => Some(ReplyKind::HorizonPassed),
            "internal-error" => Some(ReplyKind::InternalError),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One unit of traffic between client and peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Correlation id shared by a request and its reply.
    pub id: CallId,
    /// Request or reply.
    pub kind: PacketKind,
    /// Method name (requests) or reply kind wire name (replies).
    pub name: String,
    /// Opaque payload bytes, produced and consumed by the codec.
    pub payload: Vec<u8>,
}

impl Packet {
    /// Build a request packet for `method` under the given id.
    pub fn request(id: CallId, method: &str, payload: Vec<u8>) -> Self {
        Self {
            id,
            kind: PacketKind::Request,
            name: method.to_string(),
            payload,
        }
    }

    /// Build a reply packet of the given kind under the given id.
    pub fn reply(id: CallId, kind: ReplyKind, payload: Vec<u8>) -> Self {
        Self {
            id,
            kind: PacketKind::Reply,
            name: kind.wire_name().to_string(),
            payload,
        }
    }

    /// Whether this packet is a reply.
    pub fn is_reply(&self) -> bool {
        self.kind == PacketKind::Reply
    }
}
