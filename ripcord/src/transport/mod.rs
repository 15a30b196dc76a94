//! Transport port: the abstract packet plumbing the dispatcher drives.
//!
//! The dispatcher depends on exactly five operations — send, register,
//! deregister, wait, process — and nothing else about the network. Real
//! deployments put a socket layer behind this trait; [`mem::MemTransport`]
//! is the bundled process-local implementation used by tests, the demo,
//! and loopback embeddings.

pub mod mem;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::packet::Packet;

/// Predicate deciding whether a registration wants an inbound packet.
pub type PacketFilter = Box<dyn Fn(&Packet) -> bool + Send>;

/// Callback receiving the packets a filter matched.
pub type PacketSink = Box<dyn FnMut(Packet) + Send>;

/// Opaque handle naming one filter registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub(crate) u64);

/// Abstract packet transport consumed by the dispatcher.
///
/// Implementations are shared by every in-flight call, so they must be
/// usable concurrently: registrations are independent, and invoking one
/// sink never blocks another. The dispatcher holds no lock of its own
/// across [`Transport::wait`].
pub trait Transport: Send + Sync {
    /// Send a packet to `destination`, best effort.
    ///
    /// Delivery is unconfirmed and the packet may be silently dropped;
    /// acknowledged delivery is the dispatcher's retry loop, not the
    /// transport's problem.
    fn send(&self, destination: &NodeId, packet: &Packet);

    /// Register a filtered callback for inbound packets.
    ///
    /// `sink` runs synchronously inside [`Transport::process`] for every
    /// inbound packet `filter` matches, until the handle is deregistered.
    fn register(&self, filter: PacketFilter, sink: PacketSink) -> FilterHandle;

    /// Remove a registration. Packets matching no remaining filter are
    /// dropped.
    fn deregister(&self, handle: FilterHandle);

    /// Block until inbound traffic is ready or `max_wait` elapses.
    ///
    /// Returns whether anything is ready to process. This is the sole
    /// suspension point of the engine.
    fn wait(&self, max_wait: Duration) -> bool;

    /// Dispatch any queued inbound packets to matching registrations.
    ///
    /// Runs every sink synchronously before returning. `ready` is the flag
    /// the preceding [`Transport::wait`] returned; implementations may
    /// no-op when it is false.
    fn process(&self, ready: bool);
}

/// Destination address of a peer, `host:port` style.
///
/// Identity for routing only; the engine never interprets the host.
///
/// # Examples
///
/// ```
/// use ripcord::NodeId;
///
/// let node: NodeId = "relay.internal:4500".parse().unwrap();
/// assert_eq!(node.to_string(), "relay.internal:4500");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Host name or address literal.
    pub host: String,
    /// Port number.
    pub port: u16,
}

impl NodeId {
    /// Create a node id from parts.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for NodeId {
    type Err = NodeIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port_str) = s.rsplit_once(':').ok_or(NodeIdParseError::MissingPort)?;
        if host.is_empty() {
            return Err(NodeIdParseError::EmptyHost);
        }
        let port: u16 = port_str
            .parse()
            .map_err(|_| NodeIdParseError::InvalidPort)?;
        Ok(Self::new(host, port))
    }
}

/// Error parsing a [`NodeId`] from `host:port` text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeIdParseError {
    /// No `:port` suffix present.
    #[error("missing port")]
    MissingPort,
    /// The host part is empty.
    #[error("empty host")]
    EmptyHost,
    /// The port part is not a valid u16.
    #[error("invalid port")]
    InvalidPort,
}
