//! # Ripcord
//!
//! Client-side RPC call dispatch over an abstract packet transport.
//!
//! Ripcord turns a typed method invocation into wire packets keyed by a
//! fresh correlation id, drives a retry-until-acknowledged loop against an
//! unreliable transport, matches the asynchronous reply back to the blocked
//! caller, and surfaces a small typed error taxonomy. It provides:
//!
//! - **Packet model**: [`CallId`], [`Packet`], reply kinds.
//! - **Ports**: the [`Transport`] and [`PayloadCodec`] traits the engine
//!   consumes but does not implement (plus [`MemTransport`], a bundled
//!   process-local transport for tests and loopback peers).
//! - **Dispatcher**: [`CallDispatcher`] with three delivery guarantees —
//!   fire-and-forget, acknowledged-with-retry, and durable-acknowledged —
//!   bounded total timeout, and first-class cancellation.
//! - **Binding**: [`ServiceSchema`] and [`RpcClient`], resolving method
//!   names to call descriptors once at bind time.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use ripcord::{
//!     CancelToken, ClientConfig, DeliveryKind, JsonCodec, MemTransport, NodeId, Packet,
//!     PayloadCodec, ReplyKind, RpcClient, ServiceSchema,
//! };
//!
//! // A scripted peer that doubles whatever it is sent.
//! let transport = Arc::new(MemTransport::with_peer(Box::new(|request| {
//!     let n: i64 = JsonCodec.decode(&request.payload).unwrap();
//!     let payload = JsonCodec.encode(&(n * 2)).unwrap();
//!     vec![Packet::reply(request.id, ReplyKind::Ok, payload)]
//! })));
//!
//! let schema = ServiceSchema::new("doubler").method("double", DeliveryKind::Repliable);
//! let config = ClientConfig::new(Duration::from_millis(50), Some(Duration::from_secs(1)))?;
//! let client = RpcClient::bind(schema, NodeId::new("loopback", 0), transport, JsonCodec, config)?;
//!
//! let doubled: Option<i64> = client.invoke("double", &21i64, &CancelToken::new())?;
//! assert_eq!(doubled, Some(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

// =============================================================================
// Modules
// =============================================================================

/// Cooperative cancellation tokens.
pub mod cancel;

/// Payload serialization port and the JSON default.
pub mod codec;

/// Retry and deadline configuration.
pub mod config;

/// The call dispatcher and its retry loop.
pub mod dispatch;

/// Typed failure modes of a call.
pub mod error;

/// Correlation ids and the packet model.
pub mod packet;

/// Method schemas and the bound client handle.
pub mod service;

/// The transport port and the in-memory implementation.
pub mod transport;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use cancel::CancelToken;
pub use codec::{CodecError, JsonCodec, PayloadCodec};
pub use config::{ClientConfig, ConfigError};
pub use dispatch::CallDispatcher;
pub use error::CallError;
pub use packet::{CallId, Packet, PacketKind, ReplyKind};
pub use service::{DeliveryKind, MethodDescriptor, RpcClient, ServiceSchema};
pub use transport::mem::{MemTransport, PeerHook, TransportMetrics};
pub use transport::{FilterHandle, NodeId, NodeIdParseError, PacketFilter, PacketSink, Transport};
