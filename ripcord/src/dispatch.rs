//! Call dispatcher: the request/reply correlation engine.
//!
//! [`CallDispatcher`] executes one call to completion according to its
//! delivery guarantee. Fire-and-forget calls ([`CallDispatcher::signal`])
//! are one send with no feedback channel. Acknowledged calls
//! ([`CallDispatcher::call`]) register a reply filter keyed by a fresh
//! [`CallId`], then resend the request at a fixed cadence until the
//! correlated reply arrives, the total timeout elapses, or the caller
//! cancels.
//!
//! The loop and the reply callback share an explicit reply-slot cell;
//! the callback settles it exactly once, and the filter is torn down by an
//! RAII guard on every exit path, so late duplicate replies match nothing
//! and are dropped by the transport.
//!
//! The dispatcher blocks the invoking thread and spawns nothing; run each
//! outstanding call on its own worker if you need overlap. It also never
//! logs — observing failures is the caller's job.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cancel::CancelToken;
use crate::codec::PayloadCodec;
use crate::config::{ClientConfig, ConfigError};
use crate::error::CallError;
use crate::packet::{CallId, Packet, PacketKind, ReplyKind};
use crate::transport::{FilterHandle, NodeId, PacketFilter, PacketSink, Transport};

/// Executes calls against one transport with one codec and one config.
///
/// Cheap to share behind its own `Arc` or to construct per destination;
/// holds no per-call state between invocations.
pub struct CallDispatcher<C: PayloadCodec> {
    transport: Arc<dyn Transport>,
    codec: C,
    config: ClientConfig,
}

impl<C: PayloadCodec> CallDispatcher<C> {
    /// Build a dispatcher, validating the config once here rather than on
    /// every call.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for an invalid retry configuration.
    pub fn new(
        transport: Arc<dyn Transport>,
        codec: C,
        config: ClientConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            transport,
            codec,
            config,
        })
    }

    /// The config this dispatcher runs every call with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fire-and-forget: encode, send once, return.
    ///
    /// Success is not observable — the packet may be dropped in flight and
    /// no reply is expected. That weak guarantee is the point; only a local
    /// encode failure is surfaced.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Codec`] if the arguments fail to encode.
    pub fn signal<A: Serialize>(
        &self,
        destination: &NodeId,
        method: &str,
        args: &A,
    ) -> Result<(), CallError> {
        let id = CallId::random();
        let payload = self.codec.encode(args)?;
        let request = Packet::request(id, method, payload);
        self.transport.send(destination, &request);
        Ok(())
    }

    /// Acknowledged call: resend until a correlated terminal reply arrives.
    ///
    /// Blocks until the call settles. Per loop iteration: check the cancel
    /// token, check the total-timeout deadline, resend the request, block
    /// on the transport for up to the resend interval (clamped to the time
    /// remaining), then let the transport process arrivals — which runs the
    /// reply callback synchronously when the matching reply is in.
    ///
    /// The peer must tolerate duplicate requests under one [`CallId`];
    /// resends are indistinguishable from the first send.
    ///
    /// # Errors
    ///
    /// - [`CallError::Timeout`] once the total timeout elapses.
    /// - [`CallError::Cancelled`] if `cancel` fires.
    /// - [`CallError::FingerprintInvalid`], [`CallError::HorizonPassed`],
    ///   [`CallError::Remote`] for terminal rejections from the peer.
    /// - [`CallError::UnknownReplyKind`] for a reply outside the protocol.
    /// - [`CallError::Codec`] if arguments fail to encode or the reply
    ///   payload fails to decode.
    pub fn call<A, R>(
        &self,
        destination: &NodeId,
        method: &str,
        args: &A,
        cancel: &CancelToken,
    ) -> Result<R, CallError>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
    {
        let id = CallId::random();
        let payload = self.codec.encode(args)?;
        let request = Packet::request(id, method, payload);

        let slot: Arc<Mutex<ReplySlot<R>>> = Arc::new(Mutex::new(ReplySlot::new()));
        let filter: PacketFilter =
            Box::new(move |packet| packet.id == id && packet.kind == PacketKind::Reply);
        let sink: PacketSink = {
            let slot = Arc::clone(&slot);
            let codec = self.codec.clone();
            Box::new(move |packet| {
                let outcome = decode_reply::<R, C>(&codec, &packet);
                if let Ok(mut slot) = slot.lock() {
                    slot.settle(outcome);
                }
            })
        };
        // Torn down on every exit path, so duplicate replies arriving after
        // settlement match no filter and are dropped by the transport.
        let _guard = FilterGuard::new(
            Arc::clone(&self.transport),
            self.transport.register(filter, sink),
        );

        let started = Instant::now();
        loop {
            if cancel.is_cancelled() {
                return Err(CallError::Cancelled);
            }
            if let Some(outcome) = take_outcome(&slot) {
                return outcome;
            }
            let elapsed = started.elapsed();
            if let Some(total) = self.config.total_timeout {
                if elapsed > total {
                    return Err(CallError::Timeout { elapsed });
                }
            }

            self.transport.send(destination, &request);

            let max_wait = match self.config.total_timeout {
                Some(total) => self
                    .config
                    .resend_interval
                    .min(total.saturating_sub(started.elapsed())),
                None => self.config.resend_interval,
            };
            let ready = self.transport.wait(max_wait);
            self.transport.process(ready);
        }
    }
}

/// Shared state cell between the retry loop and the reply callback.
///
/// Settles at most once: the first terminal reply wins and anything after
/// it is ignored, which keeps duplicate replies from retried requests from
/// ever producing a second outcome.
struct ReplySlot<R> {
    outcome: Option<Result<R, CallError>>,
    settled: bool,
}

impl<R> ReplySlot<R> {
    fn new() -> Self {
        Self {
            outcome: None,
            settled: false,
        }
    }

    fn settle(&mut self, outcome: Result<R, CallError>) {
        if self.settled {
            return;
        }
        self.settled = true;
        self.outcome = Some(outcome);
    }
}

fn take_outcome<R>(slot: &Arc<Mutex<ReplySlot<R>>>) -> Option<Result<R, CallError>> {
    match slot.lock() {
        Ok(mut slot) => slot.outcome.take(),
        Err(_) => None,
    }
}

/// Map a reply packet to a call outcome by its wire name.
fn decode_reply<R, C>(codec: &C, packet: &Packet) -> Result<R, CallError>
where
    R: DeserializeOwned,
    C: PayloadCodec,
{
    match ReplyKind::from_wire_name(&packet.name) {
        Some(ReplyKind::Ok) => Ok(codec.decode(&packet.payload)?),
        Some(ReplyKind::FingerprintInvalid) => Err(CallError::FingerprintInvalid),
        Some(ReplyKind::HorizonPassed) => {
            let horizon_millis: u64 = codec.decode(&packet.payload)?;
            Err(CallError::HorizonPassed { horizon_millis })
        }
        Some(ReplyKind::InternalError) => Err(CallError::Remote {
            detail: String::from_utf8_lossy(&packet.payload).into_owned(),
        }),
        None => Err(CallError::UnknownReplyKind {
            name: packet.name.clone(),
        }),
    }
}

/// Deregisters the reply filter when the call returns, whatever the path.
struct FilterGuard {
    transport: Arc<dyn Transport>,
    handle: FilterHandle,
}

impl FilterGuard {
    fn new(transport: Arc<dyn Transport>, handle: FilterHandle) -> Self {
        Self { transport, handle }
    }
}

impl Drop for FilterGuard {
    fn drop(&mut self) {
        self.transport.deregister(self.handle);
    }
}
