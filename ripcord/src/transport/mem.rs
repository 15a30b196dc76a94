//! Process-local in-memory transport.
//!
//! [`MemTransport`] implements the transport port over a mutex-guarded
//! inbox and a condvar for the blocking wait. A scripted peer hook plays
//! the remote side: it sees every outbound packet and returns whatever
//! replies should arrive. Tests, the loopback demo, and embeddings that
//! want a same-process peer all run on this.

use std::collections::{HashSet, VecDeque};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::packet::Packet;
use crate::transport::{FilterHandle, NodeId, PacketFilter, PacketSink, Transport};

/// Scripted remote side: receives each outbound packet, returns the replies
/// that should land in the inbox.
///
/// The hook runs under the transport's internal lock and must not call back
/// into the transport.
pub type PeerHook = Box<dyn FnMut(&Packet) -> Vec<Packet> + Send>;

/// Running counters exposed by [`MemTransport`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportMetrics {
    /// Outbound packets handed to `send`.
    pub packets_sent: u64,
    /// Inbound packets delivered to at least one registration.
    pub packets_delivered: u64,
    /// Inbound packets no registration matched.
    pub packets_dropped: u64,
    /// Calls to `wait`.
    pub wait_calls: u64,
}

struct Registration {
    handle: u64,
    filter: PacketFilter,
    sink: PacketSink,
}

#[derive(Default)]
struct Inner {
    inbox: VecDeque<Packet>,
    registrations: Vec<Registration>,
    /// Handles deregistered since the last dispatch merge.
    tombstones: HashSet<u64>,
    next_handle: u64,
    peer: Option<PeerHook>,
    /// Copies of outbound packets, kept only while the send log is enabled.
    sent: Vec<Packet>,
    log_sent: bool,
    metrics: TransportMetrics,
}

/// In-memory transport with a scripted peer.
pub struct MemTransport {
    inner: Mutex<Inner>,
    arrived: Condvar,
    /// Serializes `process` so concurrent callers cannot steal each
    /// other's registrations mid-dispatch.
    dispatching: Mutex<()>,
}

impl Default for MemTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemTransport {
    /// Create a transport with no peer: sends go nowhere, nothing arrives
    /// unless injected.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            arrived: Condvar::new(),
            dispatching: Mutex::new(()),
        }
    }

    /// Create a transport whose remote side is played by `hook`.
    pub fn with_peer(hook: PeerHook) -> Self {
        let transport = Self::new();
        transport.set_peer(hook);
        transport
    }

    /// Install or replace the scripted peer.
    pub fn set_peer(&self, hook: PeerHook) {
        self.lock().peer = Some(hook);
    }

    /// Push a packet straight into the inbox, as if it arrived off the
    /// wire, and wake any waiter.
    pub fn inject(&self, packet: Packet) {
        let mut inner = self.lock();
        inner.inbox.push_back(packet);
        self.arrived.notify_all();
    }

    /// Snapshot of the running counters.
    pub fn metrics(&self) -> TransportMetrics {
        self.lock().metrics.clone()
    }

    /// Start retaining a copy of every outbound packet.
    ///
    /// Off by default: the log grows without bound while enabled, so
    /// long-lived embeddings should leave it off and read
    /// [`MemTransport::metrics`] instead.
    pub fn enable_send_log(&self) {
        self.lock().log_sent = true;
    }

    /// Packets handed to `send` since the log was enabled, in order.
    /// Empty unless [`MemTransport::enable_send_log`] was called.
    pub fn sent_packets(&self) -> Vec<Packet> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("transport state poisoned")
    }
}

impl Transport for MemTransport {
    fn send(&self, destination: &NodeId, packet: &Packet) {
        let mut inner = self.lock();
        inner.metrics.packets_sent += 1;
        if inner.log_sent {
            inner.sent.push(packet.clone());
        }
        tracing::trace!(id = %packet.id, name = %packet.name, dest = %destination, "send");

        let replies = match inner.peer.as_mut() {
            Some(hook) => hook(packet),
            None => Vec::new(),
        };
        if !replies.is_empty() {
            inner.inbox.extend(replies);
            self.arrived.notify_all();
        }
    }

    fn register(&self, filter: PacketFilter, sink: PacketSink) -> FilterHandle {
        let mut inner = self.lock();
        inner.next_handle += 1;
        let handle = inner.next_handle;
        inner.registrations.push(Registration {
            handle,
            filter,
            sink,
        });
        FilterHandle(handle)
    }

    fn deregister(&self, handle: FilterHandle) {
        let mut inner = self.lock();
        inner.tombstones.insert(handle.0);
        inner.registrations.retain(|r| r.handle != handle.0);
    }

    fn wait(&self, max_wait: Duration) -> bool {
        let deadline = Instant::now().checked_add(max_wait);
        let mut inner = self.lock();
        inner.metrics.wait_calls += 1;
        while inner.inbox.is_empty() {
            let timeout = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => remaining,
                    _ => break,
                },
                // max_wait overflowed Instant; park in long slices.
                None => Duration::from_secs(3600),
            };
            let (guard, _) = self
                .arrived
                .wait_timeout(inner, timeout)
                .expect("transport state poisoned");
            inner = guard;
        }
        !inner.inbox.is_empty()
    }

    fn process(&self, ready: bool) {
        if !ready {
            return;
        }
        let _dispatch = self.dispatching.lock().expect("dispatch lock poisoned");

        let (packets, mut registrations, tombstones) = {
            let mut inner = self.lock();
            let packets: Vec<Packet> = inner.inbox.drain(..).collect();
            let registrations = std::mem::take(&mut inner.registrations);
            let tombstones = inner.tombstones.clone();
            (packets, registrations, tombstones)
        };

        // Sinks run outside the state lock so they may register or
        // deregister without deadlocking.
        let mut delivered = 0u64;
        let mut dropped = 0u64;
        for packet in packets {
            let mut matched = false;
            for registration in registrations.iter_mut() {
                if tombstones.contains(&registration.handle) {
                    continue;
                }
                if (registration.filter)(&packet) {
                    (registration.sink)(packet.clone());
                    matched = true;
                }
            }
            if matched {
                delivered += 1;
                tracing::trace!(id = %packet.id, name = %packet.name, "delivered");
            } else {
                dropped += 1;
                tracing::trace!(id = %packet.id, name = %packet.name, "dropped, no filter matched");
            }
        }

        let mut inner = self.lock();
        // Honor deregistrations that happened while the sinks ran.
        registrations.retain(|r| !inner.tombstones.contains(&r.handle));
        let added_during_dispatch = std::mem::take(&mut inner.registrations);
        registrations.extend(added_during_dispatch);
        inner.registrations = registrations;
        inner.tombstones.clear();
        inner.metrics.packets_delivered += delivered;
        inner.metrics.packets_dropped += dropped;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::packet::{CallId, PacketKind, ReplyKind};

    use super::*;

    fn dest() -> NodeId {
        NodeId::new("peer", 4500)
    }

    #[test]
    fn test_wait_times_out_when_idle() {
        let transport = MemTransport::new();
        let started = Instant::now();
        assert!(!transport.wait(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_inject_wakes_wait() {
        let transport = MemTransport::new();
        transport.inject(Packet::reply(CallId::random(), ReplyKind::Ok, vec![]));
        assert!(transport.wait(Duration::from_secs(5)));
    }

    #[test]
    fn test_process_routes_by_filter() {
        let transport = MemTransport::new();
        let wanted = CallId::random();
        let hits = Arc::new(AtomicUsize::new(0));
        let sink_hits = Arc::clone(&hits);

        transport.register(
            Box::new(move |p| p.id == wanted && p.kind == PacketKind::Reply),
            Box::new(move |_| {
                sink_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );

        transport.inject(Packet::reply(wanted, ReplyKind::Ok, vec![]));
        transport.inject(Packet::reply(CallId::random(), ReplyKind::Ok, vec![]));
        transport.process(true);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        let metrics = transport.metrics();
        assert_eq!(metrics.packets_delivered, 1);
        assert_eq!(metrics.packets_dropped, 1);
    }

    #[test]
    fn test_deregistered_filter_no_longer_matches() {
        let transport = MemTransport::new();
        let id = CallId::random();
        let hits = Arc::new(AtomicUsize::new(0));
        let sink_hits = Arc::clone(&hits);

        let handle = transport.register(
            Box::new(move |p| p.id == id),
            Box::new(move |_| {
                sink_hits.fetch_add(1, Ordering::SeqCst);
            }),
        );
        transport.deregister(handle);

        transport.inject(Packet::reply(id, ReplyKind::Ok, vec![]));
        transport.process(true);

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(transport.metrics().packets_dropped, 1);
    }

    #[test]
    fn test_peer_hook_answers_sends() {
        let transport = MemTransport::with_peer(Box::new(|request| {
            vec![Packet::reply(request.id, ReplyKind::Ok, b"[]".to_vec())]
        }));
        transport.enable_send_log();

        let request = Packet::request(CallId::random(), "noop", vec![]);
        transport.send(&dest(), &request);

        assert!(transport.wait(Duration::from_millis(1)));
        assert_eq!(transport.sent_packets().len(), 1);
    }

    #[test]
    fn test_send_log_is_opt_in() {
        let transport = MemTransport::new();
        let request = Packet::request(CallId::random(), "noop", vec![]);

        // Counters run regardless; the packet log only once enabled.
        transport.send(&dest(), &request);
        assert_eq!(transport.metrics().packets_sent, 1);
        assert!(transport.sent_packets().is_empty());

        transport.enable_send_log();
        transport.send(&dest(), &request);
        assert_eq!(transport.metrics().packets_sent, 2);
        assert_eq!(transport.sent_packets().len(), 1);
    }

    #[test]
    fn test_process_without_ready_is_a_no_op() {
        let transport = MemTransport::new();
        transport.inject(Packet::reply(CallId::random(), ReplyKind::Ok, vec![]));
        transport.process(false);
        // Still queued: nothing was delivered or dropped.
        assert_eq!(transport.metrics().packets_delivered, 0);
        assert_eq!(transport.metrics().packets_dropped, 0);
        assert!(transport.wait(Duration::ZERO));
    }
}
