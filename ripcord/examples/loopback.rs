//! Loopback demo: a calculator service answered by a scripted in-process
//! peer.
//!
//! Run with:
//!
//! ```text
//! cargo run --example loopback
//! RUST_LOG=ripcord=trace cargo run --example loopback
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ripcord::{
    CancelToken, ClientConfig, DeliveryKind, JsonCodec, MemTransport, NodeId, Packet,
    PayloadCodec, ReplyKind, RpcClient, ServiceSchema,
};

#[derive(Debug, Serialize, Deserialize)]
struct AddArgs {
    a: i64,
    b: i64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // The remote side, scripted: sums "add" requests, but loses the first
    // one in transit so the retry loop gets some exercise.
    let mut dropped_first_add = false;
    let transport = Arc::new(MemTransport::with_peer(Box::new(move |request: &Packet| {
        match request.name.as_str() {
            "add" => {
                if !std::mem::replace(&mut dropped_first_add, true) {
                    return Vec::new();
                }
                let args: AddArgs = match JsonCodec.decode(&request.payload) {
                    Ok(args) => args,
                    Err(e) => {
                        let detail = e.to_string().into_bytes();
                        return vec![Packet::reply(request.id, ReplyKind::InternalError, detail)];
                    }
                };
                let payload = match JsonCodec.encode(&(args.a + args.b)) {
                    Ok(payload) => payload,
                    Err(e) => {
                        let detail = e.to_string().into_bytes();
                        return vec![Packet::reply(request.id, ReplyKind::InternalError, detail)];
                    }
                };
                vec![Packet::reply(request.id, ReplyKind::Ok, payload)]
            }
            _ => Vec::new(),
        }
    })));

    let schema = ServiceSchema::new("calculator")
        .method("add", DeliveryKind::Repliable)
        .method("audit", DeliveryKind::Signalling);

    let client = RpcClient::bind(
        schema,
        NodeId::new("loopback", 0),
        Arc::clone(&transport) as Arc<dyn ripcord::Transport>,
        JsonCodec,
        ClientConfig::new(Duration::from_millis(50), Some(Duration::from_secs(2)))?,
    )?;

    let cancel = CancelToken::new();

    // Fire-and-forget: returns immediately, no reply expected.
    let none: Option<()> = client.invoke("audit", &"session start", &cancel)?;
    assert!(none.is_none());

    // Acknowledged: blocks until the peer answers (after one resend here).
    let sum: Option<i64> = client.invoke("add", &AddArgs { a: 19, b: 23 }, &cancel)?;
    println!("19 + 23 = {}", sum.unwrap_or_default());

    let metrics = transport.metrics();
    println!(
        "sent {} packets, delivered {}, dropped {}",
        metrics.packets_sent, metrics.packets_delivered, metrics.packets_dropped
    );
    Ok(())
}
