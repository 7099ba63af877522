//! Per-connection session handler.
//!
//! Each accepted connection gets one read task (this module's loop) and
//! one writer task draining the session's outbound channel. The channel
//! keeps request/response ordering FIFO per buyer while letting broadcasts
//! interleave without ever holding the ledger lock across a socket write.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ledger::{InventoryLedger, PurchaseOutcome};
use crate::protocol::{self, ClientMessage, ServerMessage};
use crate::registry::{ClientRegistry, SessionId};
use crate::traits::TimeProvider;

/// Whether the request loop should keep running after a message.
enum Flow {
    Continue,
    Leave,
}

struct Session<T: TimeProvider> {
    id: SessionId,
    name: Option<String>,
    outbound: mpsc::UnboundedSender<ServerMessage>,
    registry: ClientRegistry,
    ledger: InventoryLedger,
    time: T,
}

impl<T: TimeProvider> Session<T> {
    /// Queue a message to this buyer. `false` means the writer is gone and
    /// the session should end.
    fn send(&self, message: ServerMessage) -> bool {
        self.outbound.send(message).is_ok()
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    async fn dispatch(&mut self, message: ClientMessage) -> Flow {
        match message {
            ClientMessage::Join { name } => {
                if !name.is_empty() {
                    self.name = Some(name);
                }
                info!(session = self.id, buyer = self.display_name(), "buyer joined");
                if !self.send(ServerMessage::Welcome) {
                    return Flow::Leave;
                }
                // Late joiners get the state of the sale already in
                // progress so they are not blind until the next tick.
                if let Some(active) = self.ledger.active_sale().await {
                    let notification = ServerMessage::Item {
                        item: active.item.clone(),
                        amount_left: active.remaining,
                        time_left: active.time_remaining_at(self.time.now_unix()),
                    };
                    if !self.send(notification) {
                        return Flow::Leave;
                    }
                }
                Flow::Continue
            }

            ClientMessage::List => {
                let snapshot = self.ledger.snapshot().await;
                let response = ServerMessage::ListResponse {
                    inventory: snapshot.inventory_map(),
                };
                if self.send(response) {
                    Flow::Continue
                } else {
                    Flow::Leave
                }
            }

            ClientMessage::Buy { item, amount } => {
                match self.ledger.try_purchase(&item, amount).await {
                    PurchaseOutcome::Purchased {
                        item,
                        amount,
                        remaining,
                    } => {
                        info!(
                            session = self.id,
                            buyer = self.display_name(),
                            %item,
                            amount,
                            remaining,
                            "purchase confirmed"
                        );
                        if !self.send(ServerMessage::Confirm {
                            item: item.clone(),
                            amount_bought: amount,
                        }) {
                            return Flow::Leave;
                        }
                        // Everyone sees the new quantity; the sale clock
                        // announces the sell-out if this emptied the stock.
                        self.registry
                            .broadcast(ServerMessage::Update {
                                item,
                                amount_left: remaining,
                            })
                            .await;
                        Flow::Continue
                    }
                    PurchaseOutcome::Rejected(reason) => {
                        debug!(
                            session = self.id,
                            %item,
                            amount,
                            %reason,
                            "purchase rejected"
                        );
                        let failure = ServerMessage::Fail {
                            message: format!("Purchase failed: {reason}"),
                        };
                        if self.send(failure) {
                            Flow::Continue
                        } else {
                            Flow::Leave
                        }
                    }
                }
            }

            ClientMessage::Leave => {
                info!(session = self.id, buyer = self.display_name(), "buyer left");
                Flow::Leave
            }
        }
    }
}

/// Serve one buyer connection until it leaves, disconnects, or the server
/// shuts down. Registration and cleanup happen exactly once per call.
pub async fn handle_connection<T: TimeProvider>(
    stream: TcpStream,
    registry: ClientRegistry,
    ledger: InventoryLedger,
    time: T,
    shutdown: CancellationToken,
) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string());
    let (read_half, write_half) = stream.into_split();

    let (tx, rx) = mpsc::unbounded_channel();
    let id = registry.register(tx.clone()).await;
    info!(session = id, %peer, "buyer connected");

    let writer = tokio::spawn(write_outbound(write_half, rx));

    let mut session = Session {
        id,
        name: None,
        outbound: tx,
        registry: registry.clone(),
        ledger,
        time,
    };

    let mut lines = BufReader::new(read_half).lines();
    loop {
        let line = tokio::select! {
            () = shutdown.cancelled() => {
                debug!(session = id, "session stopping on shutdown signal");
                break;
            }
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!(session = id, "connection closed by peer");
                break;
            }
            Err(e) => {
                debug!(session = id, "read error, dropping session: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let message: ClientMessage = match protocol::from_line(&line) {
            Ok(message) => message,
            Err(e) => {
                // A single bad line never tears the connection down.
                debug!(session = id, "ignoring undecodable line: {e}");
                continue;
            }
        };

        if let Flow::Leave = session.dispatch(message).await {
            break;
        }
    }

    // Single exit point: every termination path funnels here, so the
    // session is unregistered and the socket released exactly once.
    registry.unregister(id).await;
    drop(session);
    let _ = writer.await;
    info!(session = id, %peer, "buyer disconnected");
}

async fn write_outbound(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
) {
    while let Some(message) = outbound.recv().await {
        let line = match protocol::to_line(&message) {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to encode outbound message: {e}");
                continue;
            }
        };
        if write_half.write_all(line.as_bytes()).await.is_err() {
            // Broken transport: dropping the receiver makes future sends
            // fail, which unregisters this session on the next broadcast.
            return;
        }
    }
}
