//! Connection hub
//!
//! The outbound seam between the session layer and the transport. The
//! transport registers an unbounded sender per connection; the dispatcher
//! and fan-out engine push messages through it without blocking. A send to
//! a connection that is tearing down is silently dropped.

use crate::protocol::ServerMessage;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;
use types::ids::ConnId;

#[derive(Debug, Default)]
pub struct ConnectionHub {
    conns: DashMap<ConnId, mpsc::UnboundedSender<ServerMessage>>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back the receiving half for the
    /// transport's writer task.
    pub fn register(&self, conn: ConnId) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.conns.insert(conn, tx);
        rx
    }

    pub fn unregister(&self, conn: ConnId) {
        self.conns.remove(&conn);
    }

    /// Push one message to one connection.
    pub fn send_to(&self, conn: ConnId, msg: ServerMessage) {
        if let Some(tx) = self.conns.get(&conn) {
            if tx.send(msg).is_err() {
                debug!(%conn, "dropping message for closing connection");
            }
        }
    }

    /// Push a message to every listed connection.
    pub fn broadcast(&self, conns: &[ConnId], msg: &ServerMessage) {
        for conn in conns {
            self.send_to(*conn, msg.clone());
        }
    }

    pub fn connection_count(&self) -> usize {
        self.conns.len()
    }
}
