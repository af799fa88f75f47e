//! The server collaborator seam.
//!
//! The sync components never own a transport. They are handed a
//! [`ServerHandle`] at construction and use exactly two surfaces of it: a
//! request/response command interface and a push-event subscription per
//! named sub-channel. The concrete protocol client (handshake, framing,
//! serialization) lives behind this trait.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::Result;

/// Named push-event sub-channels. A subscriber receives only events
/// belonging to its channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    MediaItems,
    Players,
    Queues,
}

/// A server-initiated push event with a loosely-typed payload.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    MediaItem {
        action: String,
        media_type: String,
        item_id: String,
        data: Value,
    },
    Player {
        player_id: String,
        data: Value,
    },
    Queue {
        queue_id: String,
        data: Value,
    },
}

/// Connection to the media server, injected into every sync component.
#[async_trait]
pub trait ServerHandle: Send + Sync {
    /// Issue a request/response command.
    async fn send_command(&self, name: &str, args: Value) -> Result<Value>;

    /// Subscribe to a push-event sub-channel. Each call returns a fresh
    /// receiver; dropping the receiver ends the subscription.
    fn subscribe(&self, channel: EventChannel) -> UnboundedReceiver<ServerEvent>;

    /// Whether the underlying transport currently has a live connection.
    fn is_connected(&self) -> bool;

    /// Ask the transport to (re)establish its connection. Completion of
    /// the handshake is sampled separately via [`Self::is_connected`].
    async fn connect(&self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

    use super::{EventChannel, ServerEvent, ServerHandle};
    use crate::error::{Result, SyncError};

    /// Scripted in-memory server for unit tests: responses are queued per
    /// command name, every command is recorded, and events can be injected
    /// into any channel.
    #[derive(Default)]
    pub struct MockServer {
        responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
        commands: Mutex<Vec<(String, Value)>>,
        subscribers: Mutex<HashMap<EventChannel, Vec<UnboundedSender<ServerEvent>>>>,
        connected: AtomicBool,
    }

    impl MockServer {
        pub fn new() -> Self {
            let server = Self::default();
            server.connected.store(true, Ordering::SeqCst);
            server
        }

        /// Queue the next response for `command`. Responses are consumed
        /// in FIFO order; unscripted commands answer `null`.
        pub fn push_response(&self, command: &str, response: Result<Value>) {
            self.responses
                .lock()
                .unwrap()
                .entry(command.to_string())
                .or_default()
                .push_back(response);
        }

        /// Commands sent so far, as `(name, args)` pairs.
        pub fn sent(&self) -> Vec<(String, Value)> {
            self.commands.lock().unwrap().clone()
        }

        pub fn sent_named(&self, command: &str) -> Vec<Value> {
            self.sent()
                .into_iter()
                .filter(|(name, _)| name == command)
                .map(|(_, args)| args)
                .collect()
        }

        /// Inject a push event into a channel.
        pub fn emit(&self, channel: EventChannel, event: ServerEvent) {
            let mut subscribers = self.subscribers.lock().unwrap();
            if let Some(senders) = subscribers.get_mut(&channel) {
                senders.retain(|tx| tx.send(event.clone()).is_ok());
            }
        }

        pub fn set_connected(&self, connected: bool) {
            self.connected.store(connected, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ServerHandle for MockServer {
        async fn send_command(&self, name: &str, args: Value) -> Result<Value> {
            self.commands
                .lock()
                .unwrap()
                .push((name.to_string(), args));
            if !self.connected.load(Ordering::SeqCst) {
                return Err(SyncError::NoClient);
            }
            let next = self
                .responses
                .lock()
                .unwrap()
                .get_mut(name)
                .and_then(VecDeque::pop_front);
            next.unwrap_or(Ok(Value::Null))
        }

        fn subscribe(&self, channel: EventChannel) -> UnboundedReceiver<ServerEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.subscribers
                .lock()
                .unwrap()
                .entry(channel)
                .or_default()
                .push(tx);
            rx
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn connect(&self) -> Result<()> {
            if self.connected.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(SyncError::network("connection refused"))
            }
        }
    }
}
