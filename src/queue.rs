//! Queue synchronizer.
//!
//! Ordered upcoming-track list for the active player's queue. List order
//! is server-authoritative: local mutations never reorder the list
//! client-side; they issue a command and either wait for the resulting
//! push (the server sends full snapshots on this channel) or refetch
//! explicitly.

use std::sync::{Arc, Mutex as StdMutex};

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::client::{EventChannel, ServerEvent, ServerHandle};
use crate::error::{Result, SyncError};
use crate::model::Track;
use crate::payload;
use crate::player::RepeatMode;

/// How `play_media` inserts into the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueMode {
    Play,
    Replace,
    Next,
    Add,
}

impl EnqueueMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnqueueMode::Play => "play",
            EnqueueMode::Replace => "replace",
            EnqueueMode::Next => "next",
            EnqueueMode::Add => "add",
        }
    }
}

#[derive(Default)]
struct QueueState {
    queue_id: Option<String>,
    items: Vec<Track>,
    // Bumped on retarget; a late fetch response for the previous queue
    // discards itself.
    epoch: u64,
    last_error: Option<SyncError>,
}

/// Parse a queue snapshot. Accepts a bare list or a dict with an `items`
/// key; entries may nest the track under `track`/`media_item`, and the
/// queue-item id (when present) wins over the track's own id so that
/// remove/move can address duplicates.
fn parse_queue_items(data: &Value) -> Option<Vec<Track>> {
    let entries = payload::item_list(data)?;
    let tracks = entries
        .iter()
        .filter_map(|entry| {
            let track_value = ["track", "media_item"]
                .iter()
                .find_map(|key| entry.get(*key))
                .filter(|v| v.is_object())
                .unwrap_or(entry);
            let mut track = Track::from_payload(track_value)?;
            if let Some(queue_item_id) = payload::id_field(entry, &["queue_item_id"]) {
                track.id = queue_item_id;
            }
            Some(track)
        })
        .collect();
    Some(tracks)
}

/// Client-side view of the active player's queue.
pub struct QueueSync {
    server: Arc<dyn ServerHandle>,
    state: Arc<RwLock<QueueState>>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl QueueSync {
    pub fn new(server: Arc<dyn ServerHandle>) -> Self {
        Self {
            server,
            state: Arc::new(RwLock::new(QueueState::default())),
            worker: StdMutex::new(None),
        }
    }

    /// Start (or restart) the push-event consumer.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if let Some(old) = worker.take() {
            old.abort();
        }

        let mut events = self.server.subscribe(EventChannel::Queues);
        let state = Arc::clone(&self.state);
        *worker = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let ServerEvent::Queue { queue_id, data } = event else {
                    continue;
                };
                let mut state = state.write().await;
                if state.queue_id.as_deref() != Some(queue_id.as_str()) {
                    tracing::debug!("ignoring event for queue {queue_id}: not the active queue");
                    continue;
                }
                match parse_queue_items(&data) {
                    // Full snapshot: the list is replaced wholesale.
                    Some(items) => state.items = items,
                    None => tracing::warn!("dropping malformed queue snapshot for {queue_id}"),
                }
            }
        }));
    }

    /// Cancel the push-event consumer.
    pub fn stop(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            worker.abort();
        }
    }

    /// Target `player_id`'s queue and fetch its current contents. The
    /// event consumer is replaced wholesale for the new target.
    pub async fn fetch_queue(&self, player_id: &str) -> Result<Vec<Track>> {
        let epoch = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.queue_id = Some(player_id.to_string());
            state.epoch
        };
        self.start();
        self.fetch_items(player_id, epoch).await
    }

    async fn fetch_items(&self, queue_id: &str, epoch: u64) -> Result<Vec<Track>> {
        let args = json!({ "queue_id": queue_id });
        let response = match self.server.send_command("player_queues/items", args).await {
            Ok(response) => response,
            Err(e) => {
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.last_error = Some(e.clone());
                }
                return Err(e);
            }
        };

        let items = match parse_queue_items(&response) {
            Some(items) => items,
            None => {
                let e = SyncError::parse("queue items response was neither a list nor an items dict");
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.last_error = Some(e.clone());
                }
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        if state.epoch == epoch {
            state.items = items.clone();
            state.last_error = None;
        }
        Ok(items)
    }

    /// Clear the queue. The local list is emptied optimistically on
    /// success; the resulting state is unambiguous, so no refetch.
    pub async fn clear(&self) -> Result<()> {
        let queue_id = self.require_queue("clear").await?;
        let args = json!({ "queue_id": queue_id });
        match self.server.send_command("player_queues/clear", args).await {
            Ok(_) => {
                let mut state = self.state.write().await;
                state.items.clear();
                state.last_error = None;
                Ok(())
            }
            Err(e) => self.record_failure(e).await,
        }
    }

    pub async fn set_shuffle(&self, enabled: bool) -> Result<()> {
        let queue_id = self.require_queue("set_shuffle").await?;
        let args = json!({ "queue_id": queue_id, "shuffle_enabled": enabled });
        match self.server.send_command("player_queues/shuffle", args).await {
            Ok(_) => {
                self.state.write().await.last_error = None;
                Ok(())
            }
            Err(e) => self.record_failure(e).await,
        }
    }

    pub async fn set_repeat(&self, mode: RepeatMode) -> Result<()> {
        let queue_id = self.require_queue("set_repeat").await?;
        let args = json!({ "queue_id": queue_id, "repeat_mode": mode.as_str() });
        match self.server.send_command("player_queues/repeat", args).await {
            Ok(_) => {
                self.state.write().await.last_error = None;
                Ok(())
            }
            Err(e) => self.record_failure(e).await,
        }
    }

    /// Remove a queue item, then refetch. Position shifts are
    /// server-defined, so the resulting order is never predicted locally.
    pub async fn remove_item(&self, item_id: &str) -> Result<()> {
        self.queue_command("remove_item", "delete", json!({ "item_id": item_id }))
            .await
    }

    /// Move a queue item to a new position, then refetch.
    pub async fn move_item(&self, item_id: &str, to_position: usize) -> Result<()> {
        self.queue_command(
            "move_item",
            "move",
            json!({ "item_id": item_id, "to_position": to_position }),
        )
        .await
    }

    /// Append a media item to the queue, then refetch.
    pub async fn add_item(&self, uri: &str) -> Result<()> {
        self.queue_command("add_item", "add", json!({ "uri": uri }))
            .await
    }

    /// Enqueue-and-play entry point, then refetch.
    pub async fn play_media(&self, media: &str, mode: EnqueueMode) -> Result<()> {
        let queue_id = self.require_queue("play_media").await?;
        let args = json!({
            "queue_id": queue_id,
            "media": media,
            "option": mode.as_str(),
        });
        match self.server.send_command("player_queues/play_media", args).await {
            Ok(_) => self.refetch().await,
            Err(e) => self.record_failure(e).await,
        }
    }

    async fn queue_command(&self, operation: &str, command: &str, extra: Value) -> Result<()> {
        let queue_id = self.require_queue(operation).await?;
        let mut args = serde_json::Map::new();
        args.insert("queue_id".to_string(), json!(queue_id));
        args.insert("command".to_string(), json!(command));
        if let Value::Object(extra) = extra {
            args.extend(extra);
        }
        match self
            .server
            .send_command("player_queues/queue_command", Value::Object(args))
            .await
        {
            Ok(_) => self.refetch().await,
            Err(e) => self.record_failure(e).await,
        }
    }

    async fn refetch(&self) -> Result<()> {
        let (queue_id, epoch) = {
            let state = self.state.read().await;
            match state.queue_id.clone() {
                Some(queue_id) => (queue_id, state.epoch),
                None => return Ok(()),
            }
        };
        self.fetch_items(&queue_id, epoch).await.map(|_| ())
    }

    async fn require_queue(&self, operation: &str) -> Result<String> {
        self.state
            .read()
            .await
            .queue_id
            .clone()
            .ok_or_else(|| SyncError::command_failed(operation, "no active queue"))
    }

    async fn record_failure(&self, e: SyncError) -> Result<()> {
        self.state.write().await.last_error = Some(e.clone());
        Err(e)
    }

    /// Snapshot of the upcoming-track list.
    pub async fn items(&self) -> Vec<Track> {
        self.state.read().await.items.clone()
    }

    pub async fn queue_id(&self) -> Option<String> {
        self.state.read().await.queue_id.clone()
    }

    /// Track count, computed on read.
    pub async fn track_count(&self) -> usize {
        self.state.read().await.items.len()
    }

    /// Total duration in seconds, computed on read so it can never drift
    /// from the list itself.
    pub async fn total_duration(&self) -> u64 {
        self.state
            .read()
            .await
            .items
            .iter()
            .filter_map(|track| track.duration_seconds)
            .sum()
    }

    /// Most recent command-level failure, cleared by the next success.
    pub async fn last_error(&self) -> Option<SyncError> {
        self.state.read().await.last_error.clone()
    }
}

impl Drop for QueueSync {
    fn drop(&mut self) {
        self.stop();
    }
}
