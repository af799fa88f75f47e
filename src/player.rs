//! Playback state reconciler.
//!
//! Single authoritative view of "what is currently playing", merged from
//! three sources: server push events, locally-issued optimistic edits,
//! and a local interpolation clock that keeps progress moving between
//! server updates. Pending-edit guards keep an in-flight volume drag or
//! seek scrub from being clobbered by a stale server echo.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::{EventChannel, ServerEvent, ServerHandle};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::model::Track;
use crate::payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl Transport {
    fn from_state_str(s: &str) -> Option<Self> {
        match s {
            "playing" => Some(Transport::Playing),
            "paused" => Some(Transport::Paused),
            "stopped" | "idle" | "off" => Some(Transport::Stopped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    One,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::All => "all",
            RepeatMode::One => "one",
        }
    }

    pub fn from_payload_str(s: &str) -> Option<Self> {
        match s {
            "off" | "none" => Some(RepeatMode::Off),
            "all" => Some(RepeatMode::All),
            "one" | "single" => Some(RepeatMode::One),
            _ => None,
        }
    }

    /// Next mode in the cycle off → all → one → off.
    pub fn cycled(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }
}

/// Connection lifecycle of the command interface, as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error(String),
}

/// Displayed playback state for the selected player.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub track: Option<Track>,
    pub transport: Transport,
    pub progress_seconds: f64,
    pub volume_percent: f64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    pub favorite: bool,
    pub player_id: Option<String>,
    pub connection: ConnectionState,
}

#[derive(Default)]
struct ReconcilerState {
    playback: PlaybackState,
    // Pending-edit guards: while set, server-pushed values for that field
    // are received but not applied, so a drag/scrub never jumps backward
    // on a stale echo.
    volume_guard: bool,
    pending_volume: f64,
    volume_gen: u64,
    seek_guard: bool,
    pending_seek: f64,
    seek_gen: u64,
    // Bumped on player switch and teardown; work tagged with an older
    // epoch discards itself instead of mutating state.
    epoch: u64,
    // Interpolation baseline. None whenever transport is not playing.
    tick_origin: Option<Instant>,
    last_error: Option<SyncError>,
}

impl ReconcilerState {
    /// Merge a server push (or point-in-time fetch) into displayed state.
    /// Track and transport apply unconditionally; progress and volume
    /// only when their guard is clear.
    fn apply_player_update(&mut self, data: &Value) {
        if let Some(track_value) = ["current_media", "current_item", "track"]
            .iter()
            .find_map(|key| data.get(*key))
        {
            if track_value.is_null() {
                self.playback.track = None;
            } else if let Some(track) = Track::from_payload(track_value) {
                self.playback.track = Some(track);
            }
        }

        if let Some(transport) = payload::str_field(data, &["state", "playback_state"])
            .and_then(Transport::from_state_str)
        {
            self.playback.transport = transport;
            if transport == Transport::Playing {
                if self.tick_origin.is_none() {
                    self.tick_origin = Some(Instant::now());
                }
            } else {
                self.tick_origin = None;
            }
        }

        if !self.seek_guard {
            if let Some(progress) =
                payload::f64_field(data, &["elapsed_time", "position", "progress"])
            {
                self.playback.progress_seconds = progress.max(0.0);
                if self.playback.transport == Transport::Playing {
                    self.tick_origin = Some(Instant::now());
                }
            }
        }

        if !self.volume_guard {
            if let Some(volume) = payload::f64_field(data, &["volume_level", "volume"]) {
                self.playback.volume_percent = volume.clamp(0.0, 100.0);
            }
        }

        if let Some(shuffle) = payload::bool_field(data, &["shuffle_enabled", "shuffle"]) {
            self.playback.shuffle = shuffle;
        }
        if let Some(repeat) = payload::str_field(data, &["repeat_mode", "repeat"])
            .and_then(RepeatMode::from_payload_str)
        {
            self.playback.repeat = repeat;
        }
        if let Some(favorite) = payload::bool_field(data, &["favorite", "in_library"]) {
            self.playback.favorite = favorite;
        }
    }

    /// Reset for a newly selected player, keeping only connection state.
    fn reset_for_player(&mut self, player_id: &str) {
        self.epoch += 1;
        self.volume_guard = false;
        self.seek_guard = false;
        self.volume_gen += 1;
        self.seek_gen += 1;
        self.tick_origin = None;
        let connection = self.playback.connection.clone();
        self.playback = PlaybackState {
            player_id: Some(player_id.to_string()),
            connection,
            ..PlaybackState::default()
        };
    }
}

/// Reconciles the selected player's state across pushes, optimistic
/// edits, and the interpolation clock, and issues transport commands.
pub struct PlayerController {
    server: Arc<dyn ServerHandle>,
    state: Arc<RwLock<ReconcilerState>>,
    volume_debounce: Duration,
    seek_debounce: Duration,
    tick_interval: Duration,
    connect_grace: Duration,
    worker: StdMutex<Option<JoinHandle<()>>>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
}

impl PlayerController {
    pub fn new(server: Arc<dyn ServerHandle>, config: &Config) -> Self {
        Self {
            server,
            state: Arc::new(RwLock::new(ReconcilerState::default())),
            volume_debounce: config.volume_debounce(),
            seek_debounce: config.seek_debounce(),
            tick_interval: config.progress_tick(),
            connect_grace: config.connect_grace(),
            worker: StdMutex::new(None),
            ticker: StdMutex::new(None),
        }
    }

    /// Advance `disconnected -> connecting -> {connected | error}`.
    pub async fn connect(&self) -> Result<()> {
        self.state.write().await.playback.connection = ConnectionState::Connecting;
        self.probe().await
    }

    /// If a drop is detected while connected, advance
    /// `connected -> reconnecting -> {connected | error}`.
    pub async fn check_connection(&self) {
        let dropped = {
            let state = self.state.read().await;
            state.playback.connection == ConnectionState::Connected && !self.server.is_connected()
        };
        if dropped {
            tracing::warn!("server connection dropped, reconnecting");
            self.state.write().await.playback.connection = ConnectionState::Reconnecting;
            let _ = self.probe().await;
        }
    }

    async fn probe(&self) -> Result<()> {
        if let Err(e) = self.server.connect().await {
            self.state.write().await.playback.connection = ConnectionState::Error(e.to_string());
            return Err(e);
        }
        // Wait out normal handshake latency before sampling, so a slow
        // connect does not flash an error state.
        tokio::time::sleep(self.connect_grace).await;
        let mut state = self.state.write().await;
        if self.server.is_connected() {
            state.playback.connection = ConnectionState::Connected;
            Ok(())
        } else {
            state.playback.connection =
                ConnectionState::Error("handshake did not complete".to_string());
            Err(SyncError::NoClient)
        }
    }

    /// Select the active player: cancels the previous subscription and
    /// debounce timers, resets the guards, and fetches a fresh baseline
    /// state for the new player.
    pub async fn select_player(&self, player_id: &str) -> Result<()> {
        self.state.write().await.reset_for_player(player_id);
        self.start_worker();
        self.start_ticker();
        self.refresh_state(player_id).await
    }

    /// Tear everything down and return to all-default state.
    pub async fn disconnect(&self) {
        self.stop();
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.volume_guard = false;
        state.seek_guard = false;
        state.tick_origin = None;
        state.playback = PlaybackState::default();
        state.last_error = None;
    }

    /// Cancel the event consumer and interpolation clock.
    pub fn stop(&self) {
        if let Some(worker) = self.worker.lock().unwrap().take() {
            worker.abort();
        }
        if let Some(ticker) = self.ticker.lock().unwrap().take() {
            ticker.abort();
        }
    }

    fn start_worker(&self) {
        let mut worker = self.worker.lock().unwrap();
        if let Some(old) = worker.take() {
            old.abort();
        }

        let mut events = self.server.subscribe(EventChannel::Players);
        let state = Arc::clone(&self.state);
        *worker = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let ServerEvent::Player { player_id, data } = event else {
                    continue;
                };
                let mut state = state.write().await;
                match state.playback.player_id {
                    Some(ref selected) if *selected == player_id => {
                        state.apply_player_update(&data);
                    }
                    _ => {
                        // The loop itself survives non-matching events;
                        // only re-subscription replaces it.
                        tracing::debug!("ignoring event for unselected player {player_id}");
                    }
                }
            }
        }));
    }

    fn start_ticker(&self) {
        let mut ticker = self.ticker.lock().unwrap();
        if let Some(old) = ticker.take() {
            old.abort();
        }

        let state = Arc::clone(&self.state);
        let interval = self.tick_interval;
        *ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let mut state = state.write().await;
                if state.playback.transport != Transport::Playing {
                    continue;
                }
                let Some(origin) = state.tick_origin else {
                    state.tick_origin = Some(Instant::now());
                    continue;
                };
                let elapsed = origin.elapsed().as_secs_f64();
                let mut progress = state.playback.progress_seconds + elapsed;
                if let Some(duration) = state
                    .playback
                    .track
                    .as_ref()
                    .and_then(|track| track.duration_seconds)
                {
                    progress = progress.min(duration as f64);
                }
                state.playback.progress_seconds = progress;
                state.tick_origin = Some(Instant::now());
            }
        }));
    }

    /// Point-in-time state fetch for `player_id`, merged as the new
    /// baseline.
    pub async fn refresh_state(&self, player_id: &str) -> Result<()> {
        let epoch = self.state.read().await.epoch;
        let args = json!({ "player_id": player_id });
        match self.server.send_command("players/get_state", args).await {
            Ok(data) => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    // Player switched while the fetch was in flight.
                    return Ok(());
                }
                state.apply_player_update(&data);
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.last_error = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Optimistic, debounced volume change. Displayed volume updates
    /// immediately; the server sees at most one `set_volume` per debounce
    /// window, carrying the most recent value.
    pub async fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = volume.clamp(0.0, 100.0);
        let (player_id, generation, epoch) = {
            let mut state = self.state.write().await;
            let Some(player_id) = state.playback.player_id.clone() else {
                return Err(SyncError::command_failed("set_volume", "no player selected"));
            };
            state.volume_guard = true;
            state.playback.volume_percent = volume;
            state.pending_volume = volume;
            state.volume_gen += 1;
            (player_id, state.volume_gen, state.epoch)
        };

        let server = Arc::clone(&self.server);
        let state = Arc::clone(&self.state);
        let debounce = self.volume_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let value = {
                let state = state.read().await;
                // A newer drag value restarted the window, or the player
                // changed; this timer is stale.
                if state.epoch != epoch || state.volume_gen != generation {
                    return;
                }
                state.pending_volume
            };

            let result = server
                .send_command(
                    "set_volume",
                    json!({ "player_id": player_id, "volume_level": value }),
                )
                .await;

            let mut state = state.write().await;
            if state.epoch != epoch {
                return;
            }
            if state.volume_gen == generation {
                state.volume_guard = false;
            }
            match result {
                Ok(_) => state.last_error = None,
                Err(e) => {
                    tracing::warn!("set_volume failed: {e}");
                    state.last_error = Some(e);
                }
            }
        });
        Ok(())
    }

    /// Optimistic, debounced seek. Same shape as [`Self::set_volume`]
    /// with a longer window, since scrubbing emits more intermediate
    /// positions.
    pub async fn seek(&self, position_seconds: f64) -> Result<()> {
        let position_seconds = position_seconds.max(0.0);
        let (player_id, generation, epoch) = {
            let mut state = self.state.write().await;
            let Some(player_id) = state.playback.player_id.clone() else {
                return Err(SyncError::command_failed("seek", "no player selected"));
            };
            state.seek_guard = true;
            state.playback.progress_seconds = position_seconds;
            state.pending_seek = position_seconds;
            state.seek_gen += 1;
            if state.playback.transport == Transport::Playing {
                state.tick_origin = Some(Instant::now());
            }
            (player_id, state.seek_gen, state.epoch)
        };

        let server = Arc::clone(&self.server);
        let state = Arc::clone(&self.state);
        let debounce = self.seek_debounce;
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            let value = {
                let state = state.read().await;
                if state.epoch != epoch || state.seek_gen != generation {
                    return;
                }
                state.pending_seek
            };

            let result = server
                .send_command(
                    "seek",
                    json!({ "player_id": player_id, "position": value }),
                )
                .await;

            let mut state = state.write().await;
            if state.epoch != epoch {
                return;
            }
            if state.seek_gen == generation {
                state.seek_guard = false;
            }
            match result {
                Ok(_) => state.last_error = None,
                Err(e) => {
                    tracing::warn!("seek failed: {e}");
                    state.last_error = Some(e);
                }
            }
        });
        Ok(())
    }

    pub async fn play(&self) -> Result<()> {
        self.transport_command("play").await
    }

    pub async fn pause(&self) -> Result<()> {
        self.transport_command("pause").await
    }

    pub async fn stop_playback(&self) -> Result<()> {
        self.transport_command("stop").await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.transport_command("next").await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.transport_command("previous").await
    }

    /// Join this player to `target_player_id`'s group. Group topology is
    /// server-authoritative; the result arrives via the next push.
    pub async fn group_with(&self, target_player_id: &str) -> Result<()> {
        let player_id = self.require_player("group").await?;
        self.require_connection()?;
        let args = json!({ "player_id": player_id, "target_id": target_player_id });
        self.finish("group", self.server.send_command("group", args).await)
            .await
    }

    pub async fn ungroup(&self) -> Result<()> {
        self.transport_command("ungroup").await
    }

    /// Optimistic shuffle toggle. The local value is not rolled back on
    /// failure; the next authoritative push corrects it.
    pub async fn toggle_shuffle(&self) -> Result<bool> {
        let player_id = self.require_player("shuffle").await?;
        self.require_connection()?;
        let desired = {
            let mut state = self.state.write().await;
            state.playback.shuffle = !state.playback.shuffle;
            state.playback.shuffle
        };
        let args = json!({ "player_id": player_id, "shuffle_enabled": desired });
        self.finish("shuffle", self.server.send_command("shuffle", args).await)
            .await?;
        Ok(desired)
    }

    /// Optimistic repeat cycle (off → all → one → off). Not rolled back
    /// on failure.
    pub async fn cycle_repeat(&self) -> Result<RepeatMode> {
        let player_id = self.require_player("repeat").await?;
        self.require_connection()?;
        let desired = {
            let mut state = self.state.write().await;
            state.playback.repeat = state.playback.repeat.cycled();
            state.playback.repeat
        };
        let args = json!({ "player_id": player_id, "repeat_mode": desired.as_str() });
        self.finish("repeat", self.server.send_command("repeat", args).await)
            .await?;
        Ok(desired)
    }

    /// Optimistic favorite toggle for the current track. Not rolled back
    /// on failure.
    pub async fn toggle_favorite(&self) -> Result<bool> {
        self.require_player("favorite").await?;
        self.require_connection()?;
        let (track_id, desired) = {
            let mut state = self.state.write().await;
            let Some(ref track) = state.playback.track else {
                return Err(SyncError::command_failed("favorite", "no current track"));
            };
            let track_id = track.id.clone();
            state.playback.favorite = !state.playback.favorite;
            (track_id, state.playback.favorite)
        };
        let args = json!({ "item_id": track_id, "favorite": desired });
        self.finish(
            "favorite",
            self.server.send_command("music/tracks/favorite", args).await,
        )
        .await?;
        Ok(desired)
    }

    async fn transport_command(&self, name: &str) -> Result<()> {
        let player_id = self.require_player(name).await?;
        self.require_connection()?;
        let args = json!({ "player_id": player_id });
        self.finish(name, self.server.send_command(name, args).await)
            .await
    }

    async fn require_player(&self, operation: &str) -> Result<String> {
        self.state
            .read()
            .await
            .playback
            .player_id
            .clone()
            .ok_or_else(|| SyncError::command_failed(operation, "no player selected"))
    }

    fn require_connection(&self) -> Result<()> {
        if self.server.is_connected() {
            Ok(())
        } else {
            Err(SyncError::NoClient)
        }
    }

    async fn finish(&self, operation: &str, result: Result<Value>) -> Result<()> {
        let mut state = self.state.write().await;
        match result {
            Ok(_) => {
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{operation} failed: {e}");
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Snapshot of displayed playback state.
    pub async fn playback(&self) -> PlaybackState {
        self.state.read().await.playback.clone()
    }

    /// Most recent command-level failure, cleared by the next success.
    pub async fn last_error(&self) -> Option<SyncError> {
        self.state.read().await.last_error.clone()
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        self.stop();
    }
}
