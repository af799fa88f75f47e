//! Client-side state synchronization for a remote media server.
//!
//! Three independently-testable components share one injected server
//! collaborator: [`LibrarySync`] mirrors the media library,
//! [`PlayerController`] reconciles the active player's playback state,
//! and [`QueueSync`] mirrors the upcoming-track queue. Each consumes its
//! own push-event sub-channel and issues its own commands; a
//! presentation layer composes their outputs.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod library;
pub mod model;
pub mod payload;
pub mod player;
pub mod queue;

pub use cache::PageCache;
pub use client::{EventChannel, ServerEvent, ServerHandle};
pub use config::Config;
pub use error::{Result, SyncError};
pub use library::{LibrarySync, PageCursor, PageRequest, SearchResults};
pub use model::{
    Album, Artist, FilterSpec, Genre, MediaItem, MediaKind, Playlist, Provider, Radio,
    SortOption, Track,
};
pub use player::{ConnectionState, PlaybackState, PlayerController, RepeatMode, Transport};
pub use queue::{EnqueueMode, QueueSync};
