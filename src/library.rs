//! Library synchronizer.
//!
//! Keeps one key→entity map per media kind consistent with the server:
//! push events provide live correctness, a time-boxed cache absorbs
//! repeated first-page fetches, and a pagination cursor tracks the
//! current (kind, sort, filter) view. Display ordering is computed on
//! read and never stored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::cache::PageCache;
use crate::client::{EventChannel, ServerEvent, ServerHandle};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::model::{FilterSpec, MediaItem, MediaKind, Provider, SortOption};
use crate::payload;

/// One paginated fetch of a library view.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub kind: MediaKind,
    pub sort: SortOption,
    pub filter: FilterSpec,
    pub offset: usize,
    pub limit: usize,
    pub force_refresh: bool,
}

impl PageRequest {
    pub fn first(kind: MediaKind, limit: usize) -> Self {
        Self {
            kind,
            sort: SortOption::default(),
            filter: FilterSpec::default(),
            offset: 0,
            limit,
            force_refresh: false,
        }
    }
}

/// Pagination cursor for the current (kind, sort, filter) view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageCursor {
    pub offset: usize,
    pub page_size: usize,
    pub has_more: bool,
}

/// Per-kind result buckets from a search command.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub artists: Vec<MediaItem>,
    pub albums: Vec<MediaItem>,
    pub tracks: Vec<MediaItem>,
    pub playlists: Vec<MediaItem>,
    pub radios: Vec<MediaItem>,
}

struct LibraryState {
    collections: HashMap<MediaKind, HashMap<String, MediaItem>>,
    cache: PageCache,
    cursor: PageCursor,
    cursor_scope: Option<(MediaKind, SortOption, FilterSpec)>,
    last_error: Option<SyncError>,
}

impl LibraryState {
    fn new(config: &Config) -> Self {
        let mut collections = HashMap::new();
        for kind in MediaKind::ALL {
            collections.insert(kind, HashMap::new());
        }
        Self {
            collections,
            cache: PageCache::new(config.cache_ttl()),
            cursor: PageCursor::default(),
            cursor_scope: None,
            last_error: None,
        }
    }

    fn upsert(&mut self, item: MediaItem) {
        self.collections
            .get_mut(&item.kind())
            .expect("collections cover every kind")
            .insert(item.id().to_string(), item);
    }

    fn apply_media_event(&mut self, action: &str, media_type: &str, item_id: &str, data: &Value) {
        let kind = MediaKind::from_media_type(media_type);
        match action {
            "added" | "updated" => match MediaItem::from_payload(kind, data) {
                Some(item) => self.upsert(item),
                None => {
                    tracing::warn!("dropping malformed {kind} payload for event {action}");
                }
            },
            "deleted" => {
                // No-op when the id was never present.
                self.collections
                    .get_mut(&kind)
                    .expect("collections cover every kind")
                    .remove(item_id);
            }
            "played" => {
                tracing::debug!("{kind} {item_id} played");
            }
            _ => {
                tracing::warn!("ignoring media event with unknown action {action:?}");
            }
        }
    }
}

/// Client-side view of the server's media library.
pub struct LibrarySync {
    server: Arc<dyn ServerHandle>,
    state: Arc<RwLock<LibraryState>>,
    worker: StdMutex<Option<JoinHandle<()>>>,
}

impl LibrarySync {
    pub fn new(server: Arc<dyn ServerHandle>, config: &Config) -> Self {
        Self {
            server,
            state: Arc::new(RwLock::new(LibraryState::new(config))),
            worker: StdMutex::new(None),
        }
    }

    /// Start (or restart) the push-event consumer. The previous worker is
    /// cancelled first so two consumers of the channel never coexist.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if let Some(old) = worker.take() {
            old.abort();
        }

        let mut events = self.server.subscribe(EventChannel::MediaItems);
        let state = Arc::clone(&self.state);
        *worker = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let ServerEvent::MediaItem {
                    action,
                    media_type,
                    item_id,
                    data,
                } = event
                {
                    state
                        .write()
                        .await
                        .apply_media_event(&action, &media_type, &item_id, &data);
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

    /// Fetch one page of a library view.
    ///
    /// First pages are served from the cache when live; continuation
    /// pages always hit the server. Changing sort or filter resets the
    /// pagination cursor before the fetch.
    pub async fn fetch_page(&self, request: PageRequest) -> Result<Vec<MediaItem>> {
        let scope = (request.kind, request.sort, request.filter.clone());
        let key = PageCache::cache_key(request.kind, request.sort, &request.filter);

        {
            let mut state = self.state.write().await;
            if state.cursor_scope.as_ref() != Some(&scope) {
                state.cursor = PageCursor::default();
                state.cursor_scope = Some(scope.clone());
            }

            if request.offset == 0 && !request.force_refresh {
                if let Some(items) = state.cache.get(&key) {
                    tracing::debug!(
                        "serving {} {} first page from cache",
                        items.len(),
                        request.kind
                    );
                    for item in &items {
                        state.upsert(item.clone());
                    }
                    state.cursor = PageCursor {
                        offset: items.len(),
                        page_size: request.limit,
                        has_more: items.len() == request.limit,
                    };
                    state.last_error = None;
                    return Ok(items);
                }
            }
        }

        let mut args = serde_json::Map::new();
        args.insert("limit".to_string(), json!(request.limit));
        args.insert("offset".to_string(), json!(request.offset));
        args.insert("order_by".to_string(), json!(request.sort.order_by()));
        request.filter.apply_args(&mut args);

        let command = format!("music/{}s/library_items", request.kind);
        let response = match self.server.send_command(&command, Value::Object(args)).await {
            Ok(response) => response,
            Err(e) => {
                self.state.write().await.last_error = Some(e.clone());
                return Err(e);
            }
        };

        let raw = match payload::item_list(&response) {
            Some(raw) => raw.clone(),
            None => {
                let e = SyncError::parse(format!("{command} returned a non-list response"));
                self.state.write().await.last_error = Some(e.clone());
                return Err(e);
            }
        };

        // Per-entity parse failures are skipped; the rest of the batch
        // still lands. The cursor tracks the server's count, not ours.
        let items: Vec<MediaItem> = raw
            .iter()
            .filter_map(|entry| MediaItem::from_payload(request.kind, entry))
            .collect();
        if items.len() < raw.len() {
            tracing::warn!(
                "skipped {} malformed {} entries",
                raw.len() - items.len(),
                request.kind
            );
        }

        let mut state = self.state.write().await;
        for item in &items {
            state.upsert(item.clone());
        }
        if request.offset == 0 {
            state.cache.insert(key, items.clone());
        }
        state.cursor = PageCursor {
            offset: request.offset + raw.len(),
            page_size: request.limit,
            has_more: raw.len() == request.limit,
        };
        state.last_error = None;
        Ok(items)
    }

    /// Toggle an entity's favorite flag on the server.
    ///
    /// Requires the entity to be known locally. On success the whole page
    /// cache is invalidated; favorites slice through every cached view
    /// and the coarse clear is the documented policy.
    pub async fn set_favorite(&self, kind: MediaKind, item_id: &str, favorite: bool) -> Result<()> {
        {
            let state = self.state.read().await;
            if !state.collections[&kind].contains_key(item_id) {
                return Err(SyncError::not_found(kind, item_id));
            }
        }

        let command = format!("music/{kind}s/favorite");
        let args = json!({ "item_id": item_id, "favorite": favorite });
        match self.server.send_command(&command, args).await {
            Ok(_) => {
                let mut state = self.state.write().await;
                state.cache.invalidate_all();
                if let Some(item) = state
                    .collections
                    .get_mut(&kind)
                    .and_then(|map| map.get_mut(item_id))
                {
                    item.set_favorite(favorite);
                }
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.state.write().await.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Search the server across all kinds. Results are merged into the
    /// live collections, and each non-empty bucket is cached as the first
    /// page of the equivalent search-filtered view.
    pub async fn search(&self, query: &str, limit: usize) -> Result<SearchResults> {
        let args = json!({ "search": query, "limit": limit });
        let response = match self.server.send_command("music/search", args).await {
            Ok(response) => response,
            Err(e) => {
                self.state.write().await.last_error = Some(e.clone());
                return Err(e);
            }
        };

        let bucket = |keys: &[&str], kind: MediaKind| -> Vec<MediaItem> {
            keys.iter()
                .find_map(|key| response.get(key).and_then(Value::as_array))
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| MediaItem::from_payload(kind, entry))
                        .collect()
                })
                .unwrap_or_default()
        };

        let results = SearchResults {
            artists: bucket(&["artists"], MediaKind::Artist),
            albums: bucket(&["albums"], MediaKind::Album),
            tracks: bucket(&["tracks"], MediaKind::Track),
            playlists: bucket(&["playlists"], MediaKind::Playlist),
            radios: bucket(&["radio", "radios"], MediaKind::Radio),
        };

        let mut state = self.state.write().await;
        let filter = FilterSpec::for_search(query);
        for (kind, items) in [
            (MediaKind::Artist, &results.artists),
            (MediaKind::Album, &results.albums),
            (MediaKind::Track, &results.tracks),
            (MediaKind::Playlist, &results.playlists),
            (MediaKind::Radio, &results.radios),
        ] {
            for item in items {
                state.upsert(item.clone());
            }
            if !items.is_empty() {
                let key = PageCache::cache_key(kind, SortOption::default(), &filter);
                state.cache.insert(key, items.clone());
            }
        }
        state.last_error = None;
        Ok(results)
    }

    /// List the server's music providers. Cheap and rarely called, so
    /// never cached.
    pub async fn providers(&self) -> Result<Vec<Provider>> {
        let response = match self.server.send_command("music/providers", json!({})).await {
            Ok(response) => response,
            Err(e) => {
                self.state.write().await.last_error = Some(e.clone());
                return Err(e);
            }
        };

        let raw = payload::item_list(&response).cloned().unwrap_or_default();
        let providers = raw.iter().filter_map(Provider::from_payload).collect();
        self.state.write().await.last_error = None;
        Ok(providers)
    }

    /// Snapshot of a collection, ordered by display name.
    pub async fn items(&self, kind: MediaKind) -> Vec<MediaItem> {
        self.items_sorted(kind, SortOption::Name).await
    }

    /// Snapshot of a collection under an explicit sort option.
    pub async fn items_sorted(&self, kind: MediaKind, sort: SortOption) -> Vec<MediaItem> {
        let state = self.state.read().await;
        let mut items: Vec<MediaItem> = state.collections[&kind].values().cloned().collect();
        match sort {
            SortOption::Name => {
                items.sort_by(|a, b| {
                    a.display_name()
                        .to_lowercase()
                        .cmp(&b.display_name().to_lowercase())
                });
            }
            SortOption::NameDesc => {
                items.sort_by(|a, b| {
                    b.display_name()
                        .to_lowercase()
                        .cmp(&a.display_name().to_lowercase())
                });
            }
            SortOption::Year => {
                items.sort_by_key(|item| (item.release_year().is_none(), item.release_year()));
            }
            SortOption::YearDesc => {
                items.sort_by_key(|item| {
                    (item.release_year().is_none(), std::cmp::Reverse(item.release_year()))
                });
            }
        }
        items
    }

    pub async fn item(&self, kind: MediaKind, item_id: &str) -> Option<MediaItem> {
        self.state.read().await.collections[&kind].get(item_id).cloned()
    }

    pub async fn cursor(&self) -> PageCursor {
        self.state.read().await.cursor
    }

    /// Most recent command-level failure, cleared by the next success.
    pub async fn last_error(&self) -> Option<SyncError> {
        self.state.read().await.last_error.clone()
    }
}

impl Drop for LibrarySync {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::MockServer;

    fn library(server: &Arc<MockServer>) -> LibrarySync {
        LibrarySync::new(Arc::clone(server) as Arc<dyn ServerHandle>, &Config::default())
    }

    fn artist_payload(id: &str, name: &str) -> Value {
        json!({ "item_id": id, "name": name })
    }

    fn artist_page(count: usize, offset: usize) -> Value {
        let items: Vec<Value> = (0..count)
            .map(|i| artist_payload(&format!("ar-{}", offset + i), &format!("Artist {}", offset + i)))
            .collect();
        json!({ "items": items })
    }

    async fn apply_event(sync: &LibrarySync, action: &str, media_type: &str, id: &str, data: Value) {
        sync.state
            .write()
            .await
            .apply_media_event(action, media_type, id, &data);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);

        let data = artist_payload("ar-1", "Nina");
        apply_event(&sync, "added", "artist", "ar-1", data.clone()).await;
        apply_event(&sync, "added", "artist", "ar-1", data).await;

        let items = sync.items(MediaKind::Artist).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].display_name(), "Nina");
    }

    #[tokio::test]
    async fn test_update_replaces_wholesale() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);

        apply_event(&sync, "added", "album", "al-1", json!({ "item_id": "al-1", "name": "Demo", "year": 1999 })).await;
        // The update payload has no year: the entity is replaced, not patched.
        apply_event(&sync, "updated", "album", "al-1", json!({ "item_id": "al-1", "name": "Demo (Remaster)" })).await;

        let item = sync.item(MediaKind::Album, "al-1").await.unwrap();
        assert_eq!(item.display_name(), "Demo (Remaster)");
        assert_eq!(item.release_year(), None);
    }

    #[tokio::test]
    async fn test_delete_is_absorbing() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);

        // Delete of an unknown id is a no-op.
        apply_event(&sync, "deleted", "track", "t-1", Value::Null).await;
        assert!(sync.items(MediaKind::Track).await.is_empty());

        // A subsequent add for the same id succeeds normally.
        apply_event(&sync, "added", "track", "t-1", json!({ "item_id": "t-1", "name": "Back" })).await;
        assert_eq!(sync.items(MediaKind::Track).await.len(), 1);

        apply_event(&sync, "deleted", "track", "t-1", Value::Null).await;
        assert!(sync.items(MediaKind::Track).await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_and_unknown_events_are_dropped() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);

        apply_event(&sync, "added", "artist", "x", json!({ "name": "no id" })).await;
        apply_event(&sync, "played", "track", "t-1", Value::Null).await;
        apply_event(&sync, "exploded", "artist", "x", artist_payload("x", "X")).await;

        assert!(sync.items(MediaKind::Artist).await.is_empty());
        assert!(sync.items(MediaKind::Track).await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_media_type_routes_to_tracks() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);

        apply_event(&sync, "added", "podcast", "p-1", json!({ "item_id": "p-1", "name": "Ep 1" })).await;
        assert_eq!(sync.items(MediaKind::Track).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_applies_pushed_events() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        sync.start();

        server.emit(
            EventChannel::MediaItems,
            ServerEvent::MediaItem {
                action: "added".to_string(),
                media_type: "artist".to_string(),
                item_id: "ar-1".to_string(),
                data: artist_payload("ar-1", "Pushed"),
            },
        );
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(sync.items(MediaKind::Artist).await.len(), 1);
        sync.stop();
    }

    #[tokio::test]
    async fn test_pagination_scenario() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/artists/library_items", Ok(artist_page(50, 0)));
        server.push_response("music/artists/library_items", Ok(artist_page(30, 50)));

        let page1 = sync
            .fetch_page(PageRequest::first(MediaKind::Artist, 50))
            .await
            .unwrap();
        assert_eq!(page1.len(), 50);
        assert_eq!(
            sync.cursor().await,
            PageCursor { offset: 50, page_size: 50, has_more: true }
        );

        let page2 = sync
            .fetch_page(PageRequest {
                offset: 50,
                ..PageRequest::first(MediaKind::Artist, 50)
            })
            .await
            .unwrap();
        assert_eq!(page2.len(), 30);
        assert_eq!(
            sync.cursor().await,
            PageCursor { offset: 80, page_size: 50, has_more: false }
        );

        assert_eq!(sync.items(MediaKind::Artist).await.len(), 80);
    }

    #[tokio::test]
    async fn test_first_page_cache_hit_skips_network() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/artists/library_items", Ok(artist_page(3, 0)));

        let request = PageRequest::first(MediaKind::Artist, 50);
        sync.fetch_page(request.clone()).await.unwrap();
        assert_eq!(server.sent_named("music/artists/library_items").len(), 1);

        // Second fetch of the same view is served from cache.
        let cached = sync.fetch_page(request.clone()).await.unwrap();
        assert_eq!(cached.len(), 3);
        assert_eq!(server.sent_named("music/artists/library_items").len(), 1);

        // force_refresh bypasses the cache.
        server.push_response("music/artists/library_items", Ok(artist_page(3, 0)));
        sync.fetch_page(PageRequest {
            force_refresh: true,
            ..request
        })
        .await
        .unwrap();
        assert_eq!(server.sent_named("music/artists/library_items").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_cache_triggers_network_fetch() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/artists/library_items", Ok(artist_page(3, 0)));
        server.push_response("music/artists/library_items", Ok(artist_page(3, 0)));

        let request = PageRequest::first(MediaKind::Artist, 50);
        sync.fetch_page(request.clone()).await.unwrap();

        tokio::time::advance(Config::default().cache_ttl() + std::time::Duration::from_millis(1))
            .await;
        sync.fetch_page(request).await.unwrap();
        assert_eq!(server.sent_named("music/artists/library_items").len(), 2);
    }

    #[tokio::test]
    async fn test_filter_change_resets_cursor() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/albums/library_items", Ok(artist_page(50, 0)));
        server.push_response("music/albums/library_items", Ok(artist_page(50, 50)));

        let by_year = PageRequest {
            sort: SortOption::Year,
            ..PageRequest::first(MediaKind::Album, 50)
        };
        sync.fetch_page(by_year.clone()).await.unwrap();
        sync.fetch_page(PageRequest {
            offset: 50,
            ..by_year.clone()
        })
        .await
        .unwrap();
        assert_eq!(sync.cursor().await.offset, 100);

        // Switching to a favorites-only filter resets the cursor before
        // the first page under the new filter returns.
        server.push_response(
            "music/albums/library_items",
            Err(SyncError::network("unreachable")),
        );
        let favorites = PageRequest {
            filter: FilterSpec::favorites(),
            ..by_year
        };
        assert!(sync.fetch_page(favorites).await.is_err());
        assert_eq!(sync.cursor().await, PageCursor::default());
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_collection_and_records_error() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/artists/library_items", Ok(artist_page(2, 0)));
        sync.fetch_page(PageRequest::first(MediaKind::Artist, 50))
            .await
            .unwrap();
        assert!(sync.last_error().await.is_none());

        server.push_response(
            "music/artists/library_items",
            Err(SyncError::network("timeout")),
        );
        let result = sync
            .fetch_page(PageRequest {
                force_refresh: true,
                ..PageRequest::first(MediaKind::Artist, 50)
            })
            .await;
        assert!(matches!(result, Err(SyncError::Network(_))));
        assert_eq!(sync.items(MediaKind::Artist).await.len(), 2);
        assert!(matches!(sync.last_error().await, Some(SyncError::Network(_))));

        // The next success clears the retained error.
        server.push_response("music/artists/library_items", Ok(artist_page(2, 0)));
        sync.fetch_page(PageRequest {
            force_refresh: true,
            ..PageRequest::first(MediaKind::Artist, 50)
        })
        .await
        .unwrap();
        assert!(sync.last_error().await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_entries_skipped_in_batch() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response(
            "music/tracks/library_items",
            Ok(json!([
                { "item_id": "t-1", "name": "Good" },
                { "name": "missing id" },
                { "item_id": "t-2", "title": "Also Good" },
            ])),
        );

        let items = sync
            .fetch_page(PageRequest::first(MediaKind::Track, 50))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_set_favorite_invalidates_cache_and_flags_item() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response("music/artists/library_items", Ok(artist_page(2, 0)));
        sync.fetch_page(PageRequest::first(MediaKind::Artist, 50))
            .await
            .unwrap();

        sync.set_favorite(MediaKind::Artist, "ar-0", true).await.unwrap();
        assert!(sync.item(MediaKind::Artist, "ar-0").await.unwrap().favorite());
        let args = sync_favorite_args(&server);
        assert_eq!(args[0]["item_id"], json!("ar-0"));
        assert_eq!(args[0]["favorite"], json!(true));

        // Cache was cleared: refetching the first page goes to the server.
        server.push_response("music/artists/library_items", Ok(artist_page(2, 0)));
        sync.fetch_page(PageRequest::first(MediaKind::Artist, 50))
            .await
            .unwrap();
        assert_eq!(server.sent_named("music/artists/library_items").len(), 2);
    }

    fn sync_favorite_args(server: &MockServer) -> Vec<Value> {
        server.sent_named("music/artists/favorite")
    }

    #[tokio::test]
    async fn test_set_favorite_unknown_item_is_not_found() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        let result = sync.set_favorite(MediaKind::Album, "missing", true).await;
        assert_eq!(
            result,
            Err(SyncError::not_found(MediaKind::Album, "missing"))
        );
        // Nothing was sent for a locally-unknown target.
        assert!(server.sent().is_empty());
    }

    #[tokio::test]
    async fn test_search_populates_collections_and_cache() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response(
            "music/search",
            Ok(json!({
                "artists": [{ "item_id": "ar-1", "name": "Found Artist" }],
                "tracks": [{ "item_id": "t-1", "name": "Found Track" }],
                "albums": [],
            })),
        );

        let results = sync.search("found", 20).await.unwrap();
        assert_eq!(results.artists.len(), 1);
        assert_eq!(results.tracks.len(), 1);
        assert!(results.albums.is_empty());
        assert_eq!(sync.items(MediaKind::Artist).await.len(), 1);

        // The artist bucket is cached as the first page of the
        // equivalent search-filtered view.
        let cached = sync
            .fetch_page(PageRequest {
                filter: FilterSpec::for_search("found"),
                ..PageRequest::first(MediaKind::Artist, 20)
            })
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
        assert!(server.sent_named("music/artists/library_items").is_empty());
    }

    #[tokio::test]
    async fn test_providers_listing() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        server.push_response(
            "music/providers",
            Ok(json!([
                { "instance_id": "tunein--1", "name": "TuneIn", "domain": "tunein" },
                { "name": "malformed, no id" },
            ])),
        );

        let providers = sync.providers().await.unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "TuneIn");
    }

    #[tokio::test]
    async fn test_items_sorted_by_year_and_name() {
        let server = Arc::new(MockServer::new());
        let sync = library(&server);
        apply_event(&sync, "added", "album", "al-1", json!({ "item_id": "al-1", "name": "Beta", "year": 2001 })).await;
        apply_event(&sync, "added", "album", "al-2", json!({ "item_id": "al-2", "name": "alpha", "year": 1999 })).await;
        apply_event(&sync, "added", "album", "al-3", json!({ "item_id": "al-3", "name": "Gamma" })).await;

        let by_name = sync.items(MediaKind::Album).await;
        assert_eq!(by_name[0].display_name(), "alpha");
        assert_eq!(by_name[1].display_name(), "Beta");

        let by_year = sync.items_sorted(MediaKind::Album, SortOption::Year).await;
        assert_eq!(by_year[0].release_year(), Some(1999));
        assert_eq!(by_year[1].release_year(), Some(2001));
        // Albums without a year sort last.
        assert_eq!(by_year[2].release_year(), None);
    }
}
