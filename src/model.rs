//! Media entity models and their loose-payload constructors.
//!
//! Entities are immutable value snapshots keyed by a server-assigned
//! string id. An update from the server replaces the entity wholesale;
//! nothing here patches individual fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_TITLE: &str = "Unknown";

/// The six media entity kinds the library synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Artist,
    Album,
    Track,
    Playlist,
    Radio,
    Genre,
}

impl MediaKind {
    pub const ALL: [MediaKind; 6] = [
        MediaKind::Artist,
        MediaKind::Album,
        MediaKind::Track,
        MediaKind::Playlist,
        MediaKind::Radio,
        MediaKind::Genre,
    ];

    /// Map a server media-type string to a kind. Unrecognized strings map
    /// to `Track` so event routing is total and never fails.
    pub fn from_media_type(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "artist" | "artists" => MediaKind::Artist,
            "album" | "albums" => MediaKind::Album,
            "track" | "tracks" => MediaKind::Track,
            "playlist" | "playlists" => MediaKind::Playlist,
            "radio" | "radios" => MediaKind::Radio,
            "genre" | "genres" => MediaKind::Genre,
            _ => MediaKind::Track,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Artist => write!(f, "artist"),
            MediaKind::Album => write!(f, "album"),
            MediaKind::Track => write!(f, "track"),
            MediaKind::Playlist => write!(f, "playlist"),
            MediaKind::Radio => write!(f, "radio"),
            MediaKind::Genre => write!(f, "genre"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub artwork_url: Option<String>,
    pub album_count: Option<u64>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub track_count: Option<u64>,
    pub release_year: Option<u64>,
    pub duration_seconds: Option<u64>,
    /// Server-side album classification ("album", "single", "compilation").
    pub album_type: Option<String>,
    pub artwork_url: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_seconds: Option<u64>,
    pub artwork_url: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    pub owner: Option<String>,
    pub track_count: Option<u64>,
    pub duration_seconds: Option<u64>,
    pub artwork_url: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Radio {
    pub id: String,
    pub name: String,
    pub provider: Option<String>,
    pub artwork_url: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub artwork_url: Option<String>,
    pub favorite: bool,
}

/// A music provider instance reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub instance_id: String,
    pub name: String,
    pub domain: Option<String>,
}

impl Provider {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let instance_id = payload::id_field(data, &["instance_id", "item_id", "id"])?;
        let name = payload::string_field(data, &["name", "title"])
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let domain = payload::string_field(data, &["domain", "provider_domain"]);
        Some(Self {
            instance_id,
            name,
            domain,
        })
    }
}

fn favorite_flag(data: &Value) -> bool {
    payload::bool_field(data, &["favorite", "in_library"]).unwrap_or(false)
}

impl Artist {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            name: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            artwork_url: payload::artwork_url(data),
            album_count: payload::u64_field(data, &["album_count", "albums"]),
            favorite: favorite_flag(data),
        })
    }
}

impl Album {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            title: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: payload::artist_name(data).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            track_count: payload::u64_field(data, &["track_count", "num_tracks"]),
            release_year: payload::u64_field(data, &["year", "release_year"]),
            duration_seconds: payload::u64_field(data, &["duration", "length"]),
            album_type: payload::string_field(data, &["album_type", "type"]),
            artwork_url: payload::artwork_url(data),
            favorite: favorite_flag(data),
        })
    }
}

impl Track {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            title: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: payload::artist_name(data).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: payload::album_title(data).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration_seconds: payload::u64_field(data, &["duration", "length"]),
            artwork_url: payload::artwork_url(data),
            favorite: favorite_flag(data),
        })
    }
}

impl Playlist {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            title: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            owner: payload::string_field(data, &["owner", "owner_name"]),
            track_count: payload::u64_field(data, &["track_count", "num_tracks"]),
            duration_seconds: payload::u64_field(data, &["duration", "length"]),
            artwork_url: payload::artwork_url(data),
            favorite: favorite_flag(data),
        })
    }
}

impl Radio {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            name: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            provider: payload::string_field(data, &["provider", "provider_name"]),
            artwork_url: payload::artwork_url(data),
            favorite: favorite_flag(data),
        })
    }
}

impl Genre {
    pub fn from_payload(data: &Value) -> Option<Self> {
        let id = payload::id_field(data, &["item_id", "id"])?;
        Some(Self {
            id,
            name: payload::string_field(data, &["name", "title"])
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artwork_url: payload::artwork_url(data),
            favorite: favorite_flag(data),
        })
    }
}

/// A media entity of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaItem {
    Artist(Artist),
    Album(Album),
    Track(Track),
    Playlist(Playlist),
    Radio(Radio),
    Genre(Genre),
}

impl MediaItem {
    /// Parse a server payload into the entity shape for `kind`. Returns
    /// `None` for malformed payloads (missing id, non-object values).
    pub fn from_payload(kind: MediaKind, data: &Value) -> Option<Self> {
        if !data.is_object() {
            return None;
        }
        match kind {
            MediaKind::Artist => Artist::from_payload(data).map(MediaItem::Artist),
            MediaKind::Album => Album::from_payload(data).map(MediaItem::Album),
            MediaKind::Track => Track::from_payload(data).map(MediaItem::Track),
            MediaKind::Playlist => Playlist::from_payload(data).map(MediaItem::Playlist),
            MediaKind::Radio => Radio::from_payload(data).map(MediaItem::Radio),
            MediaKind::Genre => Genre::from_payload(data).map(MediaItem::Genre),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            MediaItem::Artist(a) => &a.id,
            MediaItem::Album(a) => &a.id,
            MediaItem::Track(t) => &t.id,
            MediaItem::Playlist(p) => &p.id,
            MediaItem::Radio(r) => &r.id,
            MediaItem::Genre(g) => &g.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaItem::Artist(_) => MediaKind::Artist,
            MediaItem::Album(_) => MediaKind::Album,
            MediaItem::Track(_) => MediaKind::Track,
            MediaItem::Playlist(_) => MediaKind::Playlist,
            MediaItem::Radio(_) => MediaKind::Radio,
            MediaItem::Genre(_) => MediaKind::Genre,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            MediaItem::Artist(a) => &a.name,
            MediaItem::Album(a) => &a.title,
            MediaItem::Track(t) => &t.title,
            MediaItem::Playlist(p) => &p.title,
            MediaItem::Radio(r) => &r.name,
            MediaItem::Genre(g) => &g.name,
        }
    }

    pub fn release_year(&self) -> Option<u64> {
        match self {
            MediaItem::Album(a) => a.release_year,
            _ => None,
        }
    }

    pub fn favorite(&self) -> bool {
        match self {
            MediaItem::Artist(a) => a.favorite,
            MediaItem::Album(a) => a.favorite,
            MediaItem::Track(t) => t.favorite,
            MediaItem::Playlist(p) => p.favorite,
            MediaItem::Radio(r) => r.favorite,
            MediaItem::Genre(g) => g.favorite,
        }
    }

    pub fn set_favorite(&mut self, favorite: bool) {
        match self {
            MediaItem::Artist(a) => a.favorite = favorite,
            MediaItem::Album(a) => a.favorite = favorite,
            MediaItem::Track(t) => t.favorite = favorite,
            MediaItem::Playlist(p) => p.favorite = favorite,
            MediaItem::Radio(r) => r.favorite = favorite,
            MediaItem::Genre(g) => g.favorite = favorite,
        }
    }
}

/// Display sort order for library reads and paginated fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    Name,
    NameDesc,
    Year,
    YearDesc,
}

impl SortOption {
    /// Wire encoding for the `order_by` command argument. Doubles as the
    /// sort component of cache keys.
    pub fn order_by(&self) -> &'static str {
        match self {
            SortOption::Name => "name",
            SortOption::NameDesc => "name_desc",
            SortOption::Year => "year",
            SortOption::YearDesc => "year_desc",
        }
    }
}

/// Filter specification for library fetches. The serialized form is part
/// of the cache key, so two filters that differ in any component never
/// collide.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterSpec {
    pub favorite_only: bool,
    pub search: Option<String>,
    /// Context qualifier: restrict to a parent artist.
    pub artist_id: Option<String>,
    /// Context qualifier: restrict to a parent album.
    pub album_id: Option<String>,
}

impl FilterSpec {
    pub fn favorites() -> Self {
        Self {
            favorite_only: true,
            ..Self::default()
        }
    }

    pub fn for_artist(artist_id: impl Into<String>) -> Self {
        Self {
            artist_id: Some(artist_id.into()),
            ..Self::default()
        }
    }

    pub fn for_album(album_id: impl Into<String>) -> Self {
        Self {
            album_id: Some(album_id.into()),
            ..Self::default()
        }
    }

    pub fn for_search(query: impl Into<String>) -> Self {
        Self {
            search: Some(query.into()),
            ..Self::default()
        }
    }

    /// Serialized filter + context component of the cache key.
    pub fn cache_token(&self) -> String {
        format!(
            "fav={}|search={}|artist={}|album={}",
            self.favorite_only,
            self.search.as_deref().unwrap_or(""),
            self.artist_id.as_deref().unwrap_or(""),
            self.album_id.as_deref().unwrap_or(""),
        )
    }

    /// Encode the filter into command arguments.
    pub fn apply_args(&self, args: &mut serde_json::Map<String, Value>) {
        if self.favorite_only {
            args.insert("favorite".to_string(), Value::Bool(true));
        }
        if let Some(ref search) = self.search {
            args.insert("search".to_string(), Value::String(search.clone()));
        }
        if let Some(ref artist_id) = self.artist_id {
            args.insert("artist".to_string(), Value::String(artist_id.clone()));
        }
        if let Some(ref album_id) = self.album_id {
            args.insert("album".to_string(), Value::String(album_id.clone()));
        }
    }
}
