//! Fallback-field readers for loosely-typed server payloads.
//!
//! The server has used several field names for the same concept across
//! protocol revisions (`name` vs `title`, a plural `artists` array vs a
//! singular `artist` string). Readers here try each candidate in a fixed
//! order; the order is part of the protocol contract and must not be
//! collapsed to a single field name.

use serde_json::Value;

/// First string value found under any of `keys`, in order.
pub fn str_field<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
}

/// Owned variant of [`str_field`].
pub fn string_field(value: &Value, keys: &[&str]) -> Option<String> {
    str_field(value, keys).map(str::to_string)
}

/// First unsigned integer found under any of `keys`. Accepts both integer
/// and float encodings, which the server mixes for counts and durations.
pub fn u64_field(value: &Value, keys: &[&str]) -> Option<u64> {
    keys.iter().find_map(|key| {
        let v = value.get(key)?;
        v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64))
    })
}

/// First float found under any of `keys`. Accepts integer encodings.
pub fn f64_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| value.get(key).and_then(Value::as_f64))
}

/// First bool found under any of `keys`.
pub fn bool_field(value: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .find_map(|key| value.get(key).and_then(Value::as_bool))
}

/// Item identifier: `item_id`, then `id`. Numeric ids are stringified.
pub fn id_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let v = value.get(key)?;
        match v {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    })
}

/// Attributed artist name. Tries the plural `artists` array first (entries
/// may be objects with a name or plain strings), then the singular
/// `artist` field (object or string).
pub fn artist_name(value: &Value) -> Option<String> {
    if let Some(artists) = value.get("artists").and_then(Value::as_array) {
        if let Some(first) = artists.first() {
            match first {
                Value::Object(_) => {
                    if let Some(name) = string_field(first, &["name", "title"]) {
                        return Some(name);
                    }
                }
                Value::String(s) if !s.is_empty() => return Some(s.clone()),
                _ => {}
            }
        }
    }

    match value.get("artist") {
        Some(Value::Object(_)) => string_field(value.get("artist")?, &["name", "title"]),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Album title attribution: `album` as an object with a name, or a string.
pub fn album_title(value: &Value) -> Option<String> {
    match value.get("album") {
        Some(Value::Object(_)) => string_field(value.get("album")?, &["name", "title"]),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Artwork reference: `image`, then `image_url`, then the first entry of
/// `metadata.images`.
pub fn artwork_url(value: &Value) -> Option<String> {
    if let Some(url) = string_field(value, &["image", "image_url"]) {
        return Some(url);
    }
    value
        .get("metadata")
        .and_then(|m| m.get("images"))
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|img| match img {
            Value::Object(_) => string_field(img, &["url", "path"]),
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
}

/// Normalize a list-shaped response. The server answers some commands
/// with a bare array and others with an object carrying an `items` key;
/// both map to the same list here.
pub fn item_list(value: &Value) -> Option<&Vec<Value>> {
    if let Some(list) = value.as_array() {
        return Some(list);
    }
    value.get("items").and_then(Value::as_array)
}
