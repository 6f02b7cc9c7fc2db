//! Gallery and hero image normalization.

use serde_json::Value;

use crate::text::is_valid_image_url;

/// Flatten a scraped gallery into an ordered list of URLs.
///
/// Elements may be bare strings or objects carrying an `image` string;
/// anything else, and empty strings, are dropped. Order is preserved and
/// duplicates are kept. A non-array input yields an empty list.
pub fn normalize_gallery(items: &Value) -> Vec<String> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(gallery_entry_url)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn gallery_entry_url(item: &Value) -> Option<&str> {
    match item {
        Value::String(url) => Some(url.as_str()),
        Value::Object(obj) => obj.get("image").and_then(Value::as_str),
        _ => None,
    }
}

/// Hero images: only string entries that pass [`is_valid_image_url`].
pub fn normalize_hero_images(items: &Value) -> Vec<String> {
    let Some(items) = items.as_array() else {
        return Vec::new();
    };

    let kept: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .filter(|url| is_valid_image_url(url))
        .map(str::to_string)
        .collect();

    if kept.len() < items.len() {
        tracing::debug!(
            dropped = items.len() - kept.len(),
            "discarded invalid hero image entries"
        );
    }

    kept
}
