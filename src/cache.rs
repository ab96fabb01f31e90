//! Render cache shared between the watcher and the HTTP layer.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::render;

/// The most recent successful render.
///
/// Serializes to the `/html` wire shape:
/// `{"contents": "<h1>…", "ts": "2026-08-07T12:00:00Z"}`.
#[derive(Debug, Clone, Serialize)]
pub struct Rendered {
    #[serde(rename = "contents")]
    pub html: String,
    #[serde(rename = "ts")]
    pub rendered_at: DateTime<Utc>,
}

/// Single-slot cache holding the latest render.
///
/// The value is replaced wholesale via an atomic pointer swap, so
/// concurrent request handlers see either the old or the new render,
/// never a torn mix. Previous renders are simply dropped.
pub struct RenderCache {
    current: ArcSwap<Rendered>,
}

impl RenderCache {
    /// Empty cache; `/html` serves zero-length contents until the first
    /// successful render lands.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Rendered {
                html: String::new(),
                rendered_at: Utc::now(),
            }),
        }
    }

    /// Render `source` and publish the result. Does not notify anyone;
    /// that is the watcher's job after the swap.
    pub fn update(&self, source: &str) {
        self.current.store(Arc::new(Rendered {
            html: render::render(source),
            rendered_at: Utc::now(),
        }));
    }

    /// Latest render. Never blocks, never fails.
    pub fn current(&self) -> Arc<Rendered> {
        self.current.load_full()
    }
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_publishes_the_render() {
        let cache = RenderCache::new();
        cache.update("# Title");
        assert_eq!(cache.current().html, render::render("# Title"));
    }

    #[test]
    fn starts_empty() {
        let cache = RenderCache::new();
        assert!(cache.current().html.is_empty());
    }

    #[test]
    fn rendered_at_advances_monotonically() {
        let cache = RenderCache::new();
        cache.update("one");
        let first = cache.current().rendered_at;
        std::thread::sleep(std::time::Duration::from_millis(10));
        cache.update("two");
        let second = cache.current().rendered_at;
        assert!(second > first);
    }

    #[test]
    fn current_is_stable_between_updates() {
        let cache = RenderCache::new();
        cache.update("# Title");
        let a = cache.current();
        let b = cache.current();
        assert_eq!(a.html, b.html);
        assert_eq!(a.rendered_at, b.rendered_at);
    }

    #[test]
    fn serializes_to_the_wire_shape() {
        let cache = RenderCache::new();
        cache.update("# Title");
        let value = serde_json::to_value(&*cache.current()).unwrap();
        assert!(value["contents"].as_str().unwrap().contains("<h1>Title</h1>"));
        // ts must be a well-formed ISO-8601 timestamp
        let ts = value["ts"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }
}
