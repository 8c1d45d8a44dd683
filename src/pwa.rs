//! PWA manifest and precache service worker.
//!
//! Favicon rasterization into `icon-192.png`/`icon-512.png` is left to an
//! external image pipeline; this module only ever emits a manifest without
//! icon entries.

use std::collections::BTreeSet;

use crate::assets::content_hash;
use crate::config::Config;

/// `manifest.json` contents: name, a 12-character `short_name`, scope and
/// start URL honoring the base path, and a theme color falling back to
/// the default accent.
pub fn manifest(config: &Config) -> String {
    let base_path = config.base_path();
    let start_url = if base_path.is_empty() {
        "/".to_string()
    } else {
        format!("{base_path}/")
    };
    let short_name: String = config.title.chars().take(12).collect();
    let theme_color = config.accent_color.as_deref().unwrap_or("#3b82f6");

    format!(
        r##"{{"name":{:?},"short_name":{:?},"start_url":{:?},"scope":{:?},"display":"standalone","background_color":"#ffffff","theme_color":{:?}}}"##,
        config.title, short_name, start_url, start_url, theme_color
    )
}

/// `sw.js` contents: precaches the sorted union of page and asset URLs
/// under a cache name derived from an 8-hex hash of that URL list, so an
/// unchanged URL set reuses (and an changed one invalidates) the cache.
pub fn service_worker(urls: &BTreeSet<String>) -> String {
    let joined = urls.iter().cloned().collect::<Vec<_>>().join("\n");
    let hash = content_hash(joined.as_bytes());
    let cache_name = format!("volcano-cache-{hash}");

    let urls_json = format!(
        "[{}]",
        urls.iter().map(|u| format!("{u:?}")).collect::<Vec<_>>().join(",")
    );

    format!(
        r#"const CACHE_NAME = "{cache_name}";
const PRECACHE_URLS = {urls_json};

self.addEventListener("install", (event) => {{
  event.waitUntil(
    caches.open(CACHE_NAME).then((cache) => cache.addAll(PRECACHE_URLS))
  );
}});

self.addEventListener("activate", (event) => {{
  event.waitUntil(
    caches.keys().then((names) =>
      Promise.all(
        names
          .filter((name) => name.startsWith("volcano-cache-") && name !== CACHE_NAME)
          .map((name) => caches.delete(name))
      )
    )
  );
}});

self.addEventListener("fetch", (event) => {{
  if (event.request.method !== "GET") return;
  event.respondWith(
    caches.match(event.request).then((cached) => {{
      if (cached) return cached;
      return fetch(event.request).then((response) => {{
        if (response.ok && new URL(event.request.url).origin === self.location.origin) {{
          const copy = response.clone();
          caches.open(CACHE_NAME).then((cache) => cache.put(event.request, copy));
        }}
        return response;
      }});
    }})
  );
}});
"#
    )
}
