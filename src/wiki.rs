//! Pre-parse resolution of `[[wiki link]]` references.
//!
//! A `NameIndex` is built once per build from `all_pages` in nav order, so
//! that a stem shared by multiple pages resolves deterministically to the
//! first one encountered (see the design note on wiki-link disambiguation).

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{NodeId, Site};
use crate::slug;
use crate::urlmap;

static WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());

pub struct NameIndex {
    by_stem: HashMap<String, String>,
    by_path: HashMap<String, String>,
}

impl NameIndex {
    pub fn build(site: &Site) -> Self {
        let mut by_stem = HashMap::new();
        let mut by_path = HashMap::new();

        for id in site.pages_in_nav_order() {
            let url = urlmap::url_for(site, id);
            let stem_key = site.node(id).file_metadata().slug;
            by_stem.entry(stem_key).or_insert_with(|| url.clone());

            let path_key = slugified_path(site, id);
            by_path.entry(path_key).or_insert(url);
        }

        NameIndex { by_stem, by_path }
    }

    /// Resolves a normalized wiki-link target to the URL it should point
    /// at: a full path match first, then a segment-by-segment suffix
    /// match, falling back to a bare-stem match against the first page
    /// in nav order that carries it.
    pub fn resolve(&self, target: &str) -> Option<String> {
        let normalized = target.trim().to_lowercase();
        let segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();

        if segments.len() > 1 {
            let slugified: Vec<String> = segments.iter().map(|s| slug::slugify(s)).collect();
            let path_key = slugified.join("/");
            if let Some(url) = self.by_path.get(&path_key) {
                return Some(url.clone());
            }
        }

        let stem = segments.last().copied().unwrap_or(&normalized);
        self.by_stem.get(&slug::slugify(stem)).cloned()
    }
}

fn slugified_path(site: &Site, id: NodeId) -> String {
    let node = site.node(id);
    node.path
        .trim_end_matches(".md")
        .trim_end_matches(".markdown")
        .split('/')
        .map(slug::slugify)
        .collect::<Vec<_>>()
        .join("/")
}

/// Outcome of resolving one `[[...]]` occurrence, recorded so the
/// markdown pipeline can feed `internal_refs` and so a miss stays
/// visible to the link validator instead of silently disappearing.
pub struct Resolution {
    pub text: String,
    pub href: String,
    pub resolved: bool,
}

pub fn resolve_one(index: &NameIndex, target: &str, label: Option<&str>) -> Resolution {
    match index.resolve(target) {
        Some(url) => Resolution {
            text: label.map(str::to_string).unwrap_or_else(|| display_text(target)),
            href: url,
            resolved: true,
        },
        None => {
            let placeholder = format!(
                "/{}/",
                target
                    .trim()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(slug::slugify)
                    .collect::<Vec<_>>()
                    .join("/")
            );
            Resolution {
                text: label.map(str::to_string).unwrap_or_else(|| display_text(target)),
                href: placeholder,
                resolved: false,
            }
        }
    }
}

fn display_text(target: &str) -> String {
    let base = target.trim().rsplit('/').next().unwrap_or(target).trim();
    slug::clean_label(base)
}

/// Rewrites every `[[target]]`/`[[target|label]]` occurrence in `markdown`
/// into a standard Markdown link. Returns the rewritten text plus the set
/// of target URLs that resolved, so callers can seed `internal_refs`
/// before the parser even runs.
pub fn rewrite(markdown: &str, index: &NameIndex) -> (String, Vec<String>) {
    let mut resolved_refs = Vec::new();

    let rewritten = WIKI_LINK
        .replace_all(markdown, |caps: &regex::Captures| {
            let target = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let label = caps.get(2).map(|m| m.as_str());
            let resolution = resolve_one(index, target, label);
            if resolution.resolved {
                resolved_refs.push(resolution.href.clone());
            }
            format!("[{}]({})", resolution.text, resolution.href)
        })
        .into_owned();

    (rewritten, resolved_refs)
}
