//! Sidebar, breadcrumb, top-nav, and previous/next navigation derived
//! from the scanned tree, per the active-path rules in the page
//! assembler design.

use crate::node::{NodeId, Site};
use crate::slug;
use crate::urlmap;

/// One entry in the sidebar tree. Folders carry children; files don't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub title: String,
    pub url: String,
    pub is_folder: bool,
    /// True iff this is the node whose page is currently being rendered.
    pub active: bool,
    /// True iff this folder is an ancestor of the active node, so the
    /// renderer should pre-expand it.
    pub on_path: bool,
    pub children: Vec<NavLink>,
}

/// The full sidebar tree rooted at the site root, with active/on-path
/// flags set relative to `current`. Every `NavLink.url` is already
/// prefixed with `base_path`, ready to emit as-is.
pub fn sidebar(site: &Site, current: NodeId, base_path: &str) -> Vec<NavLink> {
    let on_path = site.ancestors(current);
    build_children(site, site.root(), current, &on_path, base_path)
}

fn build_children(site: &Site, folder: NodeId, current: NodeId, on_path: &[NodeId], base_path: &str) -> Vec<NavLink> {
    site.node(folder)
        .children()
        .iter()
        .map(|&id| build_link(site, id, current, on_path, base_path))
        .collect()
}

fn build_link(site: &Site, id: NodeId, current: NodeId, on_path: &[NodeId], base_path: &str) -> NavLink {
    let node = site.node(id);
    let is_folder = node.is_folder();

    NavLink {
        title: node.name.clone(),
        url: slug::prefix_url(base_path, &urlmap::url_for(site, id)),
        is_folder,
        active: id == current,
        on_path: on_path.contains(&id),
        children: if is_folder {
            build_children(site, id, current, on_path, base_path)
        } else {
            Vec::new()
        },
    }
}

/// Filters out sidebar entries that top nav already surfaces, per the
/// rule that an enabled top nav "wins" a root-level entry.
pub fn sidebar_without_top_nav(mut links: Vec<NavLink>, top_nav: &[NavLink]) -> Vec<NavLink> {
    let top_nav_urls: Vec<&str> = top_nav.iter().map(|l| l.url.as_str()).collect();
    links.retain(|link| !top_nav_urls.contains(&link.url.as_str()));
    links
}

/// Root-level non-index entries, used both to populate the top nav and
/// to decide whether it is enabled at all (1-8 entries).
pub fn top_nav_candidates(site: &Site, base_path: &str) -> Vec<NavLink> {
    let on_path: Vec<NodeId> = Vec::new();
    site.node(site.root())
        .children()
        .iter()
        .filter(|&&id| !site.node(id).is_index_file())
        .map(|&id| build_link(site, id, site.root(), &on_path, base_path))
        .collect()
}

/// Top nav is enabled only when there are 1-8 root-level non-index
/// entries; otherwise `None` regardless of configuration.
pub fn top_nav(site: &Site, enabled_in_config: bool, base_path: &str) -> Option<Vec<NavLink>> {
    if !enabled_in_config {
        return None;
    }
    let candidates = top_nav_candidates(site, base_path);
    if (1..=8).contains(&candidates.len()) {
        Some(candidates)
    } else {
        None
    }
}

/// One entry in a breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub title: String,
    pub url: String,
}

/// Breadcrumb entries from the root down to, and including, `current`.
/// Empty for the homepage; callers decide whether to render at all
/// based on the `breadcrumbs` config option.
pub fn breadcrumbs(site: &Site, current: NodeId) -> Vec<Breadcrumb> {
    if current == site.root() {
        return Vec::new();
    }

    let mut trail: Vec<NodeId> = site.ancestors(current);
    trail.retain(|&id| id != site.root());
    trail.reverse();

    trail
        .into_iter()
        .map(|id| Breadcrumb {
            title: site.node(id).name.clone(),
            url: urlmap::url_for(site, id),
        })
        .collect()
}

/// Renders a breadcrumb trail as a Schema.org `BreadcrumbList`, paired
/// with a plain `<nav>` listing. The leaf entry is not a link.
pub fn breadcrumbs_html(base_path: &str, trail: &[Breadcrumb]) -> String {
    if trail.is_empty() {
        return String::new();
    }

    let items: Vec<String> = trail
        .iter()
        .enumerate()
        .map(|(i, crumb)| {
            format!(
                r#"{{"@type":"ListItem","position":{},"name":{:?},"item":{:?}}}"#,
                i + 1,
                crumb.title,
                slug::prefix_url(base_path, &crumb.url)
            )
        })
        .collect();

    let json_ld = format!(
        r#"<script type="application/ld+json">{{"@context":"https://schema.org","@type":"BreadcrumbList","itemListElement":[{}]}}</script>"#,
        items.join(",")
    );

    let nav_items: Vec<String> = trail
        .iter()
        .enumerate()
        .map(|(i, crumb)| {
            if i == trail.len() - 1 {
                format!("<li aria-current=\"page\">{}</li>", escape(&crumb.title))
            } else {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    slug::prefix_url(base_path, &crumb.url),
                    escape(&crumb.title)
                )
            }
        })
        .collect();

    format!(
        "{json_ld}<nav class=\"breadcrumbs\" aria-label=\"Breadcrumb\"><ol>{}</ol></nav>",
        nav_items.join("")
    )
}

fn escape(s: &str) -> String {
    crate::markdown::escape_html(s)
}

/// Previous/next page relative to `current`, per a linear traversal of
/// `all_pages` in nav order. The first page has no previous; the last
/// has no next.
pub fn prev_next(site: &Site, current: NodeId) -> (Option<NodeId>, Option<NodeId>) {
    let order = site.pages_in_nav_order();
    let Some(pos) = order.iter().position(|&id| id == current) else {
        return (None, None);
    };

    let prev = pos.checked_sub(1).and_then(|i| order.get(i)).copied();
    let next = order.get(pos + 1).copied();
    (prev, next)
}
