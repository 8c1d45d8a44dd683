//! URL derivation from `Node`s, and the set of URLs a build resolves —
//! consulted by the link validator and the per-page assembler alike.

use std::collections::HashSet;

use crate::node::{NodeId, NodeKind, Site};
use crate::slug;

/// The URL for a folder `Node`, given its path. The root is always `/`.
pub fn folder_url(site: &Site, id: NodeId) -> String {
    if id == site.root() {
        return "/".to_string();
    }
    let node = site.node(id);
    let segments: Vec<&str> = node.path.split('/').filter(|s| !s.is_empty()).collect();
    slug::segments_to_url(&segments)
}

/// The URL for any `Node` (file or folder). Files whose stem is
/// `index`/`readme` resolve to their parent folder's URL.
pub fn url_for(site: &Site, id: NodeId) -> String {
    let node = site.node(id);
    match &node.kind {
        NodeKind::Folder { .. } => folder_url(site, id),
        NodeKind::File => {
            let parent_id = node.parent.expect("file node always has a parent");
            if node.is_index_file() {
                folder_url(site, parent_id)
            } else {
                let parent_url = folder_url(site, parent_id);
                let meta = node.file_metadata();
                format!("{parent_url}{}/", meta.slug)
            }
        }
    }
}

/// The on-disk output path (relative to the output directory) mirroring
/// `url_for`, with `index.html` appended.
pub fn output_path_for(site: &Site, id: NodeId) -> String {
    let url = url_for(site, id);
    format!("{}index.html", url.trim_start_matches('/'))
}

/// Folders in the tree (root included) that have no `index`/`readme`
/// file of their own, and therefore need a synthesized auto-index page.
pub fn auto_index_folders(site: &Site) -> Vec<NodeId> {
    site.all_folders()
        .into_iter()
        .filter(|&id| id != site.root() && !site.node(id).has_index())
        .collect()
}

/// The set of every absolute URL a build resolves successfully: `/`,
/// every page, and every folder (whether authored or auto-indexed).
/// Both the prefixed and unprefixed forms are inserted when a base path
/// is configured, so content authored with root-relative links still
/// validates once the site is deployed under a sub-path.
pub fn build(site: &Site, base_path: &str) -> HashSet<String> {
    let mut urls = HashSet::new();

    let mut insert = |url: String| {
        urls.insert(slug::prefix_url(base_path, &url));
        urls.insert(url);
    };

    insert("/".to_string());

    for &page in site.all_pages() {
        insert(url_for(site, page));
    }

    for folder in site.all_folders() {
        insert(folder_url(site, folder));
    }

    urls
}
