//! Combines a page's rendered content with navigation and site-wide
//! configuration into a full HTML document, and synthesizes the
//! auto-index pages for folders with no index file of their own.

use std::collections::HashSet;

use crate::assets::SiteAssets;
use crate::config::Config;
use crate::markdown::{self, PageContent};
use crate::nav::{self, NavLink};
use crate::node::{NodeId, Site};
use crate::page_template::{self, PageContext};
use crate::slug;
use crate::urlmap;

/// The fully assembled HTML for one page, plus every internal href it
/// emitted (content and navigation alike) for the link validator.
pub struct AssembledPage {
    pub html: String,
    pub internal_refs: HashSet<String>,
}

/// Builds the complete document for the page at `id`, given its already
/// rendered `content` and the site's pre-built `assets`.
pub fn assemble(site: &Site, config: &Config, id: NodeId, content: &PageContent, assets: &SiteAssets) -> AssembledPage {
    let mut refs = content.internal_refs.clone();
    let base_path = config.base_path();

    let sidebar_full = nav::sidebar(site, id, &base_path);
    let top_nav = nav::top_nav(site, config.top_nav, &base_path);
    let sidebar = match &top_nav {
        Some(top) => nav::sidebar_without_top_nav(sidebar_full, top),
        None => sidebar_full,
    };

    collect_nav_refs(&sidebar, &mut refs);
    if let Some(top) = &top_nav {
        collect_nav_refs(top, &mut refs);
    }

    let trail = if config.breadcrumbs { nav::breadcrumbs(site, id) } else { Vec::new() };
    for crumb in &trail {
        refs.insert(slug::prefix_url(&base_path, &crumb.url));
    }
    let breadcrumbs_html = nav::breadcrumbs_html(&base_path, &trail);

    let (prev_id, next_id) = if config.page_nav {
        nav::prev_next(site, id)
    } else {
        (None, None)
    };
    let prev = prev_id.map(|pid| (site.node(pid).name.clone(), slug::prefix_url(&base_path, &urlmap::url_for(site, pid))));
    let next = next_id.map(|nid| (site.node(nid).name.clone(), slug::prefix_url(&base_path, &urlmap::url_for(site, nid))));
    if let Some((_, url)) = &prev {
        refs.insert(url.clone());
    }
    if let Some((_, url)) = &next {
        refs.insert(url.clone());
    }

    let page_title = site.node(id).name.clone();
    let favicon_href = config.favicon.as_ref().map(|p| format!("{base_path}/{}", p.display()));

    let ctx = PageContext {
        page_title: &page_title,
        site_title: &config.title,
        description: &content.plain_description,
        og_image: config.og_image.as_deref(),
        favicon: favicon_href.as_deref(),
        css: &assets.css.0,
        accent_color: config.accent_color.as_deref(),
        content_html: &content.html,
        toc: &content.toc,
        sidebar: &sidebar,
        top_nav: top_nav.as_deref(),
        breadcrumbs_html: &breadcrumbs_html,
        prev: prev.as_ref().map(|(t, u)| (t.as_str(), u.as_str())),
        next: next.as_ref().map(|(t, u)| (t.as_str(), u.as_str())),
        base_path: &base_path,
        search_asset: assets.search.as_ref().map(|(a, _)| a),
        copy_button: &assets.copy_button.0,
        pwa_enabled: config.pwa,
        reading_time_minutes: content.reading_time_minutes,
    };

    AssembledPage {
        html: page_template::render(&ctx),
        internal_refs: refs,
    }
}

fn collect_nav_refs(links: &[NavLink], refs: &mut HashSet<String>) {
    for link in links {
        refs.insert(link.url.clone());
        collect_nav_refs(&link.children, refs);
    }
}

/// A synthesized index page for a folder with no index file: a heading
/// of the folder's display name, and a link list of its children (files
/// first, then folders, each group in nav order).
pub fn auto_index_content(site: &Site, folder: NodeId, base_path: &str) -> PageContent {
    let node = site.node(folder);

    let mut files = Vec::new();
    let mut folders = Vec::new();
    for &child in node.children() {
        if site.node(child).is_folder() {
            folders.push(child);
        } else {
            files.push(child);
        }
    }

    let mut html = format!("<h1>{}</h1><ul class=\"auto-index\">", markdown::escape_html(&node.name));
    let mut refs = HashSet::new();

    for &child in files.iter().chain(folders.iter()) {
        let url = slug::prefix_url(base_path, &urlmap::url_for(site, child));
        let title = &site.node(child).name;
        html.push_str(&format!(
            "<li><a href=\"{url}\">{}</a></li>",
            markdown::escape_html(title)
        ));
        refs.insert(url);
    }
    html.push_str("</ul>");

    PageContent {
        html,
        toc: Vec::new(),
        headings_for_search: Vec::new(),
        internal_refs: refs,
        reading_time_minutes: 1,
        plain_description: format!("Index of {}", node.name),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::node::scan;
    use crate::wiki;
    use std::fs;

    fn write(dir: &std::path::Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn assembled_page_includes_sidebar_and_collects_refs() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.md", "# Home\n\n[guide](/guide/)\n");
        write(tmp.path(), "guide.md", "# Guide\n");

        let site = scan(tmp.path()).unwrap();
        let config = Config::default();
        let assets = SiteAssets::build(&config).unwrap();
        let index_index = site.root_index_page().unwrap();
        let wiki_index = wiki::NameIndex::build(&site);
        let source = fs::read_to_string(site.node(index_index).source_path.clone()).unwrap();
        let content = markdown::render(&source, &wiki_index);

        let page = assemble(&site, &config, index_index, &content, &assets);
        assert!(page.html.contains("Guide"));
        assert!(page.internal_refs.contains("/guide/"));
    }

    #[test]
    fn assembled_page_references_the_hashed_css_filename() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.md", "# Home\n");

        let site = scan(tmp.path()).unwrap();
        let config = Config::default();
        let assets = SiteAssets::build(&config).unwrap();
        let index_index = site.root_index_page().unwrap();
        let wiki_index = wiki::NameIndex::build(&site);
        let source = fs::read_to_string(site.node(index_index).source_path.clone()).unwrap();
        let content = markdown::render(&source, &wiki_index);

        let page = assemble(&site, &config, index_index, &content, &assets);
        let href = assets.css.0.href().unwrap();
        assert!(page.html.contains(href), "page head should link the hashed stylesheet");
    }

    #[test]
    fn nav_links_carry_the_base_path_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "index.md", "# Home\n");
        write(tmp.path(), "guide.md", "# Guide\n");

        let site = scan(tmp.path()).unwrap();
        let mut config = Config::default();
        config.url = "https://example.com/docs/".to_string();
        let assets = SiteAssets::build(&config).unwrap();
        let index_index = site.root_index_page().unwrap();
        let wiki_index = wiki::NameIndex::build(&site);
        let source = fs::read_to_string(site.node(index_index).source_path.clone()).unwrap();
        let content = markdown::render(&source, &wiki_index);

        let page = assemble(&site, &config, index_index, &content, &assets);
        assert!(page.html.contains(r#"href="/docs/guide/""#));
    }

    #[test]
    fn auto_index_lists_children_files_before_folders() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/a.md", "# A\n");
        write(tmp.path(), "docs/sub/b.md", "# B\n");

        let site = scan(tmp.path()).unwrap();
        let docs = site
            .all_folders()
            .into_iter()
            .find(|&id| site.node(id).name == "Docs")
            .unwrap();

        let content = auto_index_content(&site, docs, "");
        let a_pos = content.html.find("/docs/a/").unwrap();
        let sub_pos = content.html.find("/docs/sub/").unwrap();
        assert!(a_pos < sub_pos, "files should be listed before folders");
    }

    #[test]
    fn auto_index_links_carry_the_base_path_prefix() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "docs/a.md", "# A\n");

        let site = scan(tmp.path()).unwrap();
        let docs = site
            .all_folders()
            .into_iter()
            .find(|&id| site.node(id).name == "Docs")
            .unwrap();

        let content = auto_index_content(&site, docs, "/prefix");
        assert!(content.html.contains(r#"href="/prefix/docs/a/""#));
    }
}
