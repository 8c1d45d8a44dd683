//! Drives one full build: scans the input tree, renders every page (and
//! every auto-index folder), validates internal links, and writes the
//! site plus its assets, search index, and PWA outputs to disk.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::assemble::{self, AssembledPage};
use crate::assets::{self, SiteAssets};
use crate::config::Config;
use crate::linkcheck;
use crate::markdown::{self, PageContent};
use crate::node::{self, NodeId, Site};
use crate::page_template::PageContext;
use crate::pwa;
use crate::search;
use crate::urlmap;
use crate::wiki;
use crate::{Error, Result};

/// One rendered page: its output path (relative to the output directory),
/// the assembled HTML, and the content it was assembled from (kept
/// around for the search index).
struct RenderedPage {
    id: NodeId,
    output_path: String,
    assembled: AssembledPage,
    content: PageContent,
}

/// Scans `input_dir`, renders the whole site, and writes it under
/// `config.output`. Fails the build on a scan/markdown error or on any
/// broken internal link, unless `allow_broken_links` is set.
pub fn build(config: &Config, input_dir: &Path) -> Result<BuildReport> {
    let site = node::scan(input_dir)?;
    let site_assets = SiteAssets::build(config)?;
    let rendered = render_all(&site, config, &site_assets)?;

    let broken_report: Vec<(PathBuf, Vec<String>)> = {
        let urls = urlmap::build(&site, &config.base_path());
        rendered
            .iter()
            .map(|page| {
                let broken = linkcheck::broken_hrefs(&page.assembled.internal_refs, &urls);
                (PathBuf::from(&page.output_path), broken)
            })
            .collect()
    };
    let broken_report = linkcheck::check_build(broken_report, config.allow_broken_links)?;

    write_site(&site, config, &rendered, &site_assets)?;

    Ok(BuildReport {
        page_count: rendered.len(),
        broken_links: broken_report,
    })
}

pub struct BuildReport {
    pub page_count: usize,
    pub broken_links: Vec<(PathBuf, Vec<String>)>,
}

/// Renders every page in `all_pages` plus a synthesized page for every
/// folder lacking its own index, in parallel (rendering only reads the
/// frozen `Site`/`NameIndex`, so pages are independent of one another).
fn render_all(site: &Site, config: &Config, site_assets: &SiteAssets) -> Result<Vec<RenderedPage>> {
    let wiki_index = wiki::NameIndex::build(site);

    let page_results: Result<Vec<RenderedPage>> = site
        .all_pages()
        .par_iter()
        .map(|&id| render_page(site, config, &wiki_index, id, site_assets))
        .collect();
    let mut rendered = page_results?;

    let auto_index_rendered: Vec<RenderedPage> = urlmap::auto_index_folders(site)
        .into_par_iter()
        .map(|folder| render_auto_index(site, config, folder, site_assets))
        .collect();
    rendered.extend(auto_index_rendered);

    Ok(rendered)
}

fn render_page(
    site: &Site,
    config: &Config,
    wiki_index: &wiki::NameIndex,
    id: NodeId,
    site_assets: &SiteAssets,
) -> Result<RenderedPage> {
    let node = site.node(id);
    let source = fs::read_to_string(&node.source_path).map_err(|e| Error::scan(&node.source_path, e))?;
    let content = markdown::render(&source, wiki_index);
    let assembled = assemble::assemble(site, config, id, &content, site_assets);
    let output_path = urlmap::output_path_for(site, id);

    Ok(RenderedPage { id, output_path, assembled, content })
}

fn render_auto_index(site: &Site, config: &Config, folder: NodeId, site_assets: &SiteAssets) -> RenderedPage {
    let content = assemble::auto_index_content(site, folder, &config.base_path());
    let assembled = assemble::assemble(site, config, folder, &content, site_assets);
    let output_path = format!("{}index.html", urlmap::folder_url(site, folder).trim_start_matches('/'));

    RenderedPage { id: folder, output_path, assembled, content }
}

fn write_site(site: &Site, config: &Config, rendered: &[RenderedPage], site_assets: &SiteAssets) -> Result<()> {
    if config.output.exists() {
        fs::remove_dir_all(&config.output).map_err(|e| Error::asset(config.output.display().to_string(), e))?;
    }
    fs::create_dir_all(&config.output).map_err(|e| Error::asset(config.output.display().to_string(), e))?;

    let mut asset_hrefs = HashSet::new();
    for page in rendered {
        let dest = config.output.join(&page.output_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::asset(dest.display().to_string(), e))?;
        }
        fs::write(&dest, &page.assembled.html).map_err(|e| Error::asset(dest.display().to_string(), e))?;
    }

    let assets_dir = config.output.join("assets");
    fs::create_dir_all(&assets_dir).map_err(|e| Error::asset(assets_dir.display().to_string(), e))?;

    let to_write: Vec<&(assets::Asset, Vec<u8>)> = std::iter::once(&site_assets.css)
        .chain(std::iter::once(&site_assets.copy_button))
        .chain(site_assets.search.iter())
        .collect();
    for (asset, bytes) in to_write {
        if let Some(filename) = assets::external_filename(asset) {
            let dest = assets_dir.join(&filename);
            fs::write(&dest, bytes).map_err(|e| Error::asset(dest.display().to_string(), e))?;
            asset_hrefs.insert(asset.href().expect("external asset has an href").to_string());
        }
    }

    if config.search {
        let search_pages: Vec<(NodeId, &PageContent)> = rendered
            .iter()
            .filter(|p| !site.node(p.id).is_folder())
            .map(|p| (p.id, &p.content))
            .collect();
        let pages = search::collect(site, &search_pages);
        let json = search::to_json(&pages);
        let dest = config.output.join("search-index.json");
        fs::write(&dest, json).map_err(|e| Error::asset(dest.display().to_string(), e))?;
    }

    if config.pwa {
        let manifest = pwa::manifest(config);
        let dest = config.output.join("manifest.json");
        fs::write(&dest, manifest).map_err(|e| Error::asset(dest.display().to_string(), e))?;

        let mut urls: BTreeSet<String> = rendered.iter().map(|p| format!("{}/{}", config.base_path(), p.output_path.trim_end_matches("index.html"))).collect();
        urls.extend(asset_hrefs);
        let sw = pwa::service_worker(&urls);
        let dest = config.output.join("sw.js");
        fs::write(&dest, sw).map_err(|e| Error::asset(dest.display().to_string(), e))?;
    }

    let not_found_html = render_not_found(site, config, site_assets);
    let dest = config.output.join("404.html");
    fs::write(&dest, not_found_html).map_err(|e| Error::asset(dest.display().to_string(), e))?;

    Ok(())
}

fn render_not_found(site: &Site, config: &Config, site_assets: &SiteAssets) -> String {
    let base_path = config.base_path();
    let favicon = config.favicon.as_ref().map(|p| format!("{base_path}/{}", p.display()));
    let sidebar = crate::nav::sidebar(site, site.root(), &base_path);
    let top_nav = crate::nav::top_nav(site, config.top_nav, &base_path);

    let ctx = PageContext {
        page_title: "Page Not Found",
        site_title: &config.title,
        description: "The page you requested could not be found.",
        og_image: None,
        favicon: favicon.as_deref(),
        css: &site_assets.css.0,
        accent_color: config.accent_color.as_deref(),
        content_html: "<h1>404</h1><p>The page you requested could not be found.</p>",
        toc: &[],
        sidebar: &sidebar,
        top_nav: top_nav.as_deref(),
        breadcrumbs_html: "",
        prev: None,
        next: None,
        base_path: &base_path,
        search_asset: None,
        copy_button: &site_assets.copy_button.0,
        pwa_enabled: false,
        reading_time_minutes: 0,
    };
    crate::page_template::render(&ctx)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn builds_a_small_site_to_disk() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "index.md", "# Home\n\n[guide](/guide/)\n");
        write(input.path(), "guide.md", "# Guide\n");

        let out = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output = out.path().join("site");

        let report = build(&config, input.path()).unwrap();
        assert_eq!(report.page_count, 2);
        assert!(report.broken_links.is_empty());

        assert!(config.output.join("index.html").exists());
        assert!(config.output.join("guide/index.html").exists());
        assert!(config.output.join("search-index.json").exists());
        assert!(config.output.join("manifest.json").exists());
        assert!(config.output.join("sw.js").exists());
        assert!(config.output.join("404.html").exists());
        assert!(config.output.join("assets").read_dir().unwrap().count() > 0);
    }

    #[test]
    fn broken_link_fails_the_build_unless_allowed() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "a.md", "# A\n\n[missing](/nope/)\n");

        let out = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output = out.path().join("site");

        assert!(build(&config, input.path()).is_err());

        config.allow_broken_links = true;
        let report = build(&config, input.path()).unwrap();
        assert_eq!(report.broken_links.len(), 1);
    }

    #[test]
    fn auto_index_folder_is_written_to_disk() {
        let input = tempfile::tempdir().unwrap();
        write(input.path(), "docs/a.md", "# A\n");

        let out = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output = out.path().join("site");

        build(&config, input.path()).unwrap();
        assert!(config.output.join("docs/index.html").exists());
    }
}
