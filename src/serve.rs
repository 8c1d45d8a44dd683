//! Dynamic (serve) mode: every request re-scans the source tree, rebuilds
//! the URL map, and renders exactly the requested page — no caching, no
//! watcher, no live-reload. Correctness over throughput.

use std::path::Path;
use std::time::Instant;

use bunt::termcolor::{ColorChoice, StandardStream};
use tiny_http::{Header, Response, Server};

use crate::address::get_safe_addr;
use crate::assemble;
use crate::assets::SiteAssets;
use crate::config::Config;
use crate::linkcheck;
use crate::markdown;
use crate::node::{self, NodeId, Site};
use crate::urlmap;
use crate::wiki;
use crate::{Error, Result};

pub struct ServeCommand {}

#[derive(Default)]
pub struct ServeOptions {
    pub port: Option<u16>,
}

impl ServeCommand {
    pub fn run(options: ServeOptions, config: Config, input_dir: &Path) -> Result<()> {
        let mut stdout = if config.color_enabled() {
            StandardStream::stdout(ColorChoice::Auto)
        } else {
            StandardStream::stdout(ColorChoice::Never)
        };

        let addr = get_safe_addr("127.0.0.1", options.port.unwrap_or(4001))
            .ok_or_else(|| Error::config("no free port available for the serve command".to_string()))?;

        bunt::writeln!(stdout, "{$bold}{$blue}Volcano | Serve{/$}{/$}")?;
        bunt::writeln!(stdout, "Serving {$bold}{}{/$} on {$bold}http://{}{/$}\n", input_dir.display(), addr)?;

        let server = Server::http(addr).map_err(|e| Error::config(format!("could not bind {addr}: {e}")))?;

        for request in server.incoming_requests() {
            let start = Instant::now();
            let path = request.url().to_string();
            let (status, body) = render_request(&config, input_dir, &path);
            let duration = start.elapsed();

            bunt::writeln!(stdout, "  {$bold}{}{/$} {} ({:?})", status, path, duration)?;

            let header = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..]).unwrap();
            let response = Response::from_string(body).with_status_code(status).with_header(header);
            let _ = request.respond(response);
        }

        Ok(())
    }
}

/// Renders the single page that answers `request_path`, re-scanning the
/// source tree fresh on every call so the response always reflects the
/// current state of the source files. Returns the HTTP status and body.
fn render_request(config: &Config, input_dir: &Path, request_path: &str) -> (u16, String) {
    let site = match node::scan(input_dir) {
        Ok(site) => site,
        Err(_) => return (404, "<h1>404</h1><p>Could not read the source directory.</p>".to_string()),
    };

    let base_path = config.base_path();
    let stripped = request_path.strip_prefix(&base_path).unwrap_or(request_path);

    match resolve(&site, stripped) {
        Some(target) => {
            let html = render_target(&site, config, target);
            (200, html)
        }
        None => (404, "<h1>404</h1><p>Page not found.</p>".to_string()),
    }
}

enum Target {
    Page(NodeId),
    AutoIndex(NodeId),
}

/// Maps a request path to a source node: the homepage takes the
/// root-level index page if there is one, otherwise the first page in
/// nav order; everything else matches case-insensitively against the
/// site's URL map, falling through from exact page URLs to folder URLs.
fn resolve(site: &Site, path: &str) -> Option<Target> {
    if path.is_empty() || path == "/" {
        if let Some(root_index) = site.root_index_page() {
            return Some(Target::Page(root_index));
        }
        return site.pages_in_nav_order().first().map(|&id| Target::Page(id));
    }

    let normalized = format!("/{}/", path.trim_matches('/')).to_lowercase();

    for &id in site.all_pages() {
        if urlmap::url_for(site, id).to_lowercase() == normalized {
            return Some(Target::Page(id));
        }
    }

    for folder in site.all_folders() {
        if urlmap::folder_url(site, folder).to_lowercase() == normalized {
            return if site.node(folder).has_index() {
                site.node(folder).index_path().and_then(|_| {
                    site.all_pages()
                        .iter()
                        .copied()
                        .find(|&id| site.node(id).parent == Some(folder) && site.node(id).is_index_file())
                        .map(Target::Page)
                })
            } else {
                Some(Target::AutoIndex(folder))
            };
        }
    }

    None
}

fn render_target(site: &Site, config: &Config, target: Target) -> String {
    let urls = urlmap::build(site, &config.base_path());

    // Rebuilt fresh per request, in keeping with serve mode never caching;
    // recomputing the theme/script bytes is cheap next to a full tree scan.
    let site_assets = match SiteAssets::build(config) {
        Ok(assets) => assets,
        Err(e) => return format!("<h1>500</h1><p>{e}</p>"),
    };

    let (id, assembled) = match target {
        Target::Page(id) => {
            let wiki_index = wiki::NameIndex::build(site);
            let source = std::fs::read_to_string(&site.node(id).source_path).unwrap_or_default();
            let content = markdown::render(&source, &wiki_index);
            (id, assemble::assemble(site, config, id, &content, &site_assets))
        }
        Target::AutoIndex(folder) => {
            let content = assemble::auto_index_content(site, folder, &config.base_path());
            (folder, assemble::assemble(site, config, folder, &content, &site_assets))
        }
    };
    let _ = id;

    let broken = linkcheck::broken_hrefs(&assembled.internal_refs, &urls);
    if broken.is_empty() {
        assembled.html
    } else {
        format!("{}{}", linkcheck::banner_html(&broken), assembled.html)
    }
}
