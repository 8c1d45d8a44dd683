//! `search-index.json`: the page/heading index the lazily-loaded client
//! script (`assets/search.js`) fetches on first `Cmd`/`Ctrl`+`K`.

use crate::markdown::PageContent;
use crate::node::{NodeId, Site};
use crate::urlmap;

/// One page's searchable content: title, URL, and its non-H1 headings.
pub struct SearchPage {
    pub title: String,
    pub url: String,
    pub headings: Vec<(String, String, u8)>,
}

/// Builds the full list of search pages for a site, given each page's
/// already-rendered content (auto-index pages included, since they are
/// valid destinations too).
pub fn collect(site: &Site, pages: &[(NodeId, &PageContent)]) -> Vec<SearchPage> {
    pages
        .iter()
        .map(|(id, content)| SearchPage {
            title: site.node(*id).name.clone(),
            url: urlmap::url_for(site, *id),
            headings: content
                .headings_for_search
                .iter()
                .map(|h| (h.text.clone(), h.anchor.clone(), h.level))
                .collect(),
        })
        .collect()
}

/// Serializes the collected pages into
/// `{ "pages": [ {title, url, headings: [{text, anchor, level}]} ] }`.
pub fn to_json(pages: &[SearchPage]) -> String {
    let pages_json: Vec<String> = pages
        .iter()
        .map(|page| {
            let headings_json: Vec<String> = page
                .headings
                .iter()
                .map(|(text, anchor, level)| {
                    format!(r#"{{"text":{text:?},"anchor":{anchor:?},"level":{level}}}"#)
                })
                .collect();
            format!(
                r#"{{"title":{:?},"url":{:?},"headings":[{}]}}"#,
                page.title,
                page.url,
                headings_json.join(",")
            )
        })
        .collect();

    format!(r#"{{"pages":[{}]}}"#, pages_json.join(","))
}

#[cfg(test)]
mod test {
    use super::*;
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
    fn index_excludes_h1_and_includes_anchors() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "a.md", "# A\n\n## Setup\n\nbody\n");

        let site = scan(tmp.path()).unwrap();
        let wiki_index = wiki::NameIndex::build(&site);
        let id = site.all_pages()[0];
        let source = fs::read_to_string(site.node(id).source_path.clone()).unwrap();
        let content = crate::markdown::render(&source, &wiki_index);

        let pages = collect(&site, &[(id, &content)]);
        let json = to_json(&pages);

        assert!(json.contains(r#""text":"Setup""#));
        assert!(json.contains(r#""anchor":"setup""#));
        assert!(!json.contains(r#""text":"A""#));
    }
}
