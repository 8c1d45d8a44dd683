//! Validates internal hrefs (content and navigation alike) against the
//! URLMap, with the build-vs-serve failure split described for the site
//! generator.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::markdown::escape_html;
use crate::{Error, Result};

/// An internal href begins with `/`; its `#fragment` and `?query` are
/// irrelevant to whether the target exists.
pub fn normalize_href(href: &str) -> Option<String> {
    if !href.starts_with('/') {
        return None;
    }
    let without_fragment = href.split('#').next().unwrap_or(href);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    Some(without_query.to_string())
}

/// The subset of `hrefs` that are internal but absent from `urlmap`, in
/// first-seen order and deduplicated.
pub fn broken_hrefs<'a>(hrefs: impl IntoIterator<Item = &'a String>, urlmap: &HashSet<String>) -> Vec<String> {
    let mut broken = Vec::new();
    let mut seen = HashSet::new();

    for href in hrefs {
        let Some(normalized) = normalize_href(href) else {
            continue;
        };
        if !seen.insert(normalized.clone()) {
            continue;
        }
        if !urlmap.contains(&normalized) {
            broken.push(normalized);
        }
    }

    broken
}

/// Turns a per-page broken-link report into a build result. An empty
/// report is always `Ok`. A non-empty one fails the build unless
/// `allow_broken_links` downgrades it to a warning the caller can still
/// render (the report is handed back so it can be banner-ized).
pub fn check_build(
    report: Vec<(PathBuf, Vec<String>)>,
    allow_broken_links: bool,
) -> Result<Vec<(PathBuf, Vec<String>)>> {
    let report: Vec<_> = report.into_iter().filter(|(_, broken)| !broken.is_empty()).collect();

    if report.is_empty() || allow_broken_links {
        Ok(report)
    } else {
        Err(Error::broken_links(report))
    }
}

/// An inline warning banner prepended to a serve-mode page whose content
/// or navigation references a target missing from the URLMap.
pub fn banner_html(broken: &[String]) -> String {
    let items = broken
        .iter()
        .map(|href| format!("<code>{}</code>", escape_html(href)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "<div class=\"broken-links-banner\">Broken link(s) on this page: {items}</div>"
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn strips_fragment_and_query_before_checking() {
        let urlmap = set(&["/guide/"]);
        let hrefs = vec!["/guide/#section-1?x=1".to_string()];
        assert!(broken_hrefs(&hrefs, &urlmap).is_empty());
    }

    #[test]
    fn external_and_relative_hrefs_are_ignored() {
        let urlmap = set(&["/guide/"]);
        let hrefs = vec!["https://example.com".to_string(), "relative.html".to_string()];
        assert!(broken_hrefs(&hrefs, &urlmap).is_empty());
    }

    #[test]
    fn unresolved_target_is_reported_once() {
        let urlmap = set(&["/guide/"]);
        let hrefs = vec!["/missing/".to_string(), "/missing/".to_string()];
        assert_eq!(broken_hrefs(&hrefs, &urlmap), vec!["/missing/".to_string()]);
    }

    #[test]
    fn build_mode_fails_unless_broken_links_are_allowed() {
        let report = vec![(PathBuf::from("a.md"), vec!["/missing/".to_string()])];

        assert!(check_build(report.clone(), false).is_err());
        assert_eq!(check_build(report, true).unwrap().len(), 1);
    }

    #[test]
    fn empty_report_never_fails() {
        let report = vec![(PathBuf::from("a.md"), Vec::new())];
        assert!(check_build(report, false).unwrap().is_empty());
    }
}
