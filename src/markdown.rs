//! GFM rendering, admonitions, heading anchors, code highlighting, and the
//! per-page derived fields (TOC, reading time, description) that sit on
//! top of the raw HTML.

use std::collections::{HashMap, HashSet};

use once_cell::sync::{Lazy, OnceCell};
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::{Captures, Regex};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::wiki;

static ADMONITION_FENCE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:::\s*(note|tip|info|warning|danger)\s*(.*)$").unwrap());
static CALLOUT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\[!(note|tip|info|warning|danger)\]\s*$").unwrap());
static HREF: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<a href="([^"]*)""#).unwrap());
static PRE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<pre[^>]*>.*?</pre>").unwrap());
static TAG_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static SYNTAX_SET: OnceCell<SyntaxSet> = OnceCell::new();
static THEME_SET: OnceCell<ThemeSet> = OnceCell::new();

/// A heading collected during rendering: always level 2-6 (level 1 is the
/// page title and never appears here), with the same `id` written into
/// the HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub text: String,
    pub anchor: String,
    pub level: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub headings_for_search: Vec<TocEntry>,
    pub internal_refs: HashSet<String>,
    pub reading_time_minutes: u32,
    pub plain_description: String,
}

/// Renders one page's Markdown body (frontmatter not yet stripped) into
/// its full `PageContent`, resolving wiki links against `wiki_index`.
pub fn render(source: &str, wiki_index: &wiki::NameIndex) -> PageContent {
    let body = strip_frontmatter(source);
    let with_admonitions = lower_fenced_admonitions(body);
    let (rewritten, wiki_refs) = wiki::rewrite(&with_admonitions, wiki_index);

    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let events: Vec<Event> = Parser::new_ext(&rewritten, options).collect();

    let events = lower_blockquote_admonitions(events);
    let events = highlight_code_blocks(events);
    let (events, headings) = assign_heading_ids(events);

    let mut html_out = String::new();
    html::push_html(&mut html_out, events.into_iter());
    let html_out = mark_external_links(&html_out);

    let mut internal_refs: HashSet<String> = wiki_refs.into_iter().collect();
    collect_internal_hrefs(&html_out, &mut internal_refs);

    let toc = headings.iter().filter(|h| h.level <= 4).cloned().collect();

    PageContent {
        reading_time_minutes: reading_time_minutes(&html_out),
        plain_description: plain_description(&html_out),
        html: html_out,
        toc,
        headings_for_search: headings,
        internal_refs,
    }
}

/// Skips a leading `---`-delimited YAML frontmatter block, if present.
fn strip_frontmatter(source: &str) -> &str {
    let Some(rest) = source.strip_prefix("---\r\n").or_else(|| source.strip_prefix("---\n")) else {
        return source;
    };

    if let Some(end) = rest.find("\n---") {
        let after_marker = &rest[end + 1..];
        match after_marker.find('\n') {
            Some(nl) => &after_marker[nl + 1..],
            None => "",
        }
    } else {
        source
    }
}

/// Rewrites `:::kind [title]` ... `:::` fences into raw HTML blocks that
/// CommonMark will carry through untouched, leaving the body between them
/// to still be parsed as Markdown.
fn lower_fenced_admonitions(source: &str) -> String {
    let mut out = String::new();
    let mut in_fence = false;

    for line in source.lines() {
        let trimmed = line.trim();
        if !in_fence {
            if let Some(caps) = ADMONITION_FENCE_OPEN.captures(trimmed) {
                let kind = &caps[1];
                let title = caps[2].trim();
                in_fence = true;
                out.push_str(&open_admonition_html(kind, title));
                out.push_str("\n\n");
                continue;
            }
            out.push_str(line);
            out.push('\n');
        } else if trimmed == ":::" {
            in_fence = false;
            out.push_str("\n</div></div>\n\n");
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}

fn open_admonition_html(kind: &str, title: &str) -> String {
    if title.is_empty() {
        format!("<div class=\"admonition admonition-{kind}\"><div class=\"admonition-content\">")
    } else {
        format!(
            "<div class=\"admonition admonition-{kind}\"><p class=\"admonition-title\">{title}</p><div class=\"admonition-content\">"
        )
    }
}

/// Lowers GFM-style `> [!KIND]` blockquotes into the same admonition HTML
/// shape the fenced syntax produces. Buffers each blockquote's subtree
/// (nesting-aware) to inspect its first line before deciding.
fn lower_blockquote_admonitions(events: Vec<Event>) -> Vec<Event> {
    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter().peekable();

    while let Some(ev) = iter.next() {
        if !matches!(ev, Event::Start(Tag::BlockQuote)) {
            out.push(ev);
            continue;
        }

        let mut depth = 1;
        let mut inner = Vec::new();
        while depth > 0 {
            let next = iter.next().expect("blockquote end without matching start");
            match &next {
                Event::Start(Tag::BlockQuote) => depth += 1,
                Event::End(TagEnd::BlockQuote) => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                inner.push(next);
            }
        }

        // The marker line is split into multiple adjacent `Text` events
        // (pulldown-cmark tokenizes `[`, `!TIP`, `]` separately), so the
        // first paragraph's leading text run has to be concatenated
        // before it can be matched against `> [!KIND]`.
        let marker = inner.iter().position(|e| matches!(e, Event::Start(Tag::Paragraph))).and_then(|p_start| {
            let mut text = String::new();
            let mut j = p_start + 1;
            while let Some(Event::Text(t)) = inner.get(j) {
                text.push_str(t);
                j += 1;
            }
            callout_kind(&text).map(|kind| (kind, p_start + 1, j))
        });

        match marker {
            Some((kind, strip_start, strip_end)) => {
                let mut skip_until = strip_end;
                if matches!(inner.get(skip_until), Some(Event::SoftBreak) | Some(Event::HardBreak)) {
                    skip_until += 1;
                }

                out.push(Event::Html(CowStr::from(format!(
                    "<div class=\"admonition admonition-{kind}\"><div class=\"admonition-content\">"
                ))));
                for (idx, e) in inner.into_iter().enumerate() {
                    if idx >= strip_start && idx < skip_until {
                        continue;
                    }
                    out.push(e);
                }
                out.push(Event::Html(CowStr::from("</div></div>".to_string())));
            }
            None => {
                out.push(Event::Start(Tag::BlockQuote));
                out.extend(inner);
                out.push(Event::End(TagEnd::BlockQuote));
            }
        }
    }

    out
}

fn callout_kind(text: &str) -> Option<&'static str> {
    let caps = CALLOUT_MARKER.captures(text.trim())?;
    match caps[1].to_lowercase().as_str() {
        "note" => Some("note"),
        "tip" => Some("tip"),
        "info" => Some("info"),
        "warning" => Some("warning"),
        "danger" => Some("danger"),
        _ => None,
    }
}

/// Replaces every fenced/indented code block with a syntax-highlighted,
/// copy-button-wrapped container. Inline code is left untouched.
fn highlight_code_blocks(events: Vec<Event>) -> Vec<Event> {
    let syntax_set = SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines);
    let theme_set = THEME_SET.get_or_init(ThemeSet::load_defaults);
    let theme = &theme_set.themes["InspiredGitHub"];

    let mut out = Vec::with_capacity(events.len());
    let mut iter = events.into_iter().peekable();

    while let Some(ev) = iter.next() {
        let lang = match &ev {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => Some(lang.to_string()),
            Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)) => Some(String::new()),
            _ => None,
        };

        let Some(lang) = lang else {
            out.push(ev);
            continue;
        };

        let mut code = String::new();
        loop {
            match iter.next() {
                Some(Event::Text(text)) => code.push_str(&text),
                Some(Event::End(TagEnd::CodeBlock)) | None => break,
                Some(_) => {}
            }
        }

        let syntax = if lang.is_empty() {
            syntax_set.find_syntax_plain_text()
        } else {
            syntax_set
                .find_syntax_by_token(&lang)
                .unwrap_or_else(|| syntax_set.find_syntax_plain_text())
        };

        let body = highlighted_html_for_string(&code, syntax_set, syntax, theme)
            .unwrap_or_else(|_| format!("<pre><code>{}</code></pre>", escape_html(&code)));

        out.push(Event::Html(CowStr::from(format!(
            "<div class=\"code-block\"><button class=\"copy-button\" type=\"button\" data-copy=\"\">Copy</button>{body}</div>"
        ))));
    }

    out
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Writes an `id` onto every `h2`-`h6`, deduplicating repeats within the
/// page with a `-2`, `-3`, ... suffix, and collects the TOC/search
/// heading list in document order.
fn assign_heading_ids(events: Vec<Event>) -> (Vec<Event>, Vec<TocEntry>) {
    let mut out = Vec::with_capacity(events.len());
    let mut headings = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut iter = events.into_iter().peekable();

    while let Some(ev) = iter.next() {
        let Event::Start(Tag::Heading { level, classes, attrs, .. }) = ev else {
            out.push(ev);
            continue;
        };

        let mut text = String::new();
        let mut inner = Vec::new();
        loop {
            match iter.next() {
                Some(Event::End(TagEnd::Heading(_))) | None => break,
                Some(Event::Text(t)) => {
                    text.push_str(&t);
                    inner.push(Event::Text(t));
                }
                Some(Event::Code(t)) => {
                    text.push_str(&t);
                    inner.push(Event::Code(t));
                }
                Some(other) => inner.push(other),
            }
        }

        let level_num = heading_level_number(level);
        let id = if level_num == 1 {
            String::new()
        } else {
            let base = crate::slug::slugify(&text);
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}-{count}")
            }
        };

        out.push(Event::Start(Tag::Heading {
            level,
            id: if id.is_empty() { None } else { Some(CowStr::from(id.clone())) },
            classes,
            attrs,
        }));
        out.extend(inner);
        out.push(Event::End(TagEnd::Heading(level)));

        if (2..=6).contains(&level_num) {
            headings.push(TocEntry { text, anchor: id, level: level_num });
        }
    }

    (out, headings)
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Adds `target="_blank" rel="noopener noreferrer"` to any anchor whose
/// href parses as an absolute URL (a scheme is present). Parsed, not
/// prefix-matched, so `mailto:`/`ftp:` links qualify too.
fn mark_external_links(html: &str) -> String {
    HREF.replace_all(html, |caps: &Captures| {
        let href = &caps[1];
        if url::Url::parse(href).is_ok() {
            format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer""#)
        } else {
            caps[0].to_string()
        }
    })
    .into_owned()
}

fn collect_internal_hrefs(html: &str, refs: &mut HashSet<String>) {
    for caps in HREF.captures_iter(html) {
        let href = &caps[1];
        if !href.starts_with('/') {
            continue;
        }
        let without_fragment = href.split('#').next().unwrap_or(href);
        let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
        if !without_query.is_empty() {
            refs.insert(without_query.to_string());
        }
    }
}

/// `ceil(regular_words/225 + code_words/100)`, clamped to a minimum of 1.
fn reading_time_minutes(html: &str) -> u32 {
    let code_words: usize = PRE_BLOCK
        .find_iter(html)
        .map(|m| word_count(&TAG_STRIP.replace_all(m.as_str(), " ")))
        .sum();
    let without_code = PRE_BLOCK.replace_all(html, " ");
    let regular_words = word_count(&TAG_STRIP.replace_all(&without_code, " "));

    let minutes = (regular_words as f64 / 225.0 + code_words as f64 / 100.0).ceil() as u32;
    minutes.max(1)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// First 160 characters of tag-stripped, whitespace-collapsed text,
/// truncated at the last space before the limit.
fn plain_description(html: &str) -> String {
    let text = TAG_STRIP.replace_all(html, " ");
    let collapsed = WHITESPACE_RUN.replace_all(text.trim(), " ").trim().to_string();

    if collapsed.chars().count() <= 160 {
        return collapsed;
    }

    let truncated: String = collapsed.chars().take(160).collect();
    match truncated.rfind(' ') {
        Some(cut) => format!("{}…", &truncated[..cut]),
        None => format!("{truncated}…"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::node::scan;

    fn index_for(tmp: &std::path::Path) -> wiki::NameIndex {
        let site = scan(tmp).unwrap();
        wiki::NameIndex::build(&site)
    }

    #[test]
    fn fenced_admonition_renders_shared_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n:::warning Careful\nDo not taunt happy fun ball.\n:::\n";
        let page = render(content, &index);

        assert!(page.html.contains("admonition admonition-warning"));
        assert!(page.html.contains("admonition-title\">Careful</p>"));
        assert!(page.html.contains("Do not taunt happy fun ball."));
    }

    #[test]
    fn gfm_blockquote_admonition_renders_shared_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n> [!TIP]\n> Use a ladder.\n";
        let page = render(content, &index);

        assert!(page.html.contains("admonition admonition-tip"));
        assert!(page.html.contains("Use a ladder."));
        assert!(!page.html.contains("[!TIP]"));
    }

    #[test]
    fn heading_ids_dedupe_and_populate_toc() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n## Setup\n\n## Setup\n\n### Detail\n";
        let page = render(content, &index);

        assert!(page.html.contains("id=\"setup\""));
        assert!(page.html.contains("id=\"setup-2\""));
        assert_eq!(page.toc.len(), 3);
        assert_eq!(page.toc[1].anchor, "setup-2");
    }

    #[test]
    fn toc_excludes_levels_below_2_and_above_4() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n## Two\n\n##### Five\n";
        let page = render(content, &index);

        assert_eq!(page.toc.len(), 1);
        assert_eq!(page.headings_for_search.len(), 2);
    }

    #[test]
    fn code_block_is_wrapped_with_copy_button() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n```rust\nfn main() {}\n```\n";
        let page = render(content, &index);

        assert!(page.html.contains("code-block"));
        assert!(page.html.contains("copy-button"));
    }

    #[test]
    fn external_link_gets_blank_target_and_rel() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let content = "# Title\n\n[ext](https://example.com) and [home](/).\n";
        let page = render(content, &index);

        assert!(page.html.contains(r#"href="https://example.com" target="_blank" rel="noopener noreferrer""#));
        assert!(!page.html.contains(r#"href="/" target="_blank""#));
    }

    #[test]
    fn reading_time_matches_word_count_formula() {
        // 449 repeats plus the "Title" heading word makes 450 regular words.
        let words = "word ".repeat(449);
        let content = format!("# Title\n\n{words}\n");
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let page = render(&content, &index);
        assert_eq!(page.reading_time_minutes, 2);
    }

    #[test]
    fn reading_time_has_a_floor_of_one_minute() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let page = render("# Title\n\nhi\n", &index);
        assert_eq!(page.reading_time_minutes, 1);
    }

    #[test]
    fn description_truncates_at_last_space_with_ellipsis() {
        let long = "word ".repeat(40);
        let content = format!("# Title\n\n{long}\n");
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let page = render(&content, &index);
        assert!(page.plain_description.ends_with('…'));
        assert!(page.plain_description.chars().count() <= 161);
    }

    #[test]
    fn wiki_link_resolves_and_feeds_internal_refs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.md"), "# B\n").unwrap();
        let index = index_for(tmp.path());

        let page = render("# A\n\nSee [[b|the B page]].\n", &index);
        assert!(page.html.contains(r#"href="/b/""#));
        assert!(page.internal_refs.contains("/b/"));
    }

    #[test]
    fn frontmatter_is_stripped_before_rendering() {
        let tmp = tempfile::tempdir().unwrap();
        let index = index_for(tmp.path());

        let page = render("---\ntitle: Hi\n---\n\n# Title\n\nbody\n", &index);
        assert!(!page.html.contains("title: Hi"));
    }
}
