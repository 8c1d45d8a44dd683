//! Filename metadata extraction, slugification, and URL derivation.
//!
//! Both the slug and the display-label engines share one prefix-stripping
//! step (see `FileMetadata::from_stem`) so that URL and label derivation
//! can never silently diverge from each other.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-_](\d{2})[-_](\d{2})[-_ ](.*)$").unwrap());
static NUMBER_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)[-_.]\s*(.*)$").unwrap());
static NON_SLUG_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Metadata derived purely from a file's leaf name. Recomputed on demand;
/// never stored on a `Node`, so label and URL derivation always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub has_date: bool,
    pub date: Option<NaiveDate>,
    pub number: Option<u64>,
    pub slug: String,
    pub display_name: String,
    pub is_draft: bool,
}

impl FileMetadata {
    /// Derives metadata from a file's leaf name (including extension).
    pub fn from_file_name(file_name: &str) -> Self {
        let is_draft = file_name.starts_with('_');
        let stem = strip_extension(file_name.trim_start_matches('_'));

        let (date, after_date) = strip_date_prefix(stem);
        let (number, remainder) = strip_number_prefix(after_date);

        FileMetadata {
            has_date: date.is_some(),
            date,
            number,
            slug: slugify(remainder),
            display_name: clean_label(remainder),
            is_draft,
        }
    }
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext))
            if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") =>
        {
            stem
        }
        _ => file_name,
    }
}

/// Strips a `YYYY[-_]MM[-_]DD[-_ ]` prefix. A bare year ("2023 Goals") is
/// never stripped: only a full date followed by one of the accepted
/// separators qualifies.
fn strip_date_prefix(stem: &str) -> (Option<NaiveDate>, &str) {
    if let Some(caps) = DATE_PREFIX.captures(stem) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        let day: u32 = caps[3].parse().unwrap_or(0);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let rest = caps.get(4).unwrap().as_str();
            return (Some(date), &stem[stem.len() - rest.len()..]);
        }
    }
    (None, stem)
}

/// Strips a leading digit run followed by `-`, `_`, or `.`. A bare number
/// followed only by whitespace (a year heading a note, say) is left alone,
/// since punctuation is what distinguishes an ordering prefix from a title.
fn strip_number_prefix(stem: &str) -> (Option<u64>, &str) {
    if let Some(caps) = NUMBER_PREFIX.captures(stem) {
        if let Ok(number) = caps[1].parse::<u64>() {
            let rest = caps.get(2).unwrap().as_str();
            return (Some(number), &stem[stem.len() - rest.len()..]);
        }
    }
    (None, stem)
}

/// Lowercase; spaces/underscores become `-`; anything outside
/// `[a-z0-9-]` is discarded; hyphen runs collapse; leading/trailing
/// hyphens are trimmed. Idempotent.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase().replace([' ', '_'], "-");
    let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
    let collapsed = DASH_RUN.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// `-`/`_` become spaces; each word is title-cased unless it is already
/// entirely uppercase letters (so `FAQ` and `API` survive); repeated
/// whitespace collapses.
pub fn clean_label(input: &str) -> String {
    let spaced = input.replace(['-', '_'], " ");
    let collapsed = WHITESPACE_RUN.replace_all(&spaced, " ");

    collapsed
        .trim()
        .split(' ')
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    if !word.is_empty() && word.chars().all(|c| c.is_ascii_uppercase()) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// Joins segments into an absolute, slash-terminated URL, slugifying
/// each segment (and re-applying prefix stripping to folder segments).
pub fn segments_to_url(segments: &[&str]) -> String {
    let mut url = String::from("/");
    for segment in segments {
        let meta = FileMetadata::from_file_name(segment);
        url.push_str(&meta.slug);
        url.push('/');
    }
    url
}

/// Extracts just the path portion of a configured base URL, e.g.
/// `https://x/volcano/` -> `/volcano`.
pub fn extract_base_path(base_url: &str) -> String {
    let without_scheme = base_url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(base_url);

    let path = without_scheme.split_once('/').map(|(_, p)| p).unwrap_or("");

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Prefixes `url` (always absolute, `/`-rooted) with `base`, collapsing
/// the join so there is never a doubled slash.
pub fn prefix_url(base: &str, url: &str) -> String {
    if base.is_empty() {
        return url.to_string();
    }

    let base = base.trim_end_matches('/');
    if url == "/" {
        format!("{base}/")
    } else {
        format!("{base}{url}")
    }
}
