//! CSS theming (minification, accent-color override) and content-hashed
//! asset filenames for the site's CSS and client JS.

use include_dir::{include_dir, Dir};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fs;

use crate::config::Config;
use crate::{Error, Result};

static BUILTIN_ASSETS: Dir = include_dir!("$CARGO_MANIFEST_DIR/assets");

static CSS_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static PUNCT_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([{}:;,])\s*").unwrap());
static TRAILING_SEMI: Lazy<Regex> = Lazy::new(|| Regex::new(r";}").unwrap());

/// A logical asset in either its referenced or inlined form — never
/// both, since `inline_assets` applies uniformly to a build.
pub enum Asset {
    External { href: String },
    Inline { content: String },
}

impl Asset {
    pub fn href(&self) -> Option<&str> {
        match self {
            Asset::External { href } => Some(href),
            Asset::Inline { .. } => None,
        }
    }

    pub fn inline(&self) -> Option<&str> {
        match self {
            Asset::Inline { content } => Some(content),
            Asset::External { .. } => None,
        }
    }
}

/// The site-wide assets a build needs exactly once: the theme
/// stylesheet, the copy-button script, and the search client script
/// when search is enabled. Computed once per build (or once per serve
/// request) and shared by every page, so every `<link>`/`<script>` tag
/// on the site resolves to the one set of bytes actually written.
pub struct SiteAssets {
    pub css: (Asset, Vec<u8>),
    pub copy_button: (Asset, Vec<u8>),
    pub search: Option<(Asset, Vec<u8>)>,
}

impl SiteAssets {
    pub fn build(config: &Config) -> Result<Self> {
        let css = build_css(config)?;
        let copy_button = build_js(config, "copy-button.js")?;
        let search = if config.search { Some(build_js(config, "search.js")?) } else { None };
        Ok(Self { css, copy_button, search })
    }
}

/// Strips comments, collapses whitespace, tightens spacing around
/// selector/declaration punctuation, and drops the trailing `;` before
/// a `}`. `!important` is untouched since it never borders punctuation.
pub fn minify_css(css: &str) -> String {
    let without_comments = CSS_COMMENT.replace_all(css, "");
    let collapsed = WHITESPACE_RUN.replace_all(&without_comments, " ");
    let tightened = PUNCT_SPACING.replace_all(&collapsed, "$1");
    let no_trailing_semi = TRAILING_SEMI.replace_all(&tightened, "}");
    no_trailing_semi.trim().to_string()
}

/// An override block appended after the base theme so cascade order
/// lets it win without needing `!important`.
pub fn accent_override_block(accent: &str) -> String {
    format!(":root{{--accent:{accent};}}")
}

/// First 8 hex characters of the SHA-256 digest of `bytes`. Identical
/// bytes always produce the identical hash.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

/// `{name}.{hash8}.{ext}`, content-addressed so unchanged assets keep a
/// stable cache-busting filename across builds.
pub fn hashed_filename(name: &str, ext: &str, bytes: &[u8]) -> String {
    format!("{name}.{}.{ext}", content_hash(bytes))
}

fn load_css(config: &Config) -> Result<String> {
    if let Some(path) = &config.css {
        fs::read_to_string(path).map_err(|e| Error::asset(path.display().to_string(), e))
    } else {
        let file_name = format!("themes/{}.css", config.theme);
        BUILTIN_ASSETS
            .get_file(&file_name)
            .and_then(|f| f.contents_utf8())
            .map(str::to_string)
            .ok_or_else(|| Error::config(format!("unknown theme: {}", config.theme)))
    }
}

/// Builds the site's stylesheet: base theme, plus an accent override if
/// configured, minified, then emitted either inline or content-hashed
/// at `{base}/assets/{name}`, per `inline_assets`.
pub fn build_css(config: &Config) -> Result<(Asset, Vec<u8>)> {
    let mut css = load_css(config)?;
    if let Some(accent) = &config.accent_color {
        css.push_str(&accent_override_block(accent));
    }
    let minified = minify_css(&css);
    let bytes = minified.clone().into_bytes();

    if config.inline_assets {
        return Ok((Asset::Inline { content: minified }, bytes));
    }

    let filename = hashed_filename("theme", "css", &bytes);
    let asset = Asset::External {
        href: format!("{}/assets/{filename}", config.base_path()),
    };
    Ok((asset, bytes))
}

/// Builds one of the static client scripts (`search.js`, `copy-button.js`)
/// shipped in `assets/`, honoring `inline_assets`.
pub fn build_js(config: &Config, source_name: &str) -> Result<(Asset, Vec<u8>)> {
    let file = BUILTIN_ASSETS
        .get_file(source_name)
        .ok_or_else(|| Error::config(format!("missing built-in asset: {source_name}")))?;
    let content = file
        .contents_utf8()
        .ok_or_else(|| Error::config(format!("built-in asset {source_name} is not valid UTF-8")))?
        .to_string();
    let bytes = content.clone().into_bytes();

    if config.inline_assets {
        return Ok((Asset::Inline { content }, bytes));
    }

    let stem = source_name.trim_end_matches(".js");
    let filename = hashed_filename(stem, "js", &bytes);
    let asset = Asset::External {
        href: format!("{}/assets/{filename}", config.base_path()),
    };
    Ok((asset, bytes))
}

/// Builds one of the site's asset files, returning it paired with its
/// written bytes so the caller can compute the filename for an external
/// asset (inline ones have already been embedded and need no write).
pub fn build(config: &Config, source_name: &str) -> Result<(Asset, Vec<u8>)> {
    if source_name == "theme.css" {
        build_css(config)
    } else {
        build_js(config, source_name)
    }
}

/// The on-disk filename for an external asset (`None` for inline ones,
/// which have nothing to write).
pub fn external_filename(asset: &Asset) -> Option<String> {
    match asset {
        Asset::External { href } => Some(href.rsplit('/').next().unwrap_or(href).to_string()),
        Asset::Inline { .. } => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn minify_strips_comments_and_collapses_whitespace() {
        let css = "/* header */\nbody {\n  color:  red;\n}\n";
        assert_eq!(minify_css(css), "body{color:red}");
    }

    #[test]
    fn minify_preserves_important() {
        let css = "a { color: red !important; }";
        assert_eq!(minify_css(css), "a{color:red !important}");
    }

    #[test]
    fn content_hash_is_deterministic_and_eight_chars() {
        let a = content_hash(b"hello");
        let b = content_hash(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_ne!(a, content_hash(b"world"));
    }

    #[test]
    fn build_css_with_accent_embeds_override_block() {
        let mut config = Config::default();
        config.accent_color = Some("#ff0000".to_string());
        let (asset, _) = build_css(&config).unwrap();
        match asset {
            Asset::External { href } => assert!(href.starts_with("/assets/theme.")),
            Asset::Inline { .. } => panic!("expected external asset by default"),
        }
    }

    #[test]
    fn build_css_inline_when_configured() {
        let mut config = Config::default();
        config.inline_assets = true;
        let (asset, _) = build_css(&config).unwrap();
        match asset {
            Asset::Inline { content } => assert!(content.contains("--accent")),
            Asset::External { .. } => panic!("expected inline asset"),
        }
    }

    #[test]
    fn unknown_theme_is_an_error() {
        let mut config = Config::default();
        config.theme = "does-not-exist".to_string();
        assert!(build_css(&config).is_err());
    }

    #[test]
    fn site_assets_skips_search_when_disabled() {
        let mut config = Config::default();
        config.search = false;
        let assets = SiteAssets::build(&config).unwrap();
        assert!(assets.search.is_none());
        assert!(assets.css.0.href().unwrap().starts_with("/assets/theme."));
    }

    #[test]
    fn site_assets_builds_search_when_enabled() {
        let mut config = Config::default();
        config.search = true;
        let assets = SiteAssets::build(&config).unwrap();
        assert!(assets.search.is_some());
    }
}
