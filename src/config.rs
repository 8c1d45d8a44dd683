//! Site-wide configuration, loaded from an optional `volcano.json` and
//! narrowed further by CLI overrides.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Raw, fully-optional shape of `volcano.json`. Every field mirrors a
/// `Config` field; absent fields fall back to `Config::default()`.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    output: Option<PathBuf>,
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    og_image: Option<String>,
    favicon: Option<PathBuf>,
    theme: Option<String>,
    css: Option<PathBuf>,
    accent_color: Option<String>,
    top_nav: Option<bool>,
    breadcrumbs: Option<bool>,
    page_nav: Option<bool>,
    instant_nav: Option<bool>,
    inline_assets: Option<bool>,
    pwa: Option<bool>,
    search: Option<bool>,
    allow_broken_links: Option<bool>,
}

/// Fully resolved build configuration. Every field has a concrete value;
/// `volcano.json` only ever narrows the defaults, and CLI flags narrow
/// it further still.
#[derive(Debug, Clone)]
pub struct Config {
    pub output: PathBuf,
    pub title: String,
    pub url: String,
    pub author: Option<String>,
    pub og_image: Option<String>,
    pub favicon: Option<PathBuf>,
    pub theme: String,
    pub css: Option<PathBuf>,
    pub accent_color: Option<String>,
    pub top_nav: bool,
    pub breadcrumbs: bool,
    pub page_nav: bool,
    pub instant_nav: bool,
    pub inline_assets: bool,
    pub pwa: bool,
    pub search: bool,
    pub allow_broken_links: bool,
    /// Not part of `volcano.json`; toggled by the CLI's `--no-color` flag.
    color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output: PathBuf::from("site"),
            title: "Documentation".to_string(),
            url: String::new(),
            author: None,
            og_image: None,
            favicon: None,
            theme: "default".to_string(),
            css: None,
            accent_color: None,
            top_nav: true,
            breadcrumbs: true,
            page_nav: true,
            instant_nav: false,
            inline_assets: false,
            pwa: true,
            search: true,
            allow_broken_links: false,
            color: true,
        }
    }
}

impl Config {
    /// Looks for `volcano.json` at the input root; returns the defaults
    /// unchanged if it is absent.
    pub fn load(input_dir: &Path) -> Result<Self> {
        let path = match Self::find(input_dir) {
            Some(path) => path,
            None => return Ok(Config::default()),
        };

        let raw_text = fs::read_to_string(&path)?;
        let raw: RawConfig = serde_json::from_str(&raw_text)?;
        let mut config = Config::default();
        config.apply_raw(raw);
        config.validate()?;
        Ok(config)
    }

    fn find(input_dir: &Path) -> Option<PathBuf> {
        let path = input_dir.join("volcano.json");
        path.exists().then_some(path)
    }

    fn apply_raw(&mut self, raw: RawConfig) {
        if let Some(v) = raw.output {
            self.output = v;
        }
        if let Some(v) = raw.title {
            self.title = v;
        }
        if let Some(v) = raw.url {
            self.url = v;
        }
        if raw.author.is_some() {
            self.author = raw.author;
        }
        if raw.og_image.is_some() {
            self.og_image = raw.og_image;
        }
        if raw.favicon.is_some() {
            self.favicon = raw.favicon;
        }
        if let Some(v) = raw.theme {
            self.theme = v;
        }
        if raw.css.is_some() {
            self.css = raw.css;
        }
        if raw.accent_color.is_some() {
            self.accent_color = raw.accent_color;
        }
        if let Some(v) = raw.top_nav {
            self.top_nav = v;
        }
        if let Some(v) = raw.breadcrumbs {
            self.breadcrumbs = v;
        }
        if let Some(v) = raw.page_nav {
            self.page_nav = v;
        }
        if let Some(v) = raw.instant_nav {
            self.instant_nav = v;
        }
        if let Some(v) = raw.inline_assets {
            self.inline_assets = v;
        }
        if let Some(v) = raw.pwa {
            self.pwa = v;
        }
        if let Some(v) = raw.search {
            self.search = v;
        }
        if let Some(v) = raw.allow_broken_links {
            self.allow_broken_links = v;
        }
    }

    /// Checks values that can be validated without touching the scanned
    /// tree (format of `accent_color`; tree-relative checks such as
    /// favicon existence happen once a `Site` is available).
    fn validate(&self) -> Result<()> {
        if let Some(accent) = &self.accent_color {
            validate_hex_color(accent)?;
        }
        Ok(())
    }

    /// The path portion of `url`, e.g. `/volcano` for
    /// `https://example.com/volcano/`.
    pub fn base_path(&self) -> String {
        crate::slug::extract_base_path(&self.url)
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    pub fn disable_colors(&mut self) {
        self.color = false;
    }
}

fn validate_hex_color(value: &str) -> Result<()> {
    let stripped = value.strip_prefix('#').unwrap_or(value);
    let valid_len = stripped.len() == 3 || stripped.len() == 6;
    if valid_len && stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(Error::config(format!("invalid accent_color: {value}")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.title, "Documentation");
        assert!(config.breadcrumbs);
    }

    #[test]
    fn partial_config_only_overrides_named_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("volcano.json"),
            r##"{"title": "My Docs", "accent_color": "#3b82f6"}"##,
        )
        .unwrap();

        let config = Config::load(tmp.path()).unwrap();
        assert_eq!(config.title, "My Docs");
        assert_eq!(config.accent_color.as_deref(), Some("#3b82f6"));
        assert!(config.search, "unspecified fields keep their default");
    }

    #[test]
    fn invalid_accent_color_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("volcano.json"), r#"{"accent_color": "not-a-color"}"#).unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn base_path_derives_from_url() {
        let mut config = Config::default();
        config.url = "https://example.com/docs/".to_string();
        assert_eq!(config.base_path(), "/docs");
    }
}
