use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render markdown in {path}: {message}")]
    Markdown { path: PathBuf, message: String },

    #[error("could not resolve wiki link [[{target}]] in {path}")]
    WikiResolution { path: PathBuf, target: String },

    #[error("found {} broken internal link(s):\n{}", .report.len(), format_report(.report))]
    BrokenLinks {
        report: Vec<(PathBuf, Vec<String>)>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not write asset {name}: {source}")]
    Asset {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("favicon processing failed, skipping PWA icons: {0}")]
    Favicon(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template rendering failed: {0}")]
    Template(String),
}

fn format_report(report: &[(PathBuf, Vec<String>)]) -> String {
    report
        .iter()
        .map(|(page, targets)| {
            format!(
                "  {} -> {}",
                page.display(),
                targets
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Error {
    pub fn scan(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Scan {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn asset(name: impl Into<String>, source: std::io::Error) -> Self {
        Error::Asset {
            name: name.into(),
            source,
        }
    }

    pub fn broken_links(report: Vec<(PathBuf, Vec<String>)>) -> Self {
        Error::BrokenLinks { report }
    }
}
