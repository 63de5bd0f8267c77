//! Best-effort usage mirror.
//!
//! The mirror sees topic snapshots and generated articles and can supply
//! prompt overrides. Nothing it does may affect the core flow: every method
//! swallows its own failures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::io::write_atomic;
use crate::models::{Article, ArticleStatus, ProviderKind, TopicBook};

pub trait UsageMirror: Send + Sync {
    fn publish_topic_snapshot(&self, _book: &TopicBook) {}

    fn log_article(&self, _article: &Article) {}

    fn record_topic_usage(&self, _topic_id: u64, _seo_score: Option<f64>) {}

    /// Replacement prompt template for `key`, if one is configured.
    fn read_override(&self, _key: &str) -> Option<String> {
        None
    }
}

/// Mirror that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMirror;

impl UsageMirror for NoopMirror {}

/// Mirror into a local directory:
///
/// - `articles.log`: one JSON line per logged article or usage event
/// - `topics-snapshot.json`: the latest topic collection
/// - `prompts/<key>.txt`: prompt overrides
#[derive(Debug, Clone)]
pub struct FileMirror {
    dir: PathBuf,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum LogLine<'a> {
    Article {
        at: DateTime<Utc>,
        topic_id: u64,
        title: &'a str,
        slug: &'a str,
        category: &'a str,
        word_count: usize,
        api_used: ProviderKind,
        status: ArticleStatus,
    },
    TopicUsed {
        at: DateTime<Utc>,
        topic_id: u64,
        seo_score: Option<f64>,
    },
}

impl FileMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(&self, line: &LogLine<'_>) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(line).map_err(std::io::Error::other)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("articles.log"))?;
        writeln!(file, "{}", json)
    }
}

impl UsageMirror for FileMirror {
    fn publish_topic_snapshot(&self, book: &TopicBook) {
        let path = self.dir.join("topics-snapshot.json");
        let result = serde_json::to_string_pretty(book)
            .map_err(StoreError::from)
            .and_then(|json| write_atomic(&path, json.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "Mirror snapshot failed");
        }
    }

    fn log_article(&self, article: &Article) {
        let line = LogLine::Article {
            at: Utc::now(),
            topic_id: article.topic_id,
            title: &article.title,
            slug: &article.slug,
            category: &article.category,
            word_count: article.word_count,
            api_used: article.api_used,
            status: article.status,
        };
        if let Err(e) = self.append(&line) {
            tracing::warn!(error = %e, "Mirror article log failed");
        }
    }

    fn record_topic_usage(&self, topic_id: u64, seo_score: Option<f64>) {
        let line = LogLine::TopicUsed {
            at: Utc::now(),
            topic_id,
            seo_score,
        };
        if let Err(e) = self.append(&line) {
            tracing::warn!(error = %e, "Mirror usage log failed");
        }
    }

    fn read_override(&self, key: &str) -> Option<String> {
        let path = self.dir.join("prompts").join(format!("{}.txt", key));
        match fs::read_to_string(&path) {
            Ok(text) if !text.trim().is_empty() => {
                tracing::info!(key, "Using prompt override");
                Some(text)
            }
            Ok(_) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read prompt override");
                None
            }
        }
    }
}
