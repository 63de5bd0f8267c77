//! Topic discovery from the news feed.
//!
//! Runs every configured search query, keeps at most `results_per_query`
//! items per query, and turns each relevant item into a medium-priority
//! topic. Accepted topics are handed to the sink one at a time, so a failure
//! halfway through leaves every earlier topic persisted.

use chrono::{Datelike, Local, Utc};
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{NewsItem, Priority, Topic, TopicSource};
use crate::news::NewsSearch;
use crate::relevance::RelevanceScorer;
use crate::vocabulary::Vocabulary;

/// Destination for discovered topics.
pub trait TopicSink {
    fn next_topic_id(&self) -> u64;

    /// Adds and persists one topic. `Ok(false)` means a topic with the same
    /// title (case-insensitive) already exists and nothing was added.
    fn add_topic(&mut self, topic: Topic) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Topics that entered the collection, including ones whose save failed.
    pub added: usize,
    pub duplicates: usize,
    pub irrelevant: usize,
    pub failed_queries: usize,
    pub failed_saves: usize,
}

pub struct TopicDiscoverer {
    news: Arc<dyn NewsSearch>,
    scorer: RelevanceScorer,
    vocabulary: Vocabulary,
    year: Option<i32>,
}

impl TopicDiscoverer {
    pub fn new(news: Arc<dyn NewsSearch>, vocabulary: Vocabulary) -> Self {
        Self {
            news,
            scorer: RelevanceScorer::from_vocabulary(&vocabulary),
            vocabulary,
            year: None,
        }
    }

    /// Pin the year used in query templates and fallback titles.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    fn year(&self) -> i32 {
        self.year.unwrap_or_else(|| Local::now().year())
    }

    pub fn queries(&self) -> Vec<String> {
        let year = self.year().to_string();
        self.vocabulary
            .search_queries
            .iter()
            .map(|q| q.replace("{current_year}", &year))
            .collect()
    }

    pub async fn discover(&self, sink: &mut (dyn TopicSink + Send)) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for query in self.queries() {
            tracing::info!(query = %query, "Searching news");

            let results = match self.news.search(&query).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "News search failed");
                    report.failed_queries += 1;
                    continue;
                }
            };

            for item in results.iter().take(self.vocabulary.results_per_query) {
                if !self.scorer.is_relevant(item) {
                    report.irrelevant += 1;
                    continue;
                }
                let Some(topic) = self.topic_from_news(item, sink.next_topic_id()) else {
                    report.irrelevant += 1;
                    continue;
                };

                let title = topic.title.clone();
                match sink.add_topic(topic) {
                    Ok(true) => {
                        tracing::info!(title = %title, "Added discovered topic");
                        report.added += 1;
                    }
                    Ok(false) => report.duplicates += 1,
                    Err(e) => {
                        tracing::error!(title = %title, error = %e, "Discovered topic kept in memory but not saved");
                        report.added += 1;
                        report.failed_saves += 1;
                    }
                }
            }
        }

        tracing::info!(
            added = report.added,
            duplicates = report.duplicates,
            failed_queries = report.failed_queries,
            "Discovery finished"
        );
        report
    }

    /// Synthesize a topic, or `None` when no title can be derived.
    pub fn topic_from_news(&self, item: &NewsItem, id: u64) -> Option<Topic> {
        let haystack = item.haystack();
        let title = self.blog_title(&haystack)?;

        Some(Topic {
            keywords: self.extract_keywords(&haystack),
            source: TopicSource::Discovered,
            original_title: Some(item.title.clone()),
            created_at: Some(Utc::now()),
            ..Topic::new(id, title, self.category_for(&haystack), Priority::Medium)
        })
    }

    fn blog_title(&self, haystack: &str) -> Option<String> {
        if let Some(rule) = self.vocabulary.title_rules.iter().find(|r| r.matches(haystack)) {
            return Some(rule.title.clone());
        }

        self.vocabulary
            .fallback_title_keywords
            .iter()
            .any(|k| haystack.contains(k.as_str()))
            .then(|| {
                self.vocabulary
                    .fallback_title
                    .replace("{year}", &self.year().to_string())
            })
    }

    fn extract_keywords(&self, haystack: &str) -> Vec<String> {
        self.vocabulary
            .topic_keywords
            .iter()
            .filter(|k| haystack.contains(k.as_str()))
            .take(self.vocabulary.max_topic_keywords)
            .cloned()
            .collect()
    }

    fn category_for(&self, haystack: &str) -> String {
        self.vocabulary
            .category_keywords
            .iter()
            .find(|entry| entry.keywords.iter().any(|k| haystack.contains(k.as_str())))
            .map(|entry| entry.category.clone())
            .unwrap_or_else(|| self.vocabulary.default_category.clone())
    }
}
