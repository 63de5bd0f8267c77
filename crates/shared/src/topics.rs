//! Topic selection and usage bookkeeping.
//!
//! [`TopicRepository`] owns the topic collection and the publication log.
//! Every mutation is applied in memory first and then saved; a failed save
//! is logged and returned to the caller but never rolled back.

use chrono::{DateTime, Local, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::discovery::{DiscoveryReport, TopicDiscoverer, TopicSink};
use crate::error::StoreError;
use crate::io::CollectionStore;
use crate::mirror::{NoopMirror, UsageMirror};
use crate::models::{Article, Priority, PublicationLog, PublicationRecord, SeedTopic, Topic, TopicBook, TopicSource};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: usize,
    pub used: usize,
    pub unused: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStatistics {
    pub total_topics: usize,
    pub used_topics: usize,
    pub unused_topics: usize,
    pub usage_percentage: f64,
    pub categories: Vec<CategoryStats>,
    pub total_published: usize,
    pub last_published: Option<DateTime<Utc>>,
}

pub struct TopicRepository {
    book: TopicBook,
    history: PublicationLog,
    topic_store: Box<dyn CollectionStore<TopicBook>>,
    history_store: Box<dyn CollectionStore<PublicationLog>>,
    categories: Vec<String>,
    discoverer: Option<TopicDiscoverer>,
    mirror: Arc<dyn UsageMirror>,
    rng: StdRng,
}

impl TopicRepository {
    /// Load both collections. `categories` is the fixed category list, in
    /// tie-break order.
    pub fn open(
        topic_store: Box<dyn CollectionStore<TopicBook>>,
        history_store: Box<dyn CollectionStore<PublicationLog>>,
        categories: Vec<String>,
    ) -> Result<Self, StoreError> {
        let book = topic_store.load()?;
        let history = history_store.load()?;

        tracing::info!(
            topics = book.topics.len(),
            published = history.records.len(),
            "Loaded topic collections"
        );

        Ok(Self {
            book,
            history,
            topic_store,
            history_store,
            categories,
            discoverer: None,
            mirror: Arc::new(NoopMirror),
            rng: StdRng::from_entropy(),
        })
    }

    /// Discovery runs when every tier is empty.
    pub fn with_discoverer(mut self, discoverer: TopicDiscoverer) -> Self {
        self.discoverer = Some(discoverer);
        self
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn UsageMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn mirror(&self) -> Arc<dyn UsageMirror> {
        Arc::clone(&self.mirror)
    }

    pub fn topics(&self) -> &[Topic] {
        &self.book.topics
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn get(&self, topic_id: u64) -> Option<&Topic> {
        self.book.topics.iter().find(|t| t.id == topic_id)
    }

    pub fn unused(&self, category: Option<&str>, priority: Option<Priority>) -> Vec<&Topic> {
        self.book
            .topics
            .iter()
            .filter(|t| !t.used && in_category(t, category))
            .filter(|t| priority.map_or(true, |p| t.priority == p))
            .collect()
    }

    /// Next topic to write about: a random unused topic from the most urgent
    /// non-empty tier. When every tier is empty, discovery runs once and the
    /// selection is retried if it added anything.
    pub async fn next(&mut self, category: Option<&str>) -> Option<Topic> {
        if let Some(topic) = self.pick(category) {
            return Some(topic);
        }

        tracing::info!(category = ?category, "No unused topics, running discovery");
        let report = self.discover().await;
        if report.added == 0 {
            tracing::info!("Discovery added no topics");
            return None;
        }
        self.pick(category)
    }

    fn pick(&mut self, category: Option<&str>) -> Option<Topic> {
        let topics = &self.book.topics;
        for tier in Priority::TIERS {
            let candidates: Vec<&Topic> = topics
                .iter()
                .filter(|t| !t.used && t.priority == tier && in_category(t, category))
                .collect();
            if let Some(topic) = candidates.choose(&mut self.rng) {
                tracing::debug!(id = topic.id, priority = %tier, "Selected topic");
                return Some((*topic).clone());
            }
        }
        None
    }

    /// Among categories with at least one unused topic, the one with the
    /// fewest publications. Ties go to the earlier category in the list.
    pub fn next_category(&self) -> Option<String> {
        let distribution = self.category_distribution();
        self.categories
            .iter()
            .filter(|c| !self.unused(Some(c.as_str()), None).is_empty())
            .min_by_key(|c| distribution.get(c.as_str()).copied().unwrap_or(0))
            .cloned()
    }

    /// Published article count per category.
    pub fn category_distribution(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.history.records {
            *counts.entry(record.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Returns `Ok(false)` for an unknown id. On a failed save the topic
    /// stays marked in memory.
    pub fn mark_used(&mut self, topic_id: u64, seo_score: Option<f64>) -> Result<bool, StoreError> {
        let Some(topic) = self.book.topics.iter_mut().find(|t| t.id == topic_id) else {
            tracing::error!(topic_id, "Topic not found");
            return Ok(false);
        };

        topic.used = true;
        topic.times_used += 1;
        topic.last_used = Some(Local::now().date_naive());
        if let Some(score) = seo_score {
            topic.last_seo_score = Some(score);
            // Two-point average of the previous average and the new score.
            topic.avg_seo_score = Some(match topic.avg_seo_score {
                Some(avg) => (avg + score) / 2.0,
                None => score,
            });
        }
        tracing::info!(topic_id, title = %topic.title, times_used = topic.times_used, "Marked topic as used");

        self.book.last_updated = Some(Utc::now());
        self.mirror.record_topic_usage(topic_id, seo_score);
        self.save_topics()?;
        Ok(true)
    }

    /// Append a publication record for `article`. Records are never edited.
    pub fn record_publication(&mut self, article: &Article, seo_score: Option<f64>) -> Result<(), StoreError> {
        let record = PublicationRecord {
            topic_id: article.topic_id,
            title: article.title.clone(),
            slug: article.slug.clone(),
            category: article.category.clone(),
            word_count: article.word_count,
            seo_score,
            api_used: article.api_used,
            published_at: Utc::now(),
        };

        self.history.last_published = Some(record.published_at);
        self.history.records.push(record);
        self.history.total_published = self.history.records.len();
        self.mirror.log_article(article);

        self.history_store.save(&self.history).map_err(|e| {
            tracing::error!(error = %e, "Failed to save publication log");
            e
        })
    }

    /// Add curated topics, skipping titles that already exist. Returns the
    /// number added.
    pub fn import_curated(&mut self, seeds: Vec<SeedTopic>) -> Result<usize, StoreError> {
        let mut added = 0;
        for seed in seeds {
            let topic = Topic::new(self.book.next_id(), seed.title, seed.category, seed.priority)
                .with_keywords(seed.keywords);
            if self.add_topic(topic)? {
                added += 1;
            }
        }
        tracing::info!(added, "Imported curated topics");
        Ok(added)
    }

    /// Run discovery now. Without a discoverer this is a no-op.
    pub async fn discover(&mut self) -> DiscoveryReport {
        let Some(discoverer) = self.discoverer.take() else {
            tracing::warn!("Discovery requested but no news source is configured");
            return DiscoveryReport::default();
        };
        let report = discoverer.discover(&mut *self).await;
        self.discoverer = Some(discoverer);
        report
    }

    pub fn statistics(&self) -> TopicStatistics {
        let topics = &self.book.topics;
        let total = topics.len();
        let used = topics.iter().filter(|t| t.used).count();

        let categories = self
            .categories
            .iter()
            .map(|category| {
                let in_category: Vec<&Topic> = topics.iter().filter(|t| &t.category == category).collect();
                let used = in_category.iter().filter(|t| t.used).count();
                CategoryStats {
                    category: category.clone(),
                    total: in_category.len(),
                    used,
                    unused: in_category.len() - used,
                }
            })
            .collect();

        TopicStatistics {
            total_topics: total,
            used_topics: used,
            unused_topics: total - used,
            usage_percentage: if total > 0 {
                used as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            categories,
            total_published: self.history.total_published,
            last_published: self.history.last_published,
        }
    }

    fn save_topics(&self) -> Result<(), StoreError> {
        if let Err(e) = self.topic_store.save(&self.book) {
            tracing::error!(error = %e, "Failed to save topics");
            return Err(e);
        }
        self.mirror.publish_topic_snapshot(&self.book);
        Ok(())
    }
}

impl TopicSink for TopicRepository {
    fn next_topic_id(&self) -> u64 {
        self.book.next_id()
    }

    fn add_topic(&mut self, topic: Topic) -> Result<bool, StoreError> {
        if self.book.contains_title(&topic.title) {
            tracing::debug!(title = %topic.title, "Skipping duplicate topic");
            return Ok(false);
        }
        if topic.source == TopicSource::Discovered {
            tracing::info!(id = topic.id, category = %topic.category, "New discovered topic");
        }
        self.book.topics.push(topic);
        self.book.last_updated = Some(Utc::now());
        self.save_topics()?;
        Ok(true)
    }
}

fn in_category(topic: &Topic, category: Option<&str>) -> bool {
    category.map_or(true, |c| topic.category.eq_ignore_ascii_case(c))
}

/// Category that fits the time of year: spring `planten`, summer
/// `examenvoorbereiding`, autumn `wild`, winter `veiligheid`.
pub fn seasonal_category(month: u32) -> &'static str {
    match month {
        3..=5 => "planten",
        6..=8 => "examenvoorbereiding",
        9..=11 => "wild",
        _ => "veiligheid",
    }
}
