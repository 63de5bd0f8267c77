use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Selection order, most urgent first.
    pub const TIERS: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicSource {
    #[default]
    Curated,
    Discovered,
}

/// A candidate subject for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub priority: Priority,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub times_used: u32,
    #[serde(default)]
    pub last_used: Option<NaiveDate>,
    #[serde(default)]
    pub last_seo_score: Option<f64>,
    #[serde(default)]
    pub avg_seo_score: Option<f64>,
    #[serde(default)]
    pub source: TopicSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Topic {
    pub fn new(id: u64, title: impl Into<String>, category: impl Into<String>, priority: Priority) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            keywords: Vec::new(),
            priority,
            used: false,
            times_used: 0,
            last_used: None,
            last_seo_score: None,
            avg_seo_score: None,
            source: TopicSource::Curated,
            original_title: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Most secondary keywords a prompt carries.
    pub const MAX_SECONDARY_KEYWORDS: usize = 3;

    /// First keyword, or the whole title when the topic has none.
    pub fn primary_keyword(&self) -> String {
        self.keywords.first().cloned().unwrap_or_else(|| self.title.clone())
    }

    pub fn secondary_keywords(&self) -> &[String] {
        let end = self.keywords.len().min(Self::MAX_SECONDARY_KEYWORDS + 1);
        self.keywords.get(1..end).unwrap_or(&[])
    }
}

/// Curated topic as it appears in a seed file, before an id is assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedTopic {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub priority: Priority,
}

/// The persisted topic collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopicBook {
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl TopicBook {
    pub fn next_id(&self) -> u64 {
        self.topics.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }

    pub fn contains_title(&self, title: &str) -> bool {
        let wanted = title.to_lowercase();
        self.topics.iter().any(|t| t.title.to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Claude,
}

impl ProviderKind {
    pub fn other(self) -> Self {
        match self {
            ProviderKind::OpenAi => ProviderKind::Claude,
            ProviderKind::Claude => ProviderKind::OpenAi,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "openai" => Some(ProviderKind::OpenAi),
            "claude" | "anthropic" => Some(ProviderKind::Claude),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Claude => write!(f, "claude"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Generated,
    QaFailed,
    Published,
}

/// Pipeline output. Persisting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub meta_description: String,
    pub primary_keyword: String,
    pub secondary_keywords: Vec<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub topic_id: u64,
    pub word_count: usize,
    pub reading_time_minutes: u32,
    pub api_used: ProviderKind,
    pub status: ArticleStatus,
    pub language: String,
    pub created_at: DateTime<Utc>,
    /// 0-100, set on articles that passed QA.
    #[serde(default)]
    pub seo_score: Option<u32>,
    #[serde(default)]
    pub exam_questions: Vec<ExamQuestion>,
}

/// Multiple-choice practice question attached to an article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: String,
}

impl ExamQuestion {
    pub const OPTION_COUNT: usize = 4;

    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty()
            && self.options.len() == Self::OPTION_COUNT
            && self.correct_answer < self.options.len()
    }
}

/// Append-only entry linking a published article to its topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub topic_id: u64,
    pub title: String,
    pub slug: String,
    pub category: String,
    pub word_count: usize,
    pub seo_score: Option<f64>,
    pub api_used: ProviderKind,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublicationLog {
    #[serde(default)]
    pub records: Vec<PublicationRecord>,
    #[serde(default)]
    pub total_published: usize,
    #[serde(default)]
    pub last_published: Option<DateTime<Utc>>,
}

/// One result of a news search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub description: String,
}

impl NewsItem {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// Lower-cased title and description, the text every heuristic matches against.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.description).to_lowercase()
    }
}
