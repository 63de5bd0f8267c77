// Public modules
pub mod config;
pub mod discovery;
pub mod error;
pub mod formatting;
pub mod io;
pub mod mirror;
pub mod models;
pub mod news;
pub mod pipeline;
pub mod prompt;
pub mod providers;
pub mod qa;
pub mod relevance;
pub mod router;
pub mod seo;
pub mod topics;
pub mod vocabulary;

// Re-export commonly used types
pub use config::{Config, Settings};
pub use discovery::{DiscoveryReport, TopicDiscoverer, TopicSink};
pub use error::{ConfigError, NewsError, ProviderError, RouterError, StoreError};
pub use io::{published_path, save_article, topics_path, CollectionStore, JsonFileStore, MemoryStore};
pub use mirror::{FileMirror, NoopMirror, UsageMirror};
pub use models::{Article, ArticleStatus, ExamQuestion, Priority, ProviderKind, PublicationLog, Topic, TopicBook};
pub use news::{GoogleNewsClient, NewsSearch};
pub use pipeline::{ContentPipeline, GeneratedArticle, RunOutcome};
pub use providers::{ClaudeProvider, GenerationOptions, GenerationProvider, OpenAiProvider};
pub use qa::{QaGate, QaReport};
pub use relevance::RelevanceScorer;
pub use router::{ProviderRouter, UsageReport};
pub use seo::SeoReport;
pub use topics::{seasonal_category, TopicRepository, TopicStatistics};
pub use vocabulary::Vocabulary;
