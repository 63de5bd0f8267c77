use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shared::config::{PipelineSettings, QaSettings};
use shared::{
    ArticleStatus, ContentPipeline, GenerationOptions, GenerationProvider, MemoryStore, NewsError, NewsSearch,
    Priority, ProviderError, ProviderKind, ProviderRouter, PublicationLog, RunOutcome, Topic, TopicBook,
    TopicDiscoverer, TopicRepository, UsageMirror, Vocabulary,
};
use shared::models::NewsItem;

const FILLER: &str = "de jager ziet het wild van dichtbij in een veld met dekking voor zijn hond";

/// Markdown article of roughly 650 words with about 1.3% keyword density.
fn dutch_article(keyword: &str) -> String {
    let paragraph = format!("{} {}", keyword, vec![FILLER; 7].join(" "));
    format!(
        "# Reewild herkennen voor het examen\n\n\
         Meta beschrijving: Alles over reewild voor je jachtexamen.\n\n\
         {p}\n\n{p}\n\n## Kenmerken\n\n{p}\n\n{p}\n\n## Gedrag\n\n* Schemer\n* Nacht\n\n{p}\n\n{p}",
        p = paragraph
    )
}

/// Title, meta line and four `## ` sections of `reewild reewild` plus
/// `words_per_section` filler words. The markup holds
/// `4 * (words_per_section + 3)` words, the raw reply 18 more.
fn sectioned_article(words_per_section: usize) -> String {
    let filler: Vec<&str> = FILLER.split(' ').collect();
    let mut text = String::from(
        "# Reewild herkennen voor het examen\n\nMeta beschrijving: Alles over reewild voor je jachtexamen.",
    );
    for heading in ["Kenmerken", "Gedrag", "Sporen", "Examen"] {
        let body = filler.iter().cycle().take(words_per_section).copied().collect::<Vec<_>>().join(" ");
        text.push_str(&format!("\n\n## {}\n\nreewild reewild {}", heading, body));
    }
    text
}

struct FakeProvider {
    kind: ProviderKind,
    responses: Mutex<VecDeque<Result<String, ProviderError>>>,
    fallback: Result<String, ProviderError>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    fn new(kind: ProviderKind, fallback: Result<String, ProviderError>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            responses: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn then(self: Arc<Self>, response: Result<String, ProviderError>) -> Arc<Self> {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let queued = self.responses.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| self.fallback.clone())
    }
}

struct FakeNews(Vec<NewsItem>);

#[async_trait]
impl NewsSearch for FakeNews {
    async fn search(&self, _query: &str) -> Result<Vec<NewsItem>, NewsError> {
        Ok(self.0.clone())
    }
}

struct OverrideMirror;

impl UsageMirror for OverrideMirror {
    fn read_override(&self, key: &str) -> Option<String> {
        (key == "blog").then(|| "EIGEN SJABLOON {topic} / {primary_keyword}".to_string())
    }
}

fn reewild_topic() -> Topic {
    Topic::new(7, "Reewild herkennen", "wild", Priority::High).with_keywords(["reewild", "ree"])
}

fn repo(topics: Vec<Topic>) -> TopicRepository {
    TopicRepository::open(
        Box::new(MemoryStore::with_value(TopicBook {
            topics,
            last_updated: None,
        })),
        Box::new(MemoryStore::<PublicationLog>::new()),
        Vocabulary::default().categories,
    )
    .unwrap()
    .with_rng(StdRng::seed_from_u64(7))
}

fn pipeline(
    repo: TopicRepository,
    openai: Arc<FakeProvider>,
    claude: Arc<FakeProvider>,
    settings: PipelineSettings,
) -> ContentPipeline {
    let router = ProviderRouter::new(openai, claude, Duration::from_secs(5));
    ContentPipeline::new(repo, router, QaSettings::default(), settings, GenerationOptions::default())
}

fn ok(text: String) -> Result<String, ProviderError> {
    Ok(text)
}

#[tokio::test]
async fn generates_formatted_article() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude.clone(), PipelineSettings::default());

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };
    let article = &generated.article;

    assert_eq!(generated.provider, ProviderKind::Claude);
    assert_eq!(generated.attempts, 1);
    assert_eq!(article.status, ArticleStatus::Generated);
    assert_eq!(article.title, "Reewild herkennen voor het examen");
    assert_eq!(article.slug, "reewild-herkennen-voor-het-examen");
    assert_eq!(article.meta_description, "Alles over reewild voor je jachtexamen.");
    assert_eq!(article.primary_keyword, "reewild");
    assert_eq!(article.secondary_keywords, vec!["ree"]);
    assert_eq!(article.topic_id, 7);
    assert_eq!(article.category, "wild");
    assert_eq!(article.api_used, ProviderKind::Claude);
    assert!(article.content.contains("<h2>Kenmerken</h2>"));
    assert!(article.content.contains("<ul>\n<li>Schemer</li>\n<li>Nacht</li>\n</ul>"));
    assert!(!article.content.contains("Meta beschrijving"));
    assert!(!article.content.contains("<h1>"));
    assert!(article.excerpt.chars().count() <= 163);
    assert!(article.excerpt.ends_with("..."));
    assert_eq!(article.reading_time_minutes, 3);
    assert!(claude.prompts()[0].contains("ONDERWERP: Reewild herkennen"));
    assert!(generated.seo.score > 0);
    assert_eq!(article.seo_score, Some(generated.seo.score));
    assert!(article.exam_questions.is_empty());

    // Usage is the caller's decision.
    assert!(!pipeline.topics().get(7).unwrap().used);
}

#[tokio::test]
async fn format_is_idempotent_on_pipeline_output() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, PipelineSettings::default());

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    assert_eq!(pipeline.reformat(&generated.article), generated.article);
}

#[tokio::test]
async fn short_article_goes_to_review() {
    let short = "# Kort\n\nTe kort artikel over reewild.".to_string();
    let claude = FakeProvider::new(ProviderKind::Claude, ok(short.clone()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(short));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), PipelineSettings::default());

    let RunOutcome::QaFailed { article, report, attempts } = pipeline.run(None).await else {
        panic!("expected a QA failure");
    };

    assert_eq!(attempts, 1);
    assert_eq!(article.status, ArticleStatus::QaFailed);
    assert!(!report.passed());
    assert_eq!(claude.prompts().len() + openai.prompts().len(), 1);
    assert!(!pipeline.topics().get(7).unwrap().used);
}

#[tokio::test]
async fn regeneration_is_bounded_and_alternates() {
    let short = "Te kort.".to_string();
    let claude = FakeProvider::new(ProviderKind::Claude, ok(short.clone()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(short));
    let settings = PipelineSettings {
        regenerate_on_qa_failure: true,
        max_regeneration_attempts: 50,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), settings);

    let RunOutcome::QaFailed { attempts, .. } = pipeline.run(None).await else {
        panic!("expected a QA failure");
    };

    assert_eq!(attempts, shared::pipeline::MAX_GENERATION_ATTEMPTS);
    assert_eq!(claude.prompts().len(), 3);
    assert_eq!(openai.prompts().len(), 2);
}

#[tokio::test]
async fn regeneration_recovers_on_second_attempt() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok("Te kort.".to_string()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let settings = PipelineSettings {
        regenerate_on_qa_failure: true,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, settings);

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };
    assert_eq!(generated.attempts, 2);
    assert_eq!(generated.provider, ProviderKind::OpenAi);
}

#[tokio::test]
async fn rejected_provider_fails_over_once() {
    let claude = FakeProvider::new(ProviderKind::Claude, Err(ProviderError::Rejected("policy".to_string())));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude.clone(), PipelineSettings::default());

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };
    assert_eq!(generated.provider, ProviderKind::OpenAi);
    assert_eq!(claude.prompts().len(), 1);
}

#[tokio::test]
async fn failed_generation_leaves_topic_untouched() {
    let claude = FakeProvider::new(ProviderKind::Claude, Err(ProviderError::Transient("503".to_string())));
    let openai = FakeProvider::new(ProviderKind::OpenAi, Err(ProviderError::Rejected("400".to_string())));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), PipelineSettings::default());

    let RunOutcome::GenerationFailed { topic_id, error } = pipeline.run(None).await else {
        panic!("expected a generation failure");
    };

    assert_eq!(topic_id, 7);
    assert_eq!(error.primary, ProviderKind::Claude);
    assert_eq!(claude.prompts().len(), 1);
    assert_eq!(openai.prompts().len(), 1);
    let topic = pipeline.topics().get(7).unwrap();
    assert!(!topic.used);
    assert_eq!(topic.times_used, 0);
}

#[tokio::test]
async fn empty_supply_is_nothing_to_do() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let mut pipeline = pipeline(repo(vec![]), openai.clone(), claude.clone(), PipelineSettings::default());

    assert!(matches!(pipeline.run(None).await, RunOutcome::NoTopic));
    assert!(claude.prompts().is_empty());
    assert!(openai.prompts().is_empty());
}

#[tokio::test]
async fn discovered_topic_feeds_the_pipeline() {
    let vocabulary = Vocabulary {
        search_queries: vec!["jachtseizoen {current_year}".to_string()],
        min_relevance_score: 0.25,
        ..Vocabulary::default()
    };
    let news = FakeNews(vec![NewsItem::new("Jachtseizoen geopend", "wild en natuur in het veld")]);
    let repo = repo(vec![]).with_discoverer(TopicDiscoverer::new(Arc::new(news), vocabulary).with_year(2025));

    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("jacht")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("jacht")));
    let mut pipeline = pipeline(repo, openai, claude, PipelineSettings::default());

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };
    assert_eq!(generated.article.topic_id, 1);
    assert_eq!(generated.article.primary_keyword, "jacht");
    assert_eq!(pipeline.topics().topics().len(), 1);
}

#[tokio::test]
async fn prompt_override_replaces_default_template() {
    let repo = repo(vec![reewild_topic()]).with_mirror(Arc::new(OverrideMirror));
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let mut pipeline = pipeline(repo, openai, claude.clone(), PipelineSettings::default());

    pipeline.run(None).await;

    assert_eq!(claude.prompts()[0], "EIGEN SJABLOON Reewild herkennen / reewild");
}

#[tokio::test]
async fn meta_description_requested_from_same_provider() {
    let body = dutch_article("reewild").replace("Meta beschrijving: Alles over reewild voor je jachtexamen.\n\n", "");
    let claude = FakeProvider::new(ProviderKind::Claude, ok(body.clone()))
        .then(ok(body))
        .then(ok("\"Herken reewild in het veld en slaag voor je jachtexamen.\"".to_string()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(String::new()));
    let settings = PipelineSettings {
        request_meta_description: true,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), settings);

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    assert_eq!(
        generated.article.meta_description,
        "Herken reewild in het veld en slaag voor je jachtexamen."
    );
    assert_eq!(claude.prompts().len(), 2);
    assert!(claude.prompts()[1].contains("meta beschrijving"));
    assert!(openai.prompts().is_empty());
}

#[tokio::test]
async fn overlong_provider_meta_falls_back_to_template() {
    let body = dutch_article("reewild").replace("Meta beschrijving: Alles over reewild voor je jachtexamen.\n\n", "");
    let claude = FakeProvider::new(ProviderKind::Claude, ok("x".repeat(400))).then(ok(body));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(String::new()));
    let settings = PipelineSettings {
        request_meta_description: true,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, settings);

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    let meta = &generated.article.meta_description;
    assert!(meta.starts_with("Leer alles over reewild"));
    assert!(meta.chars().count() <= 160);
}

#[tokio::test]
async fn qa_counts_words_of_the_saved_markup() {
    // 514 words as sent by the provider, 496 once converted.
    let claude = FakeProvider::new(ProviderKind::Claude, ok(sectioned_article(121)));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(sectioned_article(121)));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, PipelineSettings::default());

    let RunOutcome::QaFailed { article, report, .. } = pipeline.run(None).await else {
        panic!("expected a QA failure");
    };

    assert_eq!(report.word_count, 496);
    assert_eq!(article.word_count, report.word_count);
    assert_eq!(article.status, ArticleStatus::QaFailed);
}

#[tokio::test]
async fn article_at_the_word_floor_passes() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok(sectioned_article(122)));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(sectioned_article(122)));
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, PipelineSettings::default());

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    assert_eq!(generated.article.word_count, 500);
    assert_eq!(generated.article.status, ArticleStatus::Generated);
}

#[tokio::test]
async fn rejected_draft_survives_a_later_provider_failure() {
    let claude = FakeProvider::new(ProviderKind::Claude, Err(ProviderError::Transient("503".to_string())))
        .then(ok("Te kort.".to_string()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, Err(ProviderError::Rejected("400".to_string())));
    let settings = PipelineSettings {
        regenerate_on_qa_failure: true,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), settings);

    let RunOutcome::QaFailed { article, report, attempts } = pipeline.run(None).await else {
        panic!("expected the rejected draft");
    };

    assert_eq!(attempts, 2);
    assert_eq!(article.status, ArticleStatus::QaFailed);
    assert_eq!(article.content, "<p>Te kort.</p>");
    assert!(!report.passed());
    assert_eq!(claude.prompts().len(), 2);
    assert_eq!(openai.prompts().len(), 1);
    assert!(!pipeline.topics().get(7).unwrap().used);
}

#[tokio::test]
async fn excerpt_length_is_capped() {
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(dutch_article("reewild")));
    let settings = PipelineSettings {
        excerpt_length: 1000,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai, claude, settings);

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    assert!(generated.article.excerpt.chars().count() <= 163);
    assert!(generated.article.excerpt.ends_with("..."));
}

#[tokio::test]
async fn exam_questions_come_from_the_generating_provider() {
    let questions = r#"[{"question": "Wanneer is reewild het meest actief?", "options": ["Ochtend", "Middag", "Schemer", "Nacht"], "correct_answer": 2, "explanation": "Reeen zijn schemerdieren.", "difficulty": "makkelijk"}]"#;
    let claude = FakeProvider::new(ProviderKind::Claude, ok(dutch_article("reewild")))
        .then(ok(dutch_article("reewild")))
        .then(ok(questions.to_string()));
    let openai = FakeProvider::new(ProviderKind::OpenAi, ok(String::new()));
    let settings = PipelineSettings {
        generate_exam_questions: true,
        ..PipelineSettings::default()
    };
    let mut pipeline = pipeline(repo(vec![reewild_topic()]), openai.clone(), claude.clone(), settings);

    let RunOutcome::Generated(generated) = pipeline.run(None).await else {
        panic!("expected a generated article");
    };

    let article = &generated.article;
    assert_eq!(article.exam_questions.len(), 1);
    assert_eq!(article.exam_questions[0].options[2], "Schemer");
    assert_eq!(claude.prompts().len(), 2);
    assert!(claude.prompts()[1].contains("HOOFDONDERWERP: Reewild herkennen voor het examen"));
    assert!(openai.prompts().is_empty());

    let usage = pipeline.router().usage();
    assert_eq!(usage.total_calls, 1);
    assert_eq!(usage.auxiliary_calls, 1);
}
