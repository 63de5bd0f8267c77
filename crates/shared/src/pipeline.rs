//! One topic-to-article run.
//!
//! ```text
//! SELECT_TOPIC -> BUILD_PROMPT -> GENERATE -> VALIDATE -> FORMAT -> DONE
//!                                                 \
//!                                                  -> QA_FAILED
//! ```
//!
//! The pipeline never persists articles or marks topics used; the caller
//! does that once it has decided what to do with the outcome.

use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::{PipelineSettings, QaSettings};
use crate::error::RouterError;
use crate::formatting;
use crate::models::{Article, ArticleStatus, ExamQuestion, ProviderKind, Topic};
use crate::prompt::{
    build_prompt, exam_questions_prompt, meta_description_prompt, Prompt, BLOG_PROMPT_KEY, DEFAULT_TEMPLATE,
};
use crate::providers::GenerationOptions;
use crate::qa::{QaGate, QaReport};
use crate::router::ProviderRouter;
use crate::seo::{self, SeoReport};
use crate::topics::TopicRepository;

/// Generation attempts per run never exceed this, whatever the settings say.
pub const MAX_GENERATION_ATTEMPTS: u32 = 5;

const META_MAX_CHARS: usize = 160;
const EXCERPT_MAX_CHARS: usize = 160;
const SLUG_MAX_LEN: usize = 50;
const META_MAX_TOKENS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SelectTopic,
    BuildPrompt,
    Generate,
    Validate,
    Format,
    Done,
    QaFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SelectTopic => "SELECT_TOPIC",
            Stage::BuildPrompt => "BUILD_PROMPT",
            Stage::Generate => "GENERATE",
            Stage::Validate => "VALIDATE",
            Stage::Format => "FORMAT",
            Stage::Done => "DONE",
            Stage::QaFailed => "QA_FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedArticle {
    pub article: Article,
    pub provider: ProviderKind,
    pub elapsed: Duration,
    pub attempts: u32,
    pub seo: SeoReport,
}

#[derive(Debug)]
pub enum RunOutcome {
    Generated(GeneratedArticle),
    /// The last draft failed QA and belongs in manual review. A later attempt
    /// that failed at both providers still ends here.
    QaFailed {
        article: Article,
        report: QaReport,
        attempts: u32,
    },
    /// No unused topic, even after discovery.
    NoTopic,
    /// Both providers failed. The topic is left untouched.
    GenerationFailed { topic_id: u64, error: RouterError },
}

/// Fields produced by the FORMAT stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatted {
    pub title: String,
    pub slug: String,
    pub content: String,
    pub excerpt: String,
    pub word_count: usize,
    pub reading_time_minutes: u32,
}

pub struct ContentPipeline {
    topics: TopicRepository,
    router: ProviderRouter,
    qa: QaGate,
    settings: PipelineSettings,
    options: GenerationOptions,
}

impl ContentPipeline {
    pub fn new(
        topics: TopicRepository,
        router: ProviderRouter,
        qa: QaSettings,
        settings: PipelineSettings,
        options: GenerationOptions,
    ) -> Self {
        Self {
            topics,
            router,
            qa: QaGate::new(qa),
            settings,
            options,
        }
    }

    pub fn topics(&self) -> &TopicRepository {
        &self.topics
    }

    pub fn topics_mut(&mut self) -> &mut TopicRepository {
        &mut self.topics
    }

    pub fn router(&self) -> &ProviderRouter {
        &self.router
    }

    fn max_attempts(&self) -> u32 {
        if self.settings.regenerate_on_qa_failure {
            self.settings.max_regeneration_attempts.clamp(1, MAX_GENERATION_ATTEMPTS)
        } else {
            1
        }
    }

    pub async fn run(&mut self, category: Option<&str>) -> RunOutcome {
        tracing::info!(stage = %Stage::SelectTopic, category = ?category, "Selecting topic");
        match self.topics.next(category).await {
            Some(topic) => self.run_for_topic(topic).await,
            None => {
                tracing::info!("No topic available, nothing to do");
                RunOutcome::NoTopic
            }
        }
    }

    pub async fn run_for_topic(&mut self, topic: Topic) -> RunOutcome {
        let started = Instant::now();
        tracing::info!(stage = %Stage::BuildPrompt, topic_id = topic.id, title = %topic.title, "Building prompt");
        let prompt = self.prompt_for(&topic);

        let max_attempts = self.max_attempts();
        let mut attempt = 0;
        let mut rejected: Option<(Article, QaReport)> = None;
        loop {
            attempt += 1;
            tracing::info!(stage = %Stage::Generate, attempt, max_attempts, "Requesting article text");
            let generation = match self.router.call(&prompt.text, &self.options, None).await {
                Ok(generation) => generation,
                Err(error) => {
                    tracing::error!(topic_id = topic.id, attempt, error = %error, "Generation failed");
                    if let Some((article, report)) = rejected {
                        tracing::warn!(stage = %Stage::QaFailed, title = %article.title, "Queued last rejected draft for manual review");
                        return RunOutcome::QaFailed {
                            article,
                            report,
                            attempts: attempt,
                        };
                    }
                    return RunOutcome::GenerationFailed {
                        topic_id: topic.id,
                        error,
                    };
                }
            };

            // The gate measures the markup that gets saved, not the raw reply.
            let formatted = self.format(&generation.text, &topic.title);
            tracing::info!(stage = %Stage::Validate, provider = %generation.provider, words = formatted.word_count, "Validating article");
            let report = self.qa.validate(&formatted.content, &prompt.primary_keyword);

            if report.passed() {
                tracing::info!(stage = %Stage::Format, "Completing article metadata");
                let meta = self.meta_description(&generation.text, &topic, &prompt, generation.provider).await;
                let mut article = self.assemble(
                    &topic,
                    &prompt,
                    formatted,
                    meta,
                    generation.provider,
                    ArticleStatus::Generated,
                );
                article.exam_questions = self.exam_questions(&article, generation.provider).await;
                let seo = seo::score_article(&article);
                article.seo_score = Some(seo.score);

                let elapsed = started.elapsed();
                tracing::info!(
                    stage = %Stage::Done,
                    title = %article.title,
                    provider = %generation.provider,
                    seo_score = seo.score,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Article generated"
                );
                return RunOutcome::Generated(GeneratedArticle {
                    article,
                    provider: generation.provider,
                    elapsed,
                    attempts: attempt,
                    seo,
                });
            }

            tracing::warn!(attempt, max_attempts, failures = %report.summary(), "Article failed QA");
            let meta = formatting::extract_meta_description(&generation.text)
                .map(|meta| formatting::truncate_chars(&meta, META_MAX_CHARS))
                .unwrap_or_else(|| fallback_meta(&prompt.primary_keyword));
            let article = self.assemble(
                &topic,
                &prompt,
                formatted,
                meta,
                generation.provider,
                ArticleStatus::QaFailed,
            );
            if attempt >= max_attempts {
                tracing::warn!(stage = %Stage::QaFailed, title = %article.title, "Queued for manual review");
                return RunOutcome::QaFailed {
                    article,
                    report,
                    attempts: attempt,
                };
            }
            rejected = Some((article, report));
        }
    }

    fn prompt_for(&self, topic: &Topic) -> Prompt {
        let template = self
            .topics
            .mirror()
            .read_override(BLOG_PROMPT_KEY)
            .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
        build_prompt(&template, topic)
    }

    /// Meta line from the text, else a provider-written one when enabled,
    /// else a template. Always at most 160 characters.
    async fn meta_description(&mut self, raw: &str, topic: &Topic, prompt: &Prompt, provider: ProviderKind) -> String {
        if let Some(meta) = formatting::extract_meta_description(raw) {
            return formatting::truncate_chars(&meta, META_MAX_CHARS);
        }

        if self.settings.request_meta_description {
            let title = formatting::extract_title(raw, &topic.title);
            let request = meta_description_prompt(&title, &prompt.primary_keyword);
            let options = self.options.clone().with_max_tokens(META_MAX_TOKENS);
            match self.router.call_auxiliary(&request, &options, Some(provider)).await {
                Ok(generation) => {
                    let meta = generation.text.trim().trim_matches('"').trim();
                    if !meta.is_empty() && meta.chars().count() <= META_MAX_CHARS {
                        return meta.to_string();
                    }
                    tracing::debug!(chars = meta.chars().count(), "Provider meta description rejected");
                }
                Err(e) => tracing::warn!(error = %e, "Meta description request failed"),
            }
        }

        fallback_meta(&prompt.primary_keyword)
    }

    fn assemble(
        &self,
        topic: &Topic,
        prompt: &Prompt,
        formatted: Formatted,
        meta_description: String,
        provider: ProviderKind,
        status: ArticleStatus,
    ) -> Article {
        Article {
            title: formatted.title,
            slug: formatted.slug,
            content: formatted.content,
            excerpt: formatted.excerpt,
            meta_description,
            primary_keyword: prompt.primary_keyword.clone(),
            secondary_keywords: prompt.secondary_keywords.clone(),
            tags: topic.keywords.clone(),
            category: topic.category.clone(),
            topic_id: topic.id,
            word_count: formatted.word_count,
            reading_time_minutes: formatted.reading_time_minutes,
            api_used: provider,
            status,
            language: self.settings.language.clone(),
            created_at: Utc::now(),
            seo_score: None,
            exam_questions: Vec::new(),
        }
    }

    /// Multiple-choice questions from the provider that wrote the article.
    /// Any failure leaves the article without questions.
    async fn exam_questions(&mut self, article: &Article, provider: ProviderKind) -> Vec<ExamQuestion> {
        if !self.settings.generate_exam_questions {
            return Vec::new();
        }
        let request = exam_questions_prompt(&article.title, &formatting::strip_tags(&article.content));
        match self.router.call_auxiliary(&request, &self.options, Some(provider)).await {
            Ok(generation) => parse_exam_questions(&generation.text),
            Err(e) => {
                tracing::warn!(error = %e, "Exam question request failed");
                Vec::new()
            }
        }
    }

    /// FORMAT stage. Running it on its own output changes nothing.
    pub fn format(&self, raw: &str, fallback_title: &str) -> Formatted {
        let title = formatting::extract_title(raw, fallback_title);
        let content = formatting::to_markup(raw);
        let word_count = formatting::word_count(&content);
        Formatted {
            slug: formatting::slugify(&title, SLUG_MAX_LEN),
            excerpt: formatting::excerpt(&content, self.settings.excerpt_length.min(EXCERPT_MAX_CHARS)),
            reading_time_minutes: formatting::reading_time_minutes(word_count, self.settings.words_per_minute),
            title,
            content,
            word_count,
        }
    }

    /// Re-run FORMAT over an existing article.
    pub fn reformat(&self, article: &Article) -> Article {
        let formatted = self.format(&article.content, &article.title);
        Article {
            title: formatted.title,
            slug: formatted.slug,
            content: formatted.content,
            excerpt: formatted.excerpt,
            word_count: formatted.word_count,
            reading_time_minutes: formatted.reading_time_minutes,
            ..article.clone()
        }
    }
}

/// Well-formed questions from the first JSON array in `text`.
fn parse_exam_questions(text: &str) -> Vec<ExamQuestion> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        tracing::warn!("No JSON array in exam question reply");
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<ExamQuestion>>(&text[start..=end]) {
        Ok(questions) => questions.into_iter().filter(ExamQuestion::is_well_formed).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse exam questions");
            Vec::new()
        }
    }
}

fn fallback_meta(primary_keyword: &str) -> String {
    let text = format!(
        "Leer alles over {} voor je jachtexamen. Praktische tips, examenvragen en actuele regels. Start nu met oefenen!",
        primary_keyword
    );
    formatting::truncate_chars(&text, META_MAX_CHARS)
}
