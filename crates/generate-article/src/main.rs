use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use shared::io::open_store;
use shared::{
    published_path, save_article, seasonal_category, topics_path, ClaudeProvider, Config, ContentPipeline,
    FileMirror, GenerationOptions, GoogleNewsClient, NoopMirror, OpenAiProvider, ProviderRouter, RunOutcome,
    TopicDiscoverer, TopicRepository, UsageMirror, UsageReport,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "generate-article")]
#[command(about = "Generate one blog article for the hunting exam blog")]
struct Args {
    /// Only pick topics from this category
    #[arg(short, long, conflicts_with_all = ["rotate", "seasonal"])]
    category: Option<String>,

    /// Pick the category with the fewest published articles
    #[arg(long, conflicts_with = "seasonal")]
    rotate: bool,

    /// Pick the category that fits the current season
    #[arg(long)]
    seasonal: bool,

    /// Generate without saving anything or marking the topic used
    #[arg(long)]
    dry_run: bool,
}

fn print_usage(report: &UsageReport) {
    println!("\n📊 Provider usage ({} calls):", report.total_calls);
    for usage in &report.providers {
        println!("  {:<7} {:>3} calls ({:.1}%)", usage.provider, usage.calls, usage.percentage);
    }
    if report.auxiliary_calls > 0 {
        println!("  + {} follow-up calls (meta description, exam questions)", report.auxiliary_calls);
    }
    println!("  last used: {}", report.last_used);
}

fn pick_category(args: &Args, repo: &TopicRepository) -> Option<String> {
    if let Some(category) = &args.category {
        return Some(category.clone());
    }
    if args.seasonal {
        let seasonal = seasonal_category(Local::now().month());
        if !repo.unused(Some(seasonal), None).is_empty() {
            return Some(seasonal.to_string());
        }
        println!("⚠ No unused topics in seasonal category {}, rotating instead", seasonal);
        return repo.next_category();
    }
    if args.rotate {
        return repo.next_category();
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;
    let settings = config.settings().context("Failed to load settings")?;
    let (openai_key, anthropic_key) = config.provider_keys()?;

    if args.dry_run {
        println!("🧪 Dry run: nothing will be saved");
    }

    let openai = OpenAiProvider::new(openai_key, &settings.providers).context("Failed to create OpenAI client")?;
    let claude = ClaudeProvider::new(anthropic_key, &settings.providers).context("Failed to create Claude client")?;
    let router = ProviderRouter::new(
        Arc::new(openai),
        Arc::new(claude),
        Duration::from_secs(settings.providers.timeout_secs),
    );

    let news = GoogleNewsClient::new().context("Failed to create news client")?;
    let discoverer = TopicDiscoverer::new(Arc::new(news), settings.vocabulary.clone());
    let mirror: Arc<dyn UsageMirror> = if args.dry_run {
        Arc::new(NoopMirror)
    } else {
        Arc::new(FileMirror::new(config.data_dir.join("mirror")))
    };

    let repo = TopicRepository::open(
        open_store(topics_path(&config.data_dir), args.dry_run)?,
        open_store(published_path(&config.data_dir), args.dry_run)?,
        settings.vocabulary.categories.clone(),
    )
    .context("Failed to load topics")?
    .with_discoverer(discoverer)
    .with_mirror(mirror);

    let category = pick_category(&args, &repo);
    match &category {
        Some(category) => println!("\n📂 Category: {}", category),
        None => println!("\n📂 Category: any"),
    }

    let mut pipeline = ContentPipeline::new(
        repo,
        router,
        settings.qa.clone(),
        settings.pipeline.clone(),
        GenerationOptions::from_settings(&settings.providers),
    );

    println!("\n🤖 Generating article...");
    println!("  (This may take a minute...)");
    let outcome = pipeline.run(category.as_deref()).await;

    match outcome {
        RunOutcome::Generated(generated) => {
            let article = &generated.article;
            println!(
                "✓ Generated \"{}\" with {} in {:.1}s ({} attempt{})",
                article.title,
                generated.provider,
                generated.elapsed.as_secs_f64(),
                generated.attempts,
                if generated.attempts == 1 { "" } else { "s" }
            );
            println!(
                "  {} words, {} min read, keyword \"{}\"",
                article.word_count, article.reading_time_minutes, article.primary_keyword
            );
            println!(
                "  SEO score {}/100, {} exam question{}",
                generated.seo.score,
                article.exam_questions.len(),
                if article.exam_questions.len() == 1 { "" } else { "s" }
            );
            for tip in &generated.seo.recommendations {
                println!("  💡 {}", tip);
            }

            if !args.dry_run {
                let path = save_article(&config.data_dir, article).context("Failed to save article")?;
                println!("\n✅ Article saved to: {}", path.display());

                let seo_score = Some(f64::from(generated.seo.score));
                let topics = pipeline.topics_mut();
                let marked = topics.mark_used(article.topic_id, seo_score);
                let recorded = topics.record_publication(article, seo_score);
                if !marked.context("Failed to save topic usage")? {
                    println!("⚠ Topic {} not found, usage not recorded", article.topic_id);
                }
                recorded.context("Failed to save publication log")?;
            }
        }
        RunOutcome::QaFailed {
            article,
            report,
            attempts,
        } => {
            println!("\n⚠ Article failed quality checks after {} attempt(s):", attempts);
            for failure in &report.failures {
                println!("  ✗ {}", failure);
            }
            if !args.dry_run {
                let path = save_article(&config.data_dir, &article).context("Failed to save article for review")?;
                println!("\n📥 Queued for manual review: {}", path.display());
            }
        }
        RunOutcome::NoTopic => {
            println!("No unused topics available. Nothing to do.");
        }
        RunOutcome::GenerationFailed { topic_id, error } => {
            print_usage(&pipeline.router().usage());
            anyhow::bail!("Generation failed for topic {}: {}", topic_id, error);
        }
    }

    print_usage(&pipeline.router().usage());
    Ok(())
}
