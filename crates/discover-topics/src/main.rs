use anyhow::{Context, Result};
use clap::Parser;
use shared::io::{load_seed_topics, open_store};
use shared::{
    published_path, topics_path, Config, FileMirror, GoogleNewsClient, TopicDiscoverer, TopicRepository,
    TopicStatistics,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "discover-topics")]
#[command(about = "Import curated topics and discover new ones from the news")]
struct Args {
    /// Curated seed file to import (JSON array of topics without ids)
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Only print statistics, skip discovery
    #[arg(long)]
    stats: bool,

    /// Print statistics as JSON
    #[arg(long)]
    json: bool,
}

fn print_statistics(stats: &TopicStatistics) {
    println!(
        "\n📊 Topics: {} total, {} used, {} unused ({:.1}% used)",
        stats.total_topics, stats.used_topics, stats.unused_topics, stats.usage_percentage
    );
    for category in &stats.categories {
        println!(
            "  {:<20} {:>3} total  {:>3} used  {:>3} unused",
            category.category, category.total, category.used, category.unused
        );
    }
    match stats.last_published {
        Some(at) => println!("  {} published, last on {}", stats.total_published, at.format("%Y-%m-%d %H:%M")),
        None => println!("  nothing published yet"),
    }
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

    let news = GoogleNewsClient::new().context("Failed to create news client")?;
    let mut repo = TopicRepository::open(
        open_store(topics_path(&config.data_dir), false)?,
        open_store(published_path(&config.data_dir), false)?,
        settings.vocabulary.categories.clone(),
    )
    .context("Failed to load topics")?
    .with_discoverer(TopicDiscoverer::new(Arc::new(news), settings.vocabulary.clone()))
    .with_mirror(Arc::new(FileMirror::new(config.data_dir.join("mirror"))));

    if let Some(seed) = &args.seed {
        println!("\n🌱 Importing curated topics from {}...", seed.display());
        let seeds = load_seed_topics(seed).context("Failed to read seed file")?;
        let total = seeds.len();
        let added = repo.import_curated(seeds).context("Failed to save imported topics")?;
        println!("✓ Imported {} of {} topics ({} already present)", added, total, total - added);
    }

    if !args.stats {
        println!("\n📰 Searching the news for new topics...");
        let report = repo.discover().await;
        println!(
            "✓ Added {} topics ({} duplicates, {} irrelevant)",
            report.added, report.duplicates, report.irrelevant
        );
        if report.failed_queries > 0 {
            println!("⚠ {} search queries failed", report.failed_queries);
        }
        if report.failed_saves > 0 {
            anyhow::bail!("{} discovered topics could not be saved", report.failed_saves);
        }
    }

    let stats = repo.statistics();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_statistics(&stats);
    }

    Ok(())
}
