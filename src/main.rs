use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use news_ingest::cli::{Cli, Commands};
use news_ingest::config::Config;
use news_ingest::domain::{CrawlFrequency, FeedDescriptor, RunFailure, RunReport, RunResult};
use news_ingest::domain::timestamp::format_instant;
use news_ingest::errors::{IngestError, IngestResult};
use news_ingest::logging;
use news_ingest::services::{FeedOptions, FeedService, ImportExportService, IngestService};
use news_ingest::sources::HttpFetcher;
use news_ingest::storage::sqlite::{SqliteArticleRepository, SqliteFeedRepository, SqliteStorage};
use news_ingest::storage::traits::ArticleRepository;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env().context("failed to load configuration")?;
    logging::init(&config.log_level);

    // Initialize storage
    let storage = SqliteStorage::new(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path))?;
    let feed_repo = SqliteFeedRepository::new(storage.clone());

    let code = match cli.command {
        Commands::Add {
            url,
            name,
            source,
            category,
            description,
            frequency,
        } => {
            let options = FeedOptions {
                name,
                source,
                category,
                description,
                crawl_frequency: frequency,
            };
            cmd_add(&url, options, feed_repo)?
        }
        Commands::Remove => cmd_remove(feed_repo)?,
        Commands::List => cmd_list(feed_repo)?,
        Commands::Enable { id } => cmd_set_enabled(feed_repo, id, true)?,
        Commands::Disable { id } => cmd_set_enabled(feed_repo, id, false)?,
        Commands::Import { path } => cmd_import(&path, feed_repo)?,
        Commands::Export { output } => cmd_export(feed_repo, output)?,
        Commands::Crawl { id, json } => {
            let service = ingest_service(&config, storage, feed_repo)?;
            cmd_crawl(&service, id, json)?
        }
        Commands::CrawlAll { json } => {
            let service = ingest_service(&config, storage, feed_repo)?;
            cmd_crawl_all(&service, json)?
        }
        Commands::Articles { limit } => cmd_articles(SqliteArticleRepository::new(storage), limit)?,
    };

    Ok(code)
}

type SqliteIngestService = IngestService<SqliteFeedRepository, SqliteArticleRepository, HttpFetcher>;

fn ingest_service(
    config: &Config,
    storage: SqliteStorage,
    feed_repo: SqliteFeedRepository,
) -> anyhow::Result<SqliteIngestService> {
    let fetcher = HttpFetcher::new(&config.fetch).context("failed to build HTTP client")?;
    Ok(IngestService::new(feed_repo, SqliteArticleRepository::new(storage), fetcher)
        .with_max_parallel(config.max_parallel))
}

fn cmd_add(url: &str, options: FeedOptions, feed_repo: SqliteFeedRepository) -> IngestResult<ExitCode> {
    let service = FeedService::new(feed_repo);

    match service.add(url, options) {
        Ok(feed) => {
            println!("Feed added successfully!");
            println!("  ID: {}", feed.id);
            println!("  Name: {}", feed.name);
            println!("  Source: {}", feed.source);
            if let Some(category) = &feed.category {
                println!("  Category: {}", category);
            }
            if feed.crawl_frequency != CrawlFrequency::default() {
                println!("  Frequency: {}", feed.crawl_frequency);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(IngestError::FeedAlreadyExists(_)) => {
            println!("Feed already exists: {}", url);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(e),
    }
}

fn cmd_remove(feed_repo: SqliteFeedRepository) -> IngestResult<ExitCode> {
    let service = FeedService::new(feed_repo);
    let feeds = service.list()?;

    if feeds.is_empty() {
        println!("No feeds to remove.");
        return Ok(ExitCode::SUCCESS);
    }

    // Display numbered list
    println!("Select a feed to remove:\n");
    for (i, feed) in feeds.iter().enumerate() {
        println!("  {}. {} [{}] ({})", i + 1, feed.name, feed.source, feed.url);
    }
    println!();

    // Read user input
    print!("Enter number (or 'q' to cancel): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    if input.eq_ignore_ascii_case("q") {
        println!("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let index: usize = input
        .parse()
        .map_err(|_| IngestError::InvalidInput("Invalid number".to_string()))?;

    if index == 0 || index > feeds.len() {
        return Err(IngestError::InvalidInput("Number out of range".to_string()));
    }

    let feed = &feeds[index - 1];
    service.remove(feed.id)?;
    println!("Removed: {}", feed.name);

    Ok(ExitCode::SUCCESS)
}

fn print_feed(feed: &FeedDescriptor) {
    let status = if feed.enabled { "enabled" } else { "disabled" };
    println!("  #{} {} [{}] ({})", feed.id, feed.name, feed.source, status);
    println!("    URL: {}", feed.url);
    if let Some(category) = &feed.category {
        println!("    Category: {}", category);
    }
    println!("    Frequency: {}", feed.crawl_frequency);
    match &feed.last_crawled {
        Some(at) => println!("    Last crawled: {}", format_instant(at)),
        None => println!("    Last crawled: never"),
    }
    if feed.error_count > 0 {
        println!(
            "    Errors: {} (last: {})",
            feed.error_count,
            feed.last_error.as_deref().unwrap_or("unknown")
        );
    }
}

fn cmd_list(feed_repo: SqliteFeedRepository) -> IngestResult<ExitCode> {
    let service = FeedService::new(feed_repo);
    let feeds = service.list()?;

    if feeds.is_empty() {
        println!("No feeds configured.");
        return Ok(ExitCode::SUCCESS);
    }

    println!("Configured feeds:\n");
    for feed in &feeds {
        print_feed(feed);
        println!();
    }

    Ok(ExitCode::SUCCESS)
}

fn cmd_set_enabled(feed_repo: SqliteFeedRepository, id: i64, enabled: bool) -> IngestResult<ExitCode> {
    let service = FeedService::new(feed_repo);
    service.set_enabled(id, enabled)?;

    println!("Feed {} {}.", id, if enabled { "enabled" } else { "disabled" });
    Ok(ExitCode::SUCCESS)
}

fn cmd_import(path: &str, feed_repo: SqliteFeedRepository) -> IngestResult<ExitCode> {
    let content = fs::read_to_string(path)?;
    let service = ImportExportService::new(feed_repo);

    println!("Importing feeds from {}...\n", path);

    let result = service.import_opml(&content)?;

    if !result.added.is_empty() {
        println!("Added {} feeds:", result.added.len());
        for feed in &result.added {
            println!("  + {} [{}]", feed.name, feed.source);
        }
        println!();
    }

    if !result.duplicates.is_empty() {
        println!("Skipped {} duplicates:", result.duplicates.len());
        for url in &result.duplicates {
            println!("  - {}", url);
        }
        println!();
    }

    if !result.invalid.is_empty() {
        println!("Failed {} feeds:", result.invalid.len());
        for (url, error) in &result.invalid {
            println!("  ! {}: {}", url, error);
        }
        println!();
    }

    println!(
        "Import complete: {} added, {} duplicates, {} failed",
        result.added.len(),
        result.duplicates.len(),
        result.invalid.len()
    );

    Ok(ExitCode::SUCCESS)
}

fn cmd_export(feed_repo: SqliteFeedRepository, output: Option<String>) -> IngestResult<ExitCode> {
    let service = ImportExportService::new(feed_repo);
    let opml = service.export_opml()?;

    match output {
        Some(path) => {
            fs::write(&path, &opml)?;
            println!("Exported feeds to {}", path);
        }
        None => {
            println!("{}", opml);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn report_json(report: &RunReport) -> serde_json::Value {
    json!({
        "success": true,
        "message": report.message(),
        "feed": report.feed,
        "stats": report.stats,
        "saved_items": report.saved_items,
        "finished_at": format_instant(&report.finished_at),
    })
}

fn failure_json(failure: &RunFailure) -> serde_json::Value {
    json!({
        "success": false,
        "feed_id": failure.feed_id,
        "error": failure.message,
        "class": failure.class,
        "stage": failure.stage,
        "status": failure.class.http_status(),
    })
}

fn result_json(result: &RunResult) -> serde_json::Value {
    match result {
        Ok(report) => report_json(report),
        Err(failure) => failure_json(failure),
    }
}

fn print_result(result: &RunResult) {
    match result {
        Ok(report) => {
            println!("{} ({}): {}", report.feed.name, report.feed.source, report.message());
            for item in &report.saved_items {
                let image = if item.has_image { " [image]" } else { "" };
                println!("  + {}{}", item.title, image);
                println!("    {}", item.url);
            }
        }
        Err(failure) => println!("Crawl failed: {}", failure),
    }
}

fn cmd_crawl(service: &SqliteIngestService, id: i64, json: bool) -> IngestResult<ExitCode> {
    let result = service.run(id);

    if json {
        println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    } else {
        print_result(&result);
    }

    Ok(if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_crawl_all(service: &SqliteIngestService, json: bool) -> IngestResult<ExitCode> {
    let results = service.run_enabled()?;
    let failed = results.iter().filter(|r| r.is_err()).count();

    if json {
        let values: Vec<_> = results.iter().map(result_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(ExitCode::SUCCESS);
    }

    if results.is_empty() {
        println!("No enabled feeds to crawl.");
        return Ok(ExitCode::SUCCESS);
    }

    for result in &results {
        print_result(result);
    }

    let saved: usize = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|report| report.stats.saved)
        .sum();
    println!(
        "\nCrawled {} feeds: {} new articles, {} failed.",
        results.len(),
        saved,
        failed
    );

    Ok(ExitCode::SUCCESS)
}

fn cmd_articles(article_repo: SqliteArticleRepository, limit: usize) -> IngestResult<ExitCode> {
    let articles = article_repo.recent(limit)?;

    if articles.is_empty() {
        println!("No articles stored.");
        return Ok(ExitCode::SUCCESS);
    }

    for article in &articles {
        println!(
            "{}  [{}] {}",
            format_instant(&article.published_at),
            article.source,
            article.title
        );
        println!("    {}", article.url);
    }

    Ok(ExitCode::SUCCESS)
}
