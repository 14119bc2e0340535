use clap::{Parser, Subcommand};

use crate::domain::CrawlFrequency;

#[derive(Parser)]
#[command(name = "news-ingest")]
#[command(about = "RSS/Atom news ingestion with per-feed health tracking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new RSS or Atom feed
    Add {
        /// Feed URL to add
        url: String,

        /// Display name (defaults to the source label)
        #[arg(short, long)]
        name: Option<String>,

        /// Source label stamped on every article (defaults to the URL host)
        #[arg(short, long)]
        source: Option<String>,

        /// Category
        #[arg(short, long)]
        category: Option<String>,

        /// Free-text description
        #[arg(short, long)]
        description: Option<String>,

        /// How often the feed is expected to be crawled (hourly, daily, weekly)
        #[arg(short, long, default_value = "daily")]
        frequency: CrawlFrequency,
    },

    /// Remove a feed (interactive selection)
    Remove,

    /// List all feeds with their health
    List,

    /// Include a feed in batch crawls
    Enable {
        /// Feed ID
        id: i64,
    },

    /// Exclude a feed from batch crawls
    Disable {
        /// Feed ID
        id: i64,
    },

    /// Import feeds from OPML file
    Import {
        /// Path to OPML file
        path: String,
    },

    /// Export feeds to OPML format
    Export {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Crawl a single feed now, even if it is disabled
    Crawl {
        /// Feed ID
        id: i64,

        /// Print the run result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Crawl every enabled feed
    CrawlAll {
        /// Print the run results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the most recently published articles
    Articles {
        /// Number of articles to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
}
