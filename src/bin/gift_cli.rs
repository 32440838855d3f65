//! Terminal client for a running gift-advisor server.
//!
//! Composes a prompt from filter flags, loads one or more pages and prints the cards.

use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gift_advisor::client::{HttpBackend, PromptFilters, RecommendationSession};

#[derive(Debug, Parser)]
#[command(name = "gift-cli", about = "Ask a gift-advisor server for gift ideas")]
struct Args {
    /// Base URL of the server
    #[arg(long, default_value = "http://localhost:3000")]
    server: String,

    /// Who the gift is for, e.g. "sister"
    #[arg(long)]
    relationship: Option<String>,

    #[arg(long)]
    age: Option<u32>,

    /// e.g. "birthday", "wedding"
    #[arg(long)]
    occasion: Option<String>,

    #[arg(long, default_value = "$")]
    currency: String,

    #[arg(long = "min", default_value_t = 50)]
    budget_min: u32,

    #[arg(long = "max", default_value_t = 500)]
    budget_max: u32,

    /// Repeat for several interests
    #[arg(long = "interest")]
    interests: Vec<String>,

    /// Send this text verbatim instead of composing one from the filters
    #[arg(long)]
    query: Option<String>,

    /// How many pages to load
    #[arg(long, default_value_t = 1)]
    pages: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let prompt = match args.query {
        Some(query) => query,
        None => PromptFilters {
            relationship: args.relationship,
            age: args.age,
            occasion: args.occasion,
            currency: args.currency,
            budget_min: args.budget_min,
            budget_max: args.budget_max,
            interests: args.interests,
        }
        .compose(),
    };
    println!("Prompt: {prompt}\n");

    let mut session = RecommendationSession::new(HttpBackend::new(&args.server));
    for _ in 0..args.pages.max(1) {
        session.submit(&prompt).await;
        if let Some(err) = session.error() {
            bail!("{err}");
        }
    }

    for card in session.cards() {
        println!("{}. {}", card.index, card.name);
        println!("   {}", card.price);
        println!("   {}", card.why);
        println!("   {}\n", card.image_url);
    }
    Ok(())
}
