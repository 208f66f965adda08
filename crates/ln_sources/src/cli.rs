use chrono::Utc;
use clap::{Args, Subcommand};
use ln_core::{Article, Result};

use crate::manager::Ingestor;

#[derive(Args, Debug)]
pub struct SourceArgs {
    #[command(subcommand)]
    pub command: SourceCommands,
}

#[derive(Subcommand, Debug)]
pub enum SourceCommands {
    /// List configured sources
    List,
    /// Fetch one source, or all of them, and print what came back
    Fetch {
        /// Source name; every source when omitted
        name: Option<String>,
    },
    /// Run one import cycle and store the results
    Run,
    /// Build a draft article from a single page
    Url {
        url: String,
    },
    /// Preview an ad-hoc JSON or RSS feed
    Feed {
        url: String,
    },
}

fn print_article(article: &Article) {
    println!(
        "  {} [{}] {} ({})",
        article.published_at.format("%Y-%m-%d %H:%M"),
        article.category,
        article.title,
        article.url.as_deref().unwrap_or("-")
    );
}

pub async fn handle_command(args: SourceArgs, ingestor: &Ingestor) -> Result<()> {
    match args.command {
        SourceCommands::List => {
            if ingestor.sources().is_empty() {
                println!("No sources configured");
            }
            for source in ingestor.sources() {
                println!("{} {} ({}) {}", source.kind().emoji(), source.name(), source.kind(), source.endpoint());
            }
        }
        SourceCommands::Fetch { name: Some(name) } => {
            let articles = ingestor.fetch_source(&name).await?;
            println!("📰 {}: {} articles", name, articles.len());
            articles.iter().for_each(print_article);
        }
        SourceCommands::Fetch { name: None } => {
            let report = ingestor.fetch_all().await;
            println!("📰 {} articles", report.articles.len());
            report.articles.iter().for_each(print_article);
            for failure in &report.failures {
                eprintln!("❌ {}: {}", failure.source, failure.error);
            }
        }
        SourceCommands::Run => {
            let report = ingestor.run_cycle(Utc::now()).await?;
            println!(
                "📥 fetched {}, stored {}, {} sources failed",
                report.fetched,
                report.stored,
                report.failures.len()
            );
        }
        SourceCommands::Url { url } => {
            let article = ingestor.import_page(&url, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&article)?);
        }
        SourceCommands::Feed { url } => {
            let articles = ingestor.preview_feed(&url, Utc::now()).await?;
            println!("📰 {} items", articles.len());
            articles.iter().for_each(print_article);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: SourceCommands,
    }

    #[test]
    fn test_parse_commands() {
        let cli = TestCli::try_parse_from(["sources", "fetch", "City Desk"]).unwrap();
        assert!(matches!(cli.command, SourceCommands::Fetch { name: Some(ref n) } if n == "City Desk"));

        let cli = TestCli::try_parse_from(["sources", "fetch"]).unwrap();
        assert!(matches!(cli.command, SourceCommands::Fetch { name: None }));

        assert!(TestCli::try_parse_from(["sources", "url"]).is_err());
    }
}
