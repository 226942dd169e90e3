use anyhow::Result;
use bookpress::{Combiner, Estimator, Renderer};
use clap::{Parser, Subcommand};
use colored::*;
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bookpress")]
#[command(about = "CLI utilities for assembling a book from markdown chapter files")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Combine chapter files into a single text file and report statistics
    Combine {
        /// Directory containing the .md chapter files
        #[arg(short = 'd', long = "dir", default_value = "./chapters")]
        dir: String,

        /// Output file path for the combined text
        #[arg(short = 'o', long = "output", default_value = "combined_book.txt")]
        output: String,

        /// Text inserted between consecutive chapters
        #[arg(short = 's', long = "separator", default_value = "\n\n---\n\n")]
        separator: String,
    },
    /// Estimate word and printed-page counts from markdown chapters
    Count {
        /// Directory containing the .md chapter files
        #[arg(short = 'd', long = "dir", default_value = "./chapters")]
        dir: String,

        /// Average words per printed page (250 suits novels, 300-350
        /// technical books, 200-250 large print)
        #[arg(short = 'w', long = "words-per-page", default_value = "250", value_parser = parse_ratio)]
        words_per_page: u32,
    },
    /// Render chapter files into a book-paginated PDF
    Render {
        /// Directory containing the chapter files (.md or .markdown)
        input_dir: String,

        /// Output PDF path (".pdf" is appended when missing)
        output_pdf: String,
    },
}

fn parse_ratio(s: &str) -> Result<u32, String> {
    let value = s.parse::<u32>().map_err(|_| "Not a number.")?;
    if value == 0 {
        return Err("Must be a positive number.".to_string());
    }
    Ok(value)
}

#[tokio::main]
async fn main() {
    // Set up logging with chromiumoxide errors suppressed
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("bookpress=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Combine { dir, output, separator } => {
            let combiner = Combiner::new(dir, output, separator);
            combiner.run().await
        }
        Commands::Count { dir, words_per_page } => {
            let estimator = Estimator::new(dir, words_per_page);
            estimator.run().await
        }
        Commands::Render { input_dir, output_pdf } => {
            let renderer = Renderer::new(input_dir, &output_pdf);
            renderer.run().await
        }
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
