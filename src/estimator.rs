use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::combiner::collect_md_files;
use crate::fmt::group_thousands;

static RE_FENCED_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static RE_INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`[^`]+`").unwrap());
// Front matter only counts when anchored at the very start of the file;
// a leading blank line means the block is treated as prose.
static RE_FRONT_MATTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\A---\n.*?\n---\n").unwrap());
static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#+\s").unwrap());
static RE_BOLD_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static RE_ITALIC_STAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static RE_BOLD_UNDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"__([^_]+)__").unwrap());
static RE_ITALIC_UNDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"_([^_]+)_").unwrap());
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").unwrap());
static RE_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap());

/// Estimates word and printed-page counts for a directory of markdown
/// chapters and prints a per-file report table.
pub struct Estimator {
    dir: PathBuf,
    words_per_page: u32,
}

impl Estimator {
    pub fn new(dir: impl Into<PathBuf>, words_per_page: u32) -> Self {
        Self {
            dir: dir.into(),
            words_per_page,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let md_files = collect_md_files(&self.dir).await?;

        if md_files.is_empty() {
            info!("No .md files found in {}", self.dir.display());
            return Ok(());
        }

        info!("Analyzing {} markdown files...", md_files.len());

        println!("{:<40} {:>10} {:>8}", "File", "Words", "Pages");
        println!("{}", "-".repeat(60));

        let mut total_words: u64 = 0;
        for path in &md_files {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let words = count_words(&content) as u64;
            let pages = words as f64 / self.words_per_page as f64;
            total_words += words;

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("{:<40} {:>10} {:>8.1}", name, group_thousands(words), pages);
        }

        let total_pages = total_words as f64 / self.words_per_page as f64;

        println!("{}", "-".repeat(60));
        println!(
            "{:<40} {:>10} {:>8.1}",
            "TOTAL",
            group_thousands(total_words),
            total_pages
        );
        println!();
        println!("Estimated book length: {:.0} pages", total_pages);
        println!("Total word count: {} words", group_thousands(total_words));
        println!();
        println!("Assumptions: {} words per page", self.words_per_page);

        Ok(())
    }
}

/// Removes markdown markup, keeping the prose. Best-effort regex stripping,
/// not a markdown parser: nested or malformed markup is not specially
/// handled, and the substitution order matters.
pub fn strip_markup(content: &str) -> String {
    let content = RE_FENCED_CODE.replace_all(content, "");
    let content = RE_INLINE_CODE.replace_all(&content, "");
    let content = RE_FRONT_MATTER.replace_all(&content, "");
    let content = RE_HEADING.replace_all(&content, "");
    let content = RE_BOLD_STAR.replace_all(&content, "$1");
    let content = RE_ITALIC_STAR.replace_all(&content, "$1");
    let content = RE_BOLD_UNDER.replace_all(&content, "$1");
    let content = RE_ITALIC_UNDER.replace_all(&content, "$1");
    // Images before links, so alt text is dropped rather than kept as a word
    let content = RE_IMAGE.replace_all(&content, "");
    let content = RE_LINK.replace_all(&content, "$1");
    content.into_owned()
}

/// Counts whitespace-delimited tokens after markup removal.
pub fn count_words(content: &str) -> usize {
    strip_markup(content).split_whitespace().count()
}
