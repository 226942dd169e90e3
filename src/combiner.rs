use anyhow::{anyhow, Result};
use colored::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::fmt::group_thousands;

/// Concatenates a directory of markdown chapters into one text file, each
/// chapter preceded by a `# <filename>` header and separated by a
/// configurable delimiter.
pub struct Combiner {
    dir: PathBuf,
    output: PathBuf,
    separator: String,
}

impl Combiner {
    pub fn new(dir: impl Into<PathBuf>, output: impl Into<PathBuf>, separator: String) -> Self {
        Self {
            dir: dir.into(),
            output: output.into(),
            separator,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let md_files = collect_md_files(&self.dir).await?;

        if md_files.is_empty() {
            info!("No .md files found in {}", self.dir.display());
            return Ok(());
        }

        info!("Found {} markdown files:", md_files.len());
        for path in &md_files {
            info!("  - {}", file_name(path).blue());
        }

        info!("Combining into {}...", self.output.display().to_string().green());

        let mut combined = String::new();
        for (i, path) in md_files.iter().enumerate() {
            let content = fs::read_to_string(path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            combined.push_str(&format!("# {}\n\n", file_name(path)));
            combined.push_str(&content);

            // Separator between chapters, never after the last one
            if i < md_files.len() - 1 {
                combined.push_str(&self.separator);
            }
        }

        fs::write(&self.output, &combined)
            .await
            .map_err(|e| anyhow!("Failed to write {}: {}", self.output.display(), e))?;

        let size_kb = combined.len() as f64 / 1024.0;
        let lines = combined.lines().count();
        let words = combined.split_whitespace().count();

        info!("Successfully combined {} files", md_files.len());
        info!("Output file: {}", self.output.display().to_string().green());
        info!("File size: {:.1} KB", size_kb);
        info!("Total lines: {}", group_thousands(lines as u64));
        info!("Total words: {}", group_thousands(words as u64));

        Ok(())
    }
}

/// Lists `*.md` files directly under `dir`, sorted lexicographically by
/// filename. A missing directory yields an empty list, matching the
/// not-fatal policy of the combine and count commands.
pub(crate) async fn collect_md_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| anyhow!("Failed to read directory {}: {}", dir.display(), e))?;
    let mut md_files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "md") {
            md_files.push(path);
        }
    }

    md_files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(md_files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SEP: &str = "\n\n---\n\n";

    #[tokio::test]
    async fn empty_directory_produces_no_output() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("combined.txt");

        let combiner = Combiner::new(tmp.path(), &output, SEP.to_string());
        combiner.run().await.unwrap();

        assert!(!output.exists());
    }

    #[tokio::test]
    async fn headers_and_separators() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.md"), "alpha body").unwrap();
        std::fs::write(tmp.path().join("b.md"), "beta body").unwrap();
        std::fs::write(tmp.path().join("c.md"), "gamma body").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let output = tmp.path().join("combined.txt");
        let combiner = Combiner::new(tmp.path(), &output, SEP.to_string());
        combiner.run().await.unwrap();

        let combined = std::fs::read_to_string(&output).unwrap();
        assert_eq!(combined.matches("# a.md\n\n").count(), 1);
        assert_eq!(combined.matches("# b.md\n\n").count(), 1);
        assert_eq!(combined.matches("# c.md\n\n").count(), 1);
        // N files, N-1 separators
        assert_eq!(combined.matches(SEP).count(), 2);
        assert!(!combined.ends_with(SEP));
    }

    #[tokio::test]
    async fn chapter_content_is_preserved_verbatim() {
        let tmp = TempDir::new().unwrap();
        let body = "# Real Heading\n\nText with *markup* and\ttabs\nand trailing spaces  \n";
        std::fs::write(tmp.path().join("only.md"), body).unwrap();

        let output = tmp.path().join("combined.txt");
        let combiner = Combiner::new(tmp.path(), &output, SEP.to_string());
        combiner.run().await.unwrap();

        let combined = std::fs::read_to_string(&output).unwrap();
        assert_eq!(combined, format!("# only.md\n\n{}", body));
    }

    #[tokio::test]
    async fn files_are_sorted_lexicographically() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("ch2.md"), "two").unwrap();
        std::fs::write(tmp.path().join("ch10.md"), "ten").unwrap();

        let files = collect_md_files(tmp.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        // Lexicographic on purpose: the combiner mirrors a plain sorted glob
        assert_eq!(names, vec!["ch10.md", "ch2.md"]);
    }

    #[tokio::test]
    async fn missing_directory_counts_as_empty() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(collect_md_files(&missing).await.unwrap().is_empty());
    }
}
