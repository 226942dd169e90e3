use anyhow::{anyhow, Result};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig};
use colored::*;
use futures_util::StreamExt;
use pulldown_cmark::{html, Event, Options, Parser};
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info};

use crate::natsort::natural_key;

/// Page shell for the rendered book. Fiction-format styling: 5.5x8.5in
/// pages, running chapter title in the header, page numbers in the footer,
/// both suppressed on the first page, chapters starting on a new page.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        @page {
            size: 5.5in 8.5in;
            margin: 0.75in 0.5in;

            @top-center {
                content: string(book-title);
                font-family: 'Crimson Text', 'Georgia', serif;
                font-size: 10pt;
                font-style: italic;
            }

            @bottom-center {
                content: counter(page);
                font-family: 'Crimson Text', 'Georgia', serif;
                font-size: 10pt;
            }
        }

        @page :first {
            @top-center { content: none; }
            @bottom-center { content: none; }
        }

        body {
            font-family: 'Crimson Text', 'Georgia', serif;
            font-size: 12pt;
            line-height: 1.6;
            text-align: justify;
            hyphens: auto;
            color: #222;
        }

        h1 {
            string-set: book-title content();
            page-break-before: always;
            text-align: center;
            font-size: 24pt;
            font-weight: normal;
            margin-top: 2in;
            margin-bottom: 1in;
            font-variant: small-caps;
            letter-spacing: 0.05em;
        }

        h1:first-of-type {
            page-break-before: avoid;
        }

        h2 {
            font-size: 14pt;
            font-weight: bold;
            margin-top: 1.5em;
            margin-bottom: 0.75em;
            page-break-after: avoid;
        }

        p {
            margin: 0;
            text-indent: 1.5em;
            orphans: 2;
            widows: 2;
        }

        p:first-of-type,
        h1 + p,
        h2 + p {
            text-indent: 0;
        }

        p + p {
            margin-top: 0;
        }

        /* Scene breaks */
        hr {
            border: none;
            text-align: center;
            margin: 2em 0;
        }

        hr:after {
            content: "* * *";
            letter-spacing: 1em;
        }

        blockquote {
            margin: 1em 2em;
            font-style: italic;
        }

        em {
            font-style: italic;
        }

        strong {
            font-weight: bold;
        }

        code {
            font-family: 'Courier New', monospace;
            font-size: 0.9em;
        }

        pre {
            font-family: 'Courier New', monospace;
            font-size: 0.9em;
            white-space: pre-wrap;
            margin: 1em 0;
            padding: 0.5em;
            background: #f5f5f5;
        }
    </style>
</head>
<body>
{content}
</body>
</html>
"#;

/// Renders a directory of markdown chapters into a single book-paginated
/// PDF via headless Chrome.
pub struct Renderer {
    input_dir: PathBuf,
    output: PathBuf,
}

impl Renderer {
    /// The output path is forced to end in `.pdf`.
    pub fn new(input_dir: impl Into<PathBuf>, output: &str) -> Self {
        let output = if output.ends_with(".pdf") {
            output.to_string()
        } else {
            format!("{}.pdf", output)
        };
        Self {
            input_dir: input_dir.into(),
            output: PathBuf::from(output),
        }
    }

    pub async fn run(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(anyhow!(
                "'{}' is not a directory",
                self.input_dir.display()
            ));
        }

        info!(
            "Converting markdown files from '{}' to PDF...",
            self.input_dir.display().to_string().green()
        );

        let chapters = collect_chapter_files(&self.input_dir).await?;

        if chapters.is_empty() {
            return Err(anyhow!(
                "No markdown files found in '{}'",
                self.input_dir.display()
            ));
        }

        info!("Found {} chapters:", chapters.len());
        for path in &chapters {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            info!("  - {}", name.blue());
        }

        info!("Converting markdown to HTML...");
        let content_html = build_book_html(&chapters).await?;
        let full_html = PAGE_TEMPLATE.replace("{content}", &content_html);

        info!("Generating PDF...");
        self.render_pdf(&full_html).await?;

        info!(
            "PDF book created successfully: {}",
            self.output.display().to_string().green()
        );

        let size = fs::metadata(&self.output).await?.len();
        info!("File size: {:.2} MB", size as f64 / (1024.0 * 1024.0));

        Ok(())
    }

    async fn render_pdf(&self, html_doc: &str) -> Result<()> {
        let config = BrowserConfig::builder()
            .window_size(1200, 1600)
            .build()
            .map_err(|e| anyhow!("Failed to create browser config: {}", e))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow!("Failed to launch browser: {}", e))?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if let Err(err) = h {
                    // Only log if it's not a common websocket deserialization error
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        let result = self.print_to_pdf(&browser, html_doc).await;

        browser.close().await.ok();
        handle.abort();

        result
    }

    async fn print_to_pdf(&self, browser: &Browser, html_doc: &str) -> Result<()> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow!("Failed to create new page: {}", e))?;

        page.set_content(html_doc)
            .await
            .map_err(|e| anyhow!("Failed to set page content: {}", e))?;

        // Give the layout a moment to settle before printing
        tokio::time::sleep(Duration::from_millis(500)).await;

        let params = PrintToPdfParams {
            paper_width: Some(5.5),
            paper_height: Some(8.5),
            margin_top: Some(0.75),
            margin_bottom: Some(0.75),
            margin_left: Some(0.5),
            margin_right: Some(0.5),
            prefer_css_page_size: Some(true),
            print_background: Some(true),
            display_header_footer: Some(false),
            ..Default::default()
        };

        let pdf_data = page
            .pdf(params)
            .await
            .map_err(|e| anyhow!("Failed to generate PDF: {}", e))?;

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| anyhow!("Failed to create directory: {}", e))?;
            }
        }

        fs::write(&self.output, pdf_data)
            .await
            .map_err(|e| anyhow!("Failed to write PDF to {}: {}", self.output.display(), e))?;

        Ok(())
    }
}

/// Lists `*.md` and `*.markdown` files under `dir` in natural order of
/// their filename stems, so `ch2` comes before `ch10`.
pub(crate) async fn collect_chapter_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| anyhow!("Failed to read directory {}: {}", dir.display(), e))?;
    let mut chapters = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path
            .extension()
            .map_or(false, |ext| ext == "md" || ext == "markdown")
        {
            chapters.push(path);
        }
    }

    chapters.sort_by_key(|p| {
        p.file_stem()
            .map(|s| natural_key(&s.to_string_lossy()))
            .unwrap_or_default()
    });
    Ok(chapters)
}

/// Converts the chapters to HTML fragments and joins them with blank-line
/// separation, synthesizing a chapter heading wherever the source lacks one.
pub(crate) async fn build_book_html(chapters: &[PathBuf]) -> Result<String> {
    let mut fragments = Vec::with_capacity(chapters.len());

    for (i, path) in chapters.iter().enumerate() {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

        let mut fragment = markdown_to_html(&content);

        if !has_top_level_heading(&fragment) {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            fragment = format!(
                "<h1>Chapter {}: {}</h1>\n{}",
                i + 1,
                chapter_title(&stem),
                fragment
            );
        }

        fragments.push(fragment);
    }

    Ok(fragments.join("\n\n"))
}

/// Markdown to HTML with tables, footnotes, strikethrough, and smart
/// punctuation; soft line breaks become hard breaks so stanza-style prose
/// keeps its line shape.
fn markdown_to_html(content: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_SMART_PUNCTUATION;

    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });

    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

fn has_top_level_heading(fragment: &str) -> bool {
    let doc = Html::parse_fragment(fragment);
    let selector = Selector::parse("h1").unwrap();
    doc.select(&selector).next().is_some()
}

/// Derives a chapter title from a filename stem: separators become spaces
/// and each word is title-cased, e.g. "my_great-chapter" -> "My Great
/// Chapter".
fn chapter_title(stem: &str) -> String {
    let spaced = stem.replace(['_', '-'], " ");
    let mut out = String::with_capacity(spaced.len());
    let mut prev_alpha = false;
    for ch in spaced.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn chapter_titles_from_stems() {
        assert_eq!(chapter_title("my_great-chapter"), "My Great Chapter");
        assert_eq!(chapter_title("02-end"), "02 End");
        assert_eq!(chapter_title("EPILOGUE"), "Epilogue");
    }

    #[test]
    fn detects_top_level_headings() {
        assert!(has_top_level_heading("<h1>Intro</h1><p>text</p>"));
        assert!(!has_top_level_heading("<h2>Sub</h2><p>text</p>"));
        assert!(!has_top_level_heading("<p>plain paragraph</p>"));
    }

    #[test]
    fn soft_breaks_become_hard_breaks() {
        let html = markdown_to_html("line one\nline two");
        assert!(html.contains("<br"));
    }

    #[test]
    fn tables_are_rendered() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }

    #[tokio::test]
    async fn chapters_sort_naturally() {
        let tmp = TempDir::new().unwrap();
        for name in ["ch1.md", "ch2.md", "ch10.md", "notes.markdown"] {
            std::fs::write(tmp.path().join(name), "text").unwrap();
        }

        let chapters = collect_chapter_files(tmp.path()).await.unwrap();
        let names: Vec<_> = chapters
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ch1.md", "ch2.md", "ch10.md", "notes.markdown"]);
    }

    #[tokio::test]
    async fn headings_are_synthesized_when_missing() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("01-intro.md"), "# Intro\nHello world.").unwrap();
        std::fs::write(tmp.path().join("02-end.md"), "Goodbye.").unwrap();

        let chapters = collect_chapter_files(tmp.path()).await.unwrap();
        let html = build_book_html(&chapters).await.unwrap();

        assert!(html.contains(">Intro</h1>"));
        assert!(!html.contains("Chapter 1:"));
        let synthesized = html.find("<h1>Chapter 2: 02 End</h1>").unwrap();
        let goodbye = html.find("Goodbye.").unwrap();
        assert!(synthesized < goodbye);
    }

    #[tokio::test]
    async fn nonexistent_directory_fails_with_its_name() {
        let renderer = Renderer::new("/definitely/not/a/real/dir", "out.pdf");
        let err = renderer.run().await.unwrap_err();
        assert!(err.to_string().contains("/definitely/not/a/real/dir"));
    }

    #[test]
    fn output_path_is_suffixed_with_pdf() {
        let renderer = Renderer::new(".", "book");
        assert_eq!(renderer.output, PathBuf::from("book.pdf"));
        let renderer = Renderer::new(".", "book.pdf");
        assert_eq!(renderer.output, PathBuf::from("book.pdf"));
    }

    #[test]
    fn template_wraps_content() {
        let doc = PAGE_TEMPLATE.replace("{content}", "<h1>One</h1>");
        assert!(doc.contains("<h1>One</h1>"));
        assert!(doc.contains("size: 5.5in 8.5in"));
        assert!(!doc.contains("{content}"));
    }
}
