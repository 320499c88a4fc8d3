//! E-reader HTML document and file naming.

use chrono::NaiveDate;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use crate::html::escape;
use crate::sources::Article;

/// Stylesheet tuned for small e-ink screens: A5 pages, serif body, tweet cards.
pub const EREADER_CSS: &str = include_str!("ereader.css");

/// Maximum slug length for filenames.
pub const MAX_SLUG_LENGTH: usize = 80;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\-]").expect("valid slug regex"));
static HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

/// Render articles into one printable HTML document.
///
/// Every article after the first starts on a new page.
#[must_use]
pub fn render_document(articles: &[Article]) -> String {
    let mut sections = String::new();
    for (i, article) in articles.iter().enumerate() {
        let date = article
            .published_at
            .map(|d| d.format("%B %d, %Y at %H:%M").to_string())
            .unwrap_or_default();
        let page_break = if i > 0 {
            r#" style="page-break-before: always;""#
        } else {
            ""
        };

        let _ = write!(
            sections,
            r#"
    <article{page_break}>
        <header>
            <h1 class="title">{title}</h1>
            <div class="meta">
                <span class="author">By @{author}</span>
                <span class="date">{date}</span>
                <span class="source">Source: {source_type}</span>
            </div>
        </header>
        <main class="content">
            {content}
        </main>
        <footer>
            <p class="source-url">Original: <a href="{url}">{url}</a></p>
        </footer>
    </article>"#,
            title = escape(&article.title),
            author = escape(&article.author),
            source_type = escape(&article.source_type),
            content = article.content,
            url = escape(&article.source_url),
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
{css}
    </style>
</head>
<body>{sections}
</body>
</html>"#,
        title = escape(&document_title(articles)),
        css = EREADER_CSS,
    )
}

/// First title, with ` (+N more)` for batches.
#[must_use]
pub fn document_title(articles: &[Article]) -> String {
    match articles {
        [] => String::new(),
        [only] => only.title.clone(),
        [first, rest @ ..] => format!("{} (+{} more)", first.title, rest.len()),
    }
}

/// Filesystem-safe slug: ASCII-folded, lowercase, hyphenated.
#[must_use]
pub fn slugify(title: &str) -> String {
    let folded: String = title.nfkd().filter(char::is_ascii).collect();
    let lowered = folded.to_lowercase();
    let hyphenated = WHITESPACE.replace_all(&lowered, "-");
    let cleaned = NON_SLUG.replace_all(&hyphenated, "");
    let collapsed = HYPHENS.replace_all(&cleaned, "-");
    let mut slug = collapsed.trim_matches('-').to_string();

    if slug.len() > MAX_SLUG_LENGTH {
        slug.truncate(MAX_SLUG_LENGTH);
        slug = slug.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        slug = "article".to_string();
    }
    slug
}

/// `<slug>_YYYYMMDD.pdf`, naming batches after their first article.
#[must_use]
pub fn pdf_filename(articles: &[Article], date: NaiveDate) -> String {
    let base = match articles {
        [] => String::new(),
        [first] => first.title.clone(),
        [first, rest @ ..] => {
            format!("{}-and-{}-more", first.title, rest.len())
        }
    };
    format!("{}_{}.pdf", slugify(&base), date.format("%Y%m%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn article(title: &str) -> Article {
        Article {
            title: title.to_string(),
            author: "ferris".to_string(),
            content: "<p>Body text</p>".to_string(),
            published_at: Some(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()),
            source_url: "https://example.com/post?a=1&b=2".to_string(),
            source_type: "web".to_string(),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Café  Déjà Vu!"), "cafe-deja-vu");
        assert_eq!(slugify("  --Rust: 2024--  "), "rust-2024");
        assert_eq!(slugify("a---b"), "a-b");
        assert_eq!(slugify("日本語"), "article");
        assert_eq!(slugify(""), "article");
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "word ".repeat(40);
        let slug = slugify(&long);
        assert!(slug.len() <= MAX_SLUG_LENGTH);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn test_pdf_filename() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            pdf_filename(&[article("My Post")], date),
            "my-post_20240309.pdf"
        );
        assert_eq!(
            pdf_filename(&[article("My Post"), article("B"), article("C")], date),
            "my-post-and-2-more_20240309.pdf"
        );
    }

    #[test]
    fn test_document_title() {
        assert_eq!(document_title(&[article("One")]), "One");
        assert_eq!(
            document_title(&[article("One"), article("Two")]),
            "One (+1 more)"
        );
    }

    #[test]
    fn test_render_document() {
        let html = render_document(&[article("First <Post>"), article("Second")]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("size: A5;"));
        assert!(html.contains("<title>First &lt;Post&gt; (+1 more)</title>"));
        assert!(html.contains("By @ferris"));
        assert!(html.contains("March 09, 2024 at 14:05"));
        assert!(html.contains("Source: web"));
        assert!(html.contains("<p>Body text</p>"));
        assert!(html.contains("https://example.com/post?a=1&amp;b=2"));
        assert_eq!(html.matches("page-break-before: always").count(), 1);
        assert_eq!(html.matches("<article").count(), 2);
    }

    #[test]
    fn test_render_without_date() {
        let mut a = article("Undated");
        a.published_at = None;
        let html = render_document(&[a]);
        assert!(html.contains(r#"<span class="date"></span>"#));
        assert!(!html.contains("page-break-before"));
    }
}
