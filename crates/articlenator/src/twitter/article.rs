//! Rendering extracted tweets as articles.

use std::fmt::Write;

use super::types::{truncate_chars, Reply, TweetData};
use crate::html::escape;
use crate::sources::Article;

/// Longest title derived from tweet text, in characters.
const MAX_TITLE_LENGTH: usize = 100;

/// Build an [`Article`] from a parsed status page.
pub fn tweet_to_article(data: &TweetData, source_url: &str) -> Article {
    let title = match &data.title {
        Some(title) if !title.is_empty() => title.clone(),
        _ if !data.text.trim().is_empty() => {
            truncate_chars(&data.text.replace('\n', " "), MAX_TITLE_LENGTH)
                .trim()
                .to_string()
        }
        _ => format!("Tweet by @{}", data.author),
    };

    let date = data
        .posted_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let content = if data.is_article {
        render_longform(data, &title, &date)
    } else {
        render_tweet(data, &date)
    };

    Article {
        title,
        author: data.author.clone(),
        content,
        published_at: data.posted_at,
        source_url: source_url.to_string(),
        source_type: if data.is_article {
            "twitter_article".to_string()
        } else {
            "twitter".to_string()
        },
    }
}

fn render_longform(data: &TweetData, title: &str, date: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<article class="twitter-article">
    <header class="article-header">
        <h1>{title}</h1>
        <div class="article-meta">
            <span class="displayname">{display_name}</span>
            <span class="username">@{author}</span>
            <span class="date">{date}</span>
        </div>
    </header>
    <div class="article-content">
"#,
        title = escape(title),
        display_name = escape(&data.display_name),
        author = escape(&data.author),
    );
    for paragraph in data.text.lines().map(str::trim).filter(|p| !p.is_empty()) {
        let _ = writeln!(out, "        <p>{}</p>", escape(paragraph));
    }
    out.push_str("    </div>\n</article>");
    out
}

fn render_tweet(data: &TweetData, date: &str) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<div class="tweet main-tweet">
    <div class="tweet-header">
        <span class="displayname">{display_name}</span>
        <span class="username">@{author}</span>
        <span class="date">{date}</span>
    </div>
    <div class="tweet-content">
        <p>{text}</p>
    </div>
{images}</div>"#,
        display_name = escape(&data.display_name),
        author = escape(&data.author),
        text = text_with_breaks(&data.text),
        images = render_images(&data.images),
    );

    if !data.replies.is_empty() {
        out.push_str("\n<div class=\"replies-section\">\n    <h2 class=\"replies-header\">Replies</h2>\n");
        for reply in &data.replies {
            render_reply(&mut out, reply);
        }
        out.push_str("</div>");
    }
    out
}

fn render_reply(out: &mut String, reply: &Reply) {
    let (op_class, op_badge) = if reply.is_op {
        (" op-reply", r#" <span class="op-badge">OP</span>"#)
    } else {
        ("", "")
    };
    let _ = write!(
        out,
        r#"    <div class="tweet reply{op_class}">
        <div class="tweet-header">
            <span class="displayname">{display_name}</span>{op_badge}
            <span class="username">@{author}</span>
        </div>
        <div class="tweet-content">
            <p>{text}</p>
        </div>
{images}    </div>
"#,
        display_name = escape(&reply.display_name),
        author = escape(&reply.author),
        text = text_with_breaks(&reply.text),
        images = render_images(&reply.images),
    );
}

fn render_images(images: &[String]) -> String {
    if images.is_empty() {
        return String::new();
    }
    let mut out = String::from("    <div class=\"tweet-images\">\n");
    for src in images {
        let _ = writeln!(
            out,
            r#"        <img src="{}" alt="Tweet image" loading="lazy">"#,
            escape(src)
        );
    }
    out.push_str("    </div>\n");
    out
}

fn text_with_breaks(text: &str) -> String {
    escape(text.trim()).replace('\n', "<br>\n")
}
