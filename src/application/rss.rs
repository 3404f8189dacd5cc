//! RSS 2.0 document rendering.
//!
//! Produces a single XML declaration followed by indented markup: an `rss`
//! envelope with the fixed version tag and the content-module namespace,
//! one `channel`, and the ordered items. Items carry the non-standard
//! `authorAvatar` extension element.

use std::fmt::Write as _;

use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc2822;

pub const RSS_VERSION: &str = "2.0";
pub const CONTENT_NAMESPACE: &str = "http://purl.org/rss/1.0/modules/content/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// One syndicated unit representing a single comment. Transient, never
/// persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
    pub guid: String,
    pub pub_date: String,
    pub author_avatar: String,
}

/// A fully assembled channel, ready to render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
    pub items: Vec<FeedItem>,
}

#[derive(Debug, Error)]
pub enum RssRenderError {
    #[error("failed to encode feed document: {0}")]
    Encode(#[from] std::fmt::Error),
    #[error("failed to format pub date: {0}")]
    PubDate(#[from] time::error::Format),
}

/// Format a timestamp the way the wire format expects (RFC 2822).
pub fn format_pub_date(timestamp: OffsetDateTime) -> Result<String, RssRenderError> {
    Ok(timestamp.format(&Rfc2822)?)
}

/// Render a feed into a complete XML document.
pub fn render(feed: &Feed) -> Result<String, RssRenderError> {
    let mut out = String::with_capacity(1024);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    writeln!(
        out,
        r#"<rss version="{RSS_VERSION}" xmlns:content="{CONTENT_NAMESPACE}">"#
    )?;
    writeln!(out, "  <channel>")?;
    write_element(&mut out, 4, "title", &feed.title)?;
    write_element(&mut out, 4, "link", &feed.link)?;
    write_element(&mut out, 4, "description", &feed.description)?;
    write_element(&mut out, 4, "pubDate", &feed.pub_date)?;
    for item in &feed.items {
        writeln!(out, "    <item>")?;
        write_element(&mut out, 6, "title", &item.title)?;
        write_element(&mut out, 6, "link", &item.link)?;
        write_element(&mut out, 6, "description", &item.description)?;
        write_element_opt(&mut out, 6, "author", &item.author)?;
        write_element(&mut out, 6, "guid", &item.guid)?;
        write_element_opt(&mut out, 6, "pubDate", &item.pub_date)?;
        write_element_opt(&mut out, 6, "authorAvatar", &item.author_avatar)?;
        writeln!(out, "    </item>")?;
    }
    writeln!(out, "  </channel>")?;
    write!(out, "</rss>")?;
    Ok(out)
}

fn write_element(
    out: &mut String,
    indent: usize,
    name: &str,
    value: &str,
) -> Result<(), std::fmt::Error> {
    writeln!(
        out,
        "{:indent$}<{name}>{}</{name}>",
        "",
        xml_escape(value),
        indent = indent
    )
}

/// Like `write_element`, but empty values are omitted entirely.
fn write_element_opt(
    out: &mut String,
    indent: usize,
    name: &str,
    value: &str,
) -> Result<(), std::fmt::Error> {
    if value.is_empty() {
        return Ok(());
    }
    write_element(out, indent, name, value)
}

pub(crate) fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
