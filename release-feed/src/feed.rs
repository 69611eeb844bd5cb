//! Release feed reader.
//!
//! Pulls XML events from the feed one at a time and stops at the end of the
//! first `item`: feeds list files newest first, so older entries are never
//! parsed at all.

use crate::error::{FeedError, Result};
use crate::http::HttpClient;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader};

const TITLE: &[u8] = b"title";
const LINK: &[u8] = b"link";
const ITEM: &[u8] = b"item";

/// Newest entry of a release feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Entry title, expected to embed the release version (`Name v1.2`).
    pub title: String,
    /// Link to the release's detail page.
    pub link: String,
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
}

/// Fetch the feed at `url` and return its newest entry.
///
/// # Errors
///
/// Returns [`FeedError::Http`] if the feed cannot be fetched and
/// [`FeedError::Parse`] if it is not a feed with at least one item.
pub fn read_latest(client: &HttpClient, url: &str) -> Result<FeedEntry> {
    let body = client.open(url)?;
    let entry = parse_latest(BufReader::new(body))?;
    tracing::debug!(title = %entry.title, link = %entry.link, "newest feed entry");
    Ok(entry)
}

/// Parse the newest entry out of a feed document.
///
/// The most recently seen `title` and `link` texts are tracked while reading;
/// when the first `item` closes, that pair is returned and the rest of the
/// input is left unread. Element names are compared without namespace prefix.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] on malformed XML, or if the document ends
/// before any `item` is closed.
pub fn parse_latest<R: BufRead>(input: R) -> Result<FeedEntry> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut capturing: Option<Field> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                capturing = match e.local_name().as_ref() {
                    TITLE => {
                        title.clear();
                        Some(Field::Title)
                    }
                    LINK => {
                        link.clear();
                        Some(Field::Link)
                    }
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(field) = capturing {
                    let text = t
                        .unescape()
                        .map_err(|e| FeedError::Parse(format!("bad text in feed: {e}")))?;
                    match field {
                        Field::Title => title.push_str(&text),
                        Field::Link => link.push_str(&text),
                    }
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(field) = capturing {
                    let bytes = c.into_inner();
                    let text = String::from_utf8_lossy(&bytes);
                    match field {
                        Field::Title => title.push_str(&text),
                        Field::Link => link.push_str(&text),
                    }
                }
            }
            Ok(Event::End(e)) => {
                capturing = None;
                if e.local_name().as_ref() == ITEM {
                    return Ok(FeedEntry { title, link });
                }
            }
            Ok(Event::Eof) => {
                return Err(FeedError::Parse(
                    "feed ended before its first item was closed".into(),
                ));
            }
            Err(e) => {
                return Err(FeedError::Parse(format!(
                    "malformed feed near byte {}: {e}",
                    reader.buffer_position()
                )));
            }
            Ok(_) => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>CoolPlugin Files</title>
    <link>http://example.org/server-mods/coolplugin/files/</link>
    <atom:link href="http://example.org/server-mods/coolplugin/files.rss" rel="self"/>
    <item>
      <title>CoolPlugin v2.0 Release</title>
      <link>http://example.org/server-mods/coolplugin/files/12-cool-plugin-v2-0/</link>
      <description>Second release</description>
    </item>
    <item>
      <title>CoolPlugin v1.0</title>
      <link>http://example.org/server-mods/coolplugin/files/11-cool-plugin-v1-0/</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn takes_first_item_only() {
        let entry = parse_latest(FEED.as_bytes()).unwrap();
        assert_eq!(entry.title, "CoolPlugin v2.0 Release");
        assert_eq!(
            entry.link,
            "http://example.org/server-mods/coolplugin/files/12-cool-plugin-v2-0/"
        );
    }

    #[test]
    fn stops_before_malformed_tail() {
        // Everything after the first item is garbage; it must never be read.
        let feed = "<rss><channel><item><title>A v1</title><link>http://x/1</link></item><<<<";
        let entry = parse_latest(feed.as_bytes()).unwrap();
        assert_eq!(entry.title, "A v1");
        assert_eq!(entry.link, "http://x/1");
    }

    #[test]
    fn unescapes_entities() {
        let feed = "<rss><item><title>Tom &amp; Jerry v3.1</title><link>http://x/?a=1&amp;b=2</link></item></rss>";
        let entry = parse_latest(feed.as_bytes()).unwrap();
        assert_eq!(entry.title, "Tom & Jerry v3.1");
        assert_eq!(entry.link, "http://x/?a=1&b=2");
    }

    #[test]
    fn accepts_cdata_titles() {
        let feed = "<rss><item><title><![CDATA[Plug <b> v0.9]]></title><link>http://x/9</link></item></rss>";
        let entry = parse_latest(feed.as_bytes()).unwrap();
        assert_eq!(entry.title, "Plug <b> v0.9");
    }

    #[test]
    fn ignores_namespace_prefix() {
        let feed = "<feed><dc:item xmlns:dc=\"urn:x\"><dc:title>N v5</dc:title><dc:link>http://x/5</dc:link></dc:item></feed>";
        let entry = parse_latest(feed.as_bytes()).unwrap();
        assert_eq!(entry.title, "N v5");
        assert_eq!(entry.link, "http://x/5");
    }

    #[test]
    fn channel_values_are_overwritten_by_item() {
        let feed = "<rss><channel><title>Channel</title><link>http://channel/</link><item><title>Item v2</title></item></channel></rss>";
        let entry = parse_latest(feed.as_bytes()).unwrap();
        assert_eq!(entry.title, "Item v2");
        // The item had no link of its own, so the last one seen is kept.
        assert_eq!(entry.link, "http://channel/");
    }

    #[test]
    fn feed_without_items_is_parse_error() {
        let feed = "<rss><channel><title>Empty</title></channel></rss>";
        let err = parse_latest(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn mismatched_tags_are_parse_error() {
        let feed = "<rss><channel><title>Broken</link></channel></rss>";
        let err = parse_latest(feed.as_bytes()).unwrap_err();
        assert!(matches!(err, FeedError::Parse(_)));
    }

    #[test]
    fn empty_input_is_parse_error() {
        assert!(parse_latest("".as_bytes()).is_err());
    }
}
