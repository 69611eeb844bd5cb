//! Download link lookup on a release's detail page.
//!
//! The page is scanned line by line for the download marker. The matching
//! line is then parsed as an HTML fragment and the `Download` anchor's
//! `href` is taken. When the marker appears more than once the last
//! occurrence wins.

use crate::error::{FeedError, Result};
use crate::http::HttpClient;
use scraper::{Html, Selector};
use std::io::{BufRead, BufReader};
use url::Url;

/// Visible text of the anchor that carries the artifact link.
pub const DOWNLOAD_ANCHOR_TEXT: &str = "Download";

/// Fetch a detail page and return the artifact link it advertises.
///
/// Returns `Ok(None)` when the page was read successfully but carries no
/// download marker.
///
/// # Errors
///
/// Returns [`FeedError::Http`] or [`FeedError::Io`] if the page cannot be
/// read, and [`FeedError::Parse`] if a marker line has no download anchor.
pub fn resolve_download_link(
    client: &HttpClient,
    detail_url: &str,
    marker: &str,
) -> Result<Option<String>> {
    let body = client.open(detail_url)?;
    let base = Url::parse(detail_url).ok();
    let link = find_download_link(BufReader::new(body), marker, base.as_ref())?;
    match &link {
        Some(href) => tracing::debug!(detail_url, href = %href, "download link resolved"),
        None => tracing::debug!(detail_url, "detail page has no download marker"),
    }
    Ok(link)
}

/// Scan a detail page for the download link.
///
/// Relative links are resolved against `base` when one is given. Lines are
/// decoded leniently, so stray non-UTF-8 bytes elsewhere on the page are
/// ignored.
///
/// # Errors
///
/// Returns [`FeedError::Io`] if a line cannot be read and
/// [`FeedError::Parse`] if a marker line has no download anchor.
pub fn find_download_link<R: BufRead>(
    mut input: R,
    marker: &str,
    base: Option<&Url>,
) -> Result<Option<String>> {
    let anchors = Selector::parse("a[href]")
        .map_err(|e| FeedError::Parse(format!("invalid anchor selector: {e:?}")))?;

    let mut download = None;
    let mut raw = Vec::new();
    let mut number = 0usize;
    loop {
        raw.clear();
        if input.read_until(b'\n', &mut raw)? == 0 {
            break;
        }
        number += 1;
        let line = String::from_utf8_lossy(&raw);
        if !line.contains(marker) {
            continue;
        }

        let fragment = Html::parse_fragment(&line);
        let href = fragment
            .select(&anchors)
            .find(|a| a.text().collect::<String>().trim() == DOWNLOAD_ANCHOR_TEXT)
            .and_then(|a| a.value().attr("href"))
            .ok_or_else(|| {
                FeedError::Parse(format!(
                    "line {number} has the download marker but no {DOWNLOAD_ANCHOR_TEXT} link"
                ))
            })?;

        download = Some(resolve(base, href));
    }

    Ok(download)
}

fn resolve(base: Option<&Url>, href: &str) -> String {
    match base.map(|b| b.join(href)) {
        Some(Ok(url)) => url.into(),
        _ => href.to_owned(),
    }
}
