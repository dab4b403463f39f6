//! Remote directory listing parsers
//!
//! SAS directories are served as HTML index pages. The layout depends on the
//! web server, so parsing sits behind the [`ListingParser`] trait.

use std::fmt::Debug;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::errors::{ListingResult, RemoteListingError};

/// One row of a directory index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    /// Entry name without the trailing `/` of directories
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes when the page shows one
    pub size: Option<u64>,
    /// Modification time as printed by the server
    pub modified: Option<String>,
}

impl ListingEntry {
    fn from_href(href: &str, size: Option<u64>, modified: Option<String>) -> Option<Self> {
        if href.is_empty()
            || href.starts_with('?')
            || href.starts_with('/')
            || href.starts_with("..")
            || href.contains("://")
        {
            return None;
        }
        let is_dir = href.ends_with('/');
        let name = href.trim_end_matches('/');
        if name.is_empty() || name.contains('/') {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            is_dir,
            size,
            modified: modified
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty() && m != "-"),
        })
    }
}

/// Turns an index page into entries
pub trait ListingParser: Send + Sync + Debug {
    fn parse(&self, url: &str, html: &str) -> ListingResult<Vec<ListingEntry>>;
}

fn autoindex_row() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"<a href="([^"]*)"[^>]*>.*?</a>\s*</td>\s*<td[^>]*>\s*(\d*)\s*</td>\s*<td[^>]*>(.*?)</td>\s*</tr>"#,
        )
        .expect("static autoindex pattern")
    })
}

/// Apache-style autoindex table: name, size, date columns in that order
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoindexParser;

impl ListingParser for AutoindexParser {
    fn parse(&self, url: &str, html: &str) -> ListingResult<Vec<ListingEntry>> {
        if !html.to_ascii_lowercase().contains("<table") {
            return Err(RemoteListingError::Malformed {
                url: url.to_string(),
                reason: "no index table in page".to_string(),
            });
        }
        Ok(autoindex_row()
            .captures_iter(html)
            .filter_map(|caps| {
                let size = caps.get(2).and_then(|m| m.as_str().parse().ok());
                let modified = caps.get(3).map(|m| m.as_str().to_string());
                ListingEntry::from_href(&caps[1], size, modified)
            })
            .collect())
    }
}

/// Generic HTML table index that tolerates any column order
///
/// The size column is the first cell holding a plain integer, the date column
/// the first cell that parses with one of the known date layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTableParser;

fn selector(css: &str, url: &str) -> ListingResult<Selector> {
    Selector::parse(css).map_err(|e| RemoteListingError::Malformed {
        url: url.to_string(),
        reason: format!("invalid selector {}: {:?}", css, e),
    })
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

impl ListingParser for HtmlTableParser {
    fn parse(&self, url: &str, html: &str) -> ListingResult<Vec<ListingEntry>> {
        let document = Html::parse_document(html);
        let row_selector = selector("tr", url)?;
        let cell_selector = selector("td", url)?;
        let link_selector = selector("a[href]", url)?;

        let mut entries = Vec::new();
        for row in document.select(&row_selector) {
            let Some(href) = row
                .select(&link_selector)
                .next()
                .and_then(|link| link.value().attr("href"))
            else {
                continue;
            };
            let cells: Vec<String> = row.select(&cell_selector).map(cell_text).collect();
            let size = cells.iter().find_map(|text| text.parse::<u64>().ok());
            let modified = cells
                .iter()
                .find(|text| super::exists::parse_listing_time(text).is_some())
                .cloned();
            if let Some(entry) = ListingEntry::from_href(href, size, modified) {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
