//! Depth-first expansion of wildcard URLs
//!
//! A URL such as `https://data.sdss.org/sas/dr17/manga/*/stack/*.fits` is
//! resolved by listing each directory that precedes a wildcard segment and
//! descending into every matching entry. Results come out in listing order,
//! one directory branch at a time, so the walk can be stopped early.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use regex::Regex;
use tracing::{debug, warn};

use crate::errors::{ListingResult, RemoteListingError};

use super::client::RemoteLister;
use super::listing::ListingEntry;

/// Concrete remote file produced by a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub url: String,
    pub name: String,
    pub size: Option<u64>,
    pub modified: Option<String>,
}

/// Anchored regex for one path segment, `*` matching any run of characters
pub fn segment_pattern(segment: &str) -> ListingResult<Regex> {
    let body = segment
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).map_err(|e| RemoteListingError::Malformed {
        url: segment.to_string(),
        reason: e.to_string(),
    })
}

/// Pending directory: URL prefix and index of the next unresolved segment
#[derive(Debug, Clone)]
struct Branch {
    prefix: String,
    segment: usize,
}

/// Cursor over the files matching a wildcard URL
#[derive(Debug)]
pub struct QueryWalker {
    lister: Arc<RemoteLister>,
    segments: Vec<String>,
    stack: Vec<Branch>,
    ready: VecDeque<RemoteEntry>,
}

impl QueryWalker {
    /// Start a walk over `query`, an absolute URL whose path may contain `*`
    pub fn new(lister: Arc<RemoteLister>, query: &str) -> ListingResult<Self> {
        let (root, path) = split_root(query)?;
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if segments.is_empty() {
            return Err(RemoteListingError::InvalidUrl {
                url: query.to_string(),
                error: "query has no path".to_string(),
            });
        }
        debug!("Expanding wildcards {}", query);
        Ok(Self {
            lister,
            segments,
            stack: vec![Branch {
                prefix: root,
                segment: 0,
            }],
            ready: VecDeque::new(),
        })
    }

    /// Next matching file, `None` once every branch is exhausted
    ///
    /// Listing failures of a single branch are logged and skipped; an
    /// authorization failure ends the walk with an error.
    pub async fn next(&mut self) -> Option<ListingResult<RemoteEntry>> {
        loop {
            if let Some(entry) = self.ready.pop_front() {
                return Some(Ok(entry));
            }
            let branch = self.stack.pop()?;
            match self.expand(branch).await {
                Ok(()) => {}
                Err(e @ RemoteListingError::Unauthorized { .. }) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
                Err(e) => warn!("Skipping branch: {}", e),
            }
        }
    }

    /// Collect every remaining match
    pub async fn collect(mut self) -> ListingResult<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next().await {
            entries.push(entry?);
        }
        Ok(entries)
    }

    /// Consume the walker as a stream of matches
    pub fn into_stream(self) -> impl Stream<Item = ListingResult<RemoteEntry>> {
        stream::unfold(self, |mut walker| async move {
            walker.next().await.map(|item| (item, walker))
        })
    }

    async fn expand(&mut self, branch: Branch) -> ListingResult<()> {
        let last = self.segments.len() - 1;
        // Fixed segments before the next wildcard, or before the final segment
        let query_index = (branch.segment..=last)
            .find(|&i| i == last || self.segments[i].contains('*'))
            .unwrap_or(last);
        let mut dir = branch.prefix;
        for fixed in &self.segments[branch.segment..query_index] {
            dir.push('/');
            dir.push_str(fixed);
        }

        let pattern = segment_pattern(&self.segments[query_index])?;
        let entries = self.lister.list(&dir).await?;
        let matches: Vec<ListingEntry> = entries
            .into_iter()
            .filter(|entry| pattern.is_match(&entry.name))
            .filter(|entry| entry.is_dir != (query_index == last))
            .collect();

        if query_index == last {
            self.ready.extend(matches.into_iter().map(|entry| RemoteEntry {
                url: format!("{}/{}", dir, entry.name),
                name: entry.name,
                size: entry.size,
                modified: entry.modified,
            }));
        } else {
            // Reverse so the first listed directory is walked first
            for entry in matches.into_iter().rev() {
                self.stack.push(Branch {
                    prefix: format!("{}/{}", dir, entry.name),
                    segment: query_index + 1,
                });
            }
        }
        Ok(())
    }
}

/// Split `scheme://host[:port]` from the path of an absolute URL
fn split_root(query: &str) -> ListingResult<(String, String)> {
    let invalid = |error: &str| RemoteListingError::InvalidUrl {
        url: query.to_string(),
        error: error.to_string(),
    };
    let scheme_end = query.find("://").ok_or_else(|| invalid("missing scheme"))?;
    let after_scheme = &query[scheme_end + 3..];
    let host_end = after_scheme.find('/').unwrap_or(after_scheme.len());
    if host_end == 0 {
        return Err(invalid("missing host"));
    }
    let root = query[..scheme_end + 3 + host_end].to_string();
    let path = after_scheme[host_end..].to_string();
    Ok((root, path))
}
