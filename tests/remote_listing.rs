//! Integration tests for remote discovery
//!
//! A small in-process HTTP server serves autoindex pages so wildcard
//! expansion and the curl backend's stream building run against real
//! responses.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures::StreamExt;
use sas_sync::app::access::{
    open_backend, AccessConfig, AccessMode, CommitOptions, CurlAccess, TransferBackend,
};
use sas_sync::app::path::{Environment, Keywords, PathResolver, ResolverConfig};
use sas_sync::app::remote::exists::set_modified;
use sas_sync::app::remote::{QueryWalker, RemoteConfig, RemoteLister};
use sas_sync::app::stream::StreamConfig;
use sas_sync::app::supervisor::NoopProgress;
use sas_sync::app::templates::InMemoryTemplateStore;
use sas_sync::auth::CredentialChain;
use sas_sync::errors::{AccessError, AppError, RemoteListingError};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const LISTED_TIME: &str = "2021-Jul-12 10:01";

fn index(rows: &[(&str, Option<u64>)]) -> String {
    let mut html = String::from("<html><body><table>\n");
    for (href, size) in rows {
        let size = size.map(|s| s.to_string()).unwrap_or_default();
        html.push_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td align=\"right\">{}</td><td>{}</td></tr>\n",
            href, href, size, LISTED_TIME
        ));
    }
    html.push_str("</table></body></html>\n");
    html
}

fn spectro_pages() -> HashMap<String, (u16, String)> {
    let mut pages = HashMap::new();
    pages.insert(
        "/sas/dr17/spectro/".to_string(),
        (
            200,
            index(&[("?C=N;O=D", None), ("../", None), ("3606/", None), ("3607/", None), ("notes.txt", Some(9))]),
        ),
    );
    pages.insert(
        "/sas/dr17/spectro/3606/".to_string(),
        (
            200,
            index(&[("spec-3606-1.fits", Some(4)), ("spec-3606-2.fits", Some(8)), ("readme.txt", Some(3))]),
        ),
    );
    pages.insert(
        "/sas/dr17/spectro/3607/".to_string(),
        (200, index(&[("spec-3607-1.fits", Some(16))])),
    );
    pages.insert("/sas/sdsswork/".to_string(), (401, String::new()));
    pages
}

/// Serve `pages` by request path until the test ends; returns `host:port`
async fn serve(pages: HashMap<String, (u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let pages = Arc::new(pages);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let pages = Arc::clone(&pages);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = pages
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "not found".to_string()));
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    _ => "Not Found",
                };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr.to_string()
}

fn lister() -> Arc<RemoteLister> {
    let config = RemoteConfig {
        rate_limit_rps: 100,
        ..RemoteConfig::default()
    };
    Arc::new(RemoteLister::new(&config, None).unwrap())
}

#[tokio::test]
async fn test_walker_expands_wildcards_depth_first() {
    let host = serve(spectro_pages()).await;
    let query = format!("http://{}/sas/dr17/spectro/*/spec-*.fits", host);

    let entries = QueryWalker::new(lister(), &query)
        .unwrap()
        .collect()
        .await
        .unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["spec-3606-1.fits", "spec-3606-2.fits", "spec-3607-1.fits"]
    );
    assert_eq!(
        entries[0].url,
        format!("http://{}/sas/dr17/spectro/3606/spec-3606-1.fits", host)
    );
    assert_eq!(entries[2].size, Some(16));
    assert_eq!(entries[0].modified.as_deref(), Some(LISTED_TIME));
}

#[tokio::test]
async fn test_walker_as_stream_and_missing_branches() {
    let host = serve(spectro_pages()).await;

    // The 3608 directory does not exist; the walk just yields nothing for it
    let query = format!("http://{}/sas/dr17/spectro/3608/*.fits", host);
    let entries = QueryWalker::new(lister(), &query).unwrap().collect().await.unwrap();
    assert!(entries.is_empty());

    let query = format!("http://{}/sas/dr17/spectro/360*/*-1.fits", host);
    let names: Vec<String> = QueryWalker::new(lister(), &query)
        .unwrap()
        .into_stream()
        .map(|entry| entry.unwrap().name)
        .collect()
        .await;
    assert_eq!(names, vec!["spec-3606-1.fits", "spec-3607-1.fits"]);
}

#[tokio::test]
async fn test_walker_stops_on_unauthorized() {
    let host = serve(spectro_pages()).await;
    let query = format!("http://{}/sas/sdsswork/*/x.fits", host);

    let mut walker = QueryWalker::new(lister(), &query).unwrap();
    let first = walker.next().await.unwrap();
    assert!(matches!(first, Err(RemoteListingError::Unauthorized { .. })));
    assert!(walker.next().await.is_none());
}

fn curl_backend(host: &str, base: &Path) -> Box<dyn TransferBackend> {
    let store = InMemoryTemplateStore::new().with_release(
        "dr17",
        [("spec", "$SAS_BASE_DIR/dr17/spectro/{plate}/spec-{plate}-{fiber}.fits")],
    );
    let env = Environment::isolated().with_var("SAS_BASE_DIR", base.to_string_lossy());
    let config = ResolverConfig {
        release: Some("dr17".to_string()),
        scheme: "http".to_string(),
        netloc: Some(host.to_string()),
        ..ResolverConfig::default()
    };
    let resolver = PathResolver::new(Arc::new(store), config, env).unwrap();
    let access = AccessConfig {
        mode: AccessMode::Curl,
        ..AccessConfig::default()
    };
    let remote = RemoteConfig {
        rate_limit_rps: 100,
        ..RemoteConfig::default()
    };
    open_backend(resolver, StreamConfig::default(), access, remote)
}

#[tokio::test]
async fn test_curl_stream_skips_files_already_on_disk() {
    let host = serve(spectro_pages()).await;
    let temp = TempDir::new().unwrap();

    // Same size and listed time as spec-3606-1.fits
    let existing = temp.path().join("dr17/spectro/3606/spec-3606-1.fits");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, b"FITS").unwrap();
    set_modified(&existing, Utc.with_ymd_and_hms(2021, 7, 12, 10, 1, 0).unwrap()).unwrap();

    let mut backend = curl_backend(&host, temp.path());
    assert_eq!(backend.mode(), AccessMode::Curl);
    backend.remote(&CredentialChain::new()).unwrap();
    assert!(backend
        .add("spec", &Keywords::new().with("plate", "*").with("fiber", "*"))
        .unwrap());

    assert_eq!(backend.set_stream().await.unwrap(), 2);
    assert_eq!(
        backend.locations(0, None),
        vec![
            "dr17/spectro/3606/spec-3606-2.fits",
            "dr17/spectro/3607/spec-3607-1.fits"
        ]
    );
    assert_eq!(
        backend.paths(0, Some(1)),
        vec![temp.path().join("dr17/spectro/3606/spec-3606-2.fits")]
    );
    assert_eq!(
        backend.urls(1, None),
        vec![format!("http://{}/sas/dr17/spectro/3607/spec-3607-1.fits", host)]
    );

    let spec = backend.commit_spec().unwrap();
    assert_eq!(spec.command.program(), "curl");
    assert!(spec.env.is_empty());
}

#[tokio::test]
async fn test_up_to_date_stream_commits_nothing() {
    let host = serve(spectro_pages()).await;
    let temp = TempDir::new().unwrap();

    let existing = temp.path().join("dr17/spectro/3607/spec-3607-1.fits");
    std::fs::create_dir_all(existing.parent().unwrap()).unwrap();
    std::fs::write(&existing, [0u8; 16]).unwrap();
    set_modified(&existing, Utc.with_ymd_and_hms(2021, 7, 12, 10, 1, 0).unwrap()).unwrap();

    let mut backend = curl_backend(&host, temp.path());
    backend.remote(&CredentialChain::new()).unwrap();
    backend
        .add("spec", &Keywords::new().with("plate", "3607").with("fiber", "*"))
        .unwrap();

    assert_eq!(backend.set_stream().await.unwrap(), 0);
    let report = backend
        .commit(CommitOptions::default(), &mut NoopProgress)
        .await
        .unwrap();
    assert!(report.is_success());
    assert!(report.return_codes.is_empty());
    assert_eq!(report.summary(), "Done!");
}

#[tokio::test]
async fn test_curl_stream_without_matches() {
    let host = serve(spectro_pages()).await;
    let temp = TempDir::new().unwrap();

    let mut backend = curl_backend(&host, temp.path());
    backend.remote(&CredentialChain::new()).unwrap();
    backend
        .add("spec", &Keywords::new().with("plate", "9999").with("fiber", "*"))
        .unwrap();

    let err = backend.set_stream().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Access(AccessError::NoFilesFound { .. })
    ));
    assert!(err.is_empty_result());
}

#[tokio::test]
async fn test_curl_refine_and_window() {
    let host = serve(spectro_pages()).await;
    let temp = TempDir::new().unwrap();

    let mut backend = curl_backend(&host, temp.path());
    backend.remote(&CredentialChain::new()).unwrap();
    backend
        .add("spec", &Keywords::new().with("plate", "*").with("fiber", "*"))
        .unwrap();
    assert_eq!(backend.set_stream().await.unwrap(), 3);

    let removed = backend
        .refine_task(r"3606", sas_sync::app::queue::FilterMode::Exclude)
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(
        backend.locations(0, None),
        vec!["dr17/spectro/3607/spec-3607-1.fits"]
    );

    backend.reset();
    assert!(backend.locations(0, None).is_empty());
}

#[test]
fn test_location_of_listing_urls() {
    let store = InMemoryTemplateStore::new().with_release("dr17", [("x", "$SAS_BASE_DIR/{a}")]);
    let resolver = PathResolver::new(
        Arc::new(store),
        ResolverConfig {
            release: Some("dr17".to_string()),
            ..ResolverConfig::default()
        },
        Environment::isolated(),
    )
    .unwrap();
    let core = sas_sync::app::access::AccessCore::new(
        resolver,
        StreamConfig::default(),
        AccessConfig::default(),
    );
    let curl = CurlAccess::new(core, RemoteConfig::default());
    assert_eq!(
        curl.location_of("https://data.sdss.org/sas/dr17/a/b.fits").as_deref(),
        Some("dr17/a/b.fits")
    );
}
