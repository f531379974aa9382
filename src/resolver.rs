use std::sync::Arc;

use reqwest::header::LOCATION;
use reqwest::Method;
use tracing::{debug, info, warn};

use crate::error::{ResolveError, Result};
use crate::extract::{short_url_param, PatternExtractor, TokenExtractor};
use crate::http::RetryingClient;
use crate::listing::{
    directory_list_params, root_list_params, ListResponse, ShareFile, SHARE_LIST_PATH,
};
use crate::types::{format_size, ResolvedFile};

/// Resolves a share link to a list of files with direct download URLs
///
/// One resolution is three sequential upstream conversations: the share
/// page (for tokens), the listing API (optionally twice, when the share
/// is a single directory), and one redirect probe per file.
pub struct ShareResolver {
    http: RetryingClient,
    extractor: Arc<dyn TokenExtractor>,
    api_base: String,
}

impl ShareResolver {
    /// Create a resolver using the production page-scraping strategy
    pub fn new(http: RetryingClient, api_base: String) -> Self {
        Self::with_extractor(http, api_base, Arc::new(PatternExtractor))
    }

    /// Create a resolver with a custom token-extraction strategy
    pub fn with_extractor(
        http: RetryingClient,
        api_base: String,
        extractor: Arc<dyn TokenExtractor>,
    ) -> Self {
        Self {
            http,
            extractor,
            api_base,
        }
    }

    fn list_url(&self) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), SHARE_LIST_PATH)
    }

    /// Fetch the share page and replay its tokens against the listing API
    ///
    /// When the first top-level entry is a directory, its contents are
    /// listed instead; only that first entry is checked, and only one
    /// level is expanded.
    pub async fn fetch_listing(&self, share_url: &str) -> Result<Vec<ShareFile>> {
        let page = self
            .http
            .request(Method::GET, share_url, None, None, true)
            .await?;
        let final_url = page.url().clone();
        let body = page.text().await?;

        let tokens = self
            .extractor
            .extract(&body)
            .ok_or(ResolveError::Scrape { what: "page tokens" })?;
        let surl = short_url_param(&final_url).ok_or(ResolveError::Scrape {
            what: "surl parameter",
        })?;
        debug!(%surl, "extracted page tokens");

        let params = root_list_params(&tokens, &surl, final_url.as_str());
        let response = self
            .http
            .request(Method::GET, &self.list_url(), None, Some(&params), true)
            .await?;
        let data: ListResponse = response.json().await?;

        if data.list.is_empty() {
            debug!(errno = data.errno, "listing came back empty");
            return Err(ResolveError::NoFiles);
        }

        if data.list[0].is_dir() {
            let params =
                directory_list_params(&tokens, &surl, final_url.as_str(), &data.list[0].path);
            let response = self
                .http
                .request(Method::GET, &self.list_url(), None, Some(&params), true)
                .await?;
            let dir_data: ListResponse = response.json().await?;

            if dir_data.list.is_empty() {
                debug!(errno = dir_data.errno, "directory listing came back empty");
                return Err(ResolveError::NoFiles);
            }
            return Ok(dir_data.list);
        }

        Ok(data.list)
    }

    /// Follow one redirect hop to a direct download URL
    ///
    /// Probes with a no-follow HEAD first; on any failure falls back to a
    /// no-follow GET. Degrades to the original link, never fails.
    pub async fn resolve_direct_link(&self, dlink: &str) -> String {
        match self
            .http
            .request(Method::HEAD, dlink, None, None, false)
            .await
        {
            Ok(response) if response.status().is_redirection() => {
                if let Some(location) = location_header(&response) {
                    return location;
                }
            }
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "HEAD probe failed, falling back to GET");
            }
        }

        match self
            .http
            .request(Method::GET, dlink, None, None, false)
            .await
        {
            Ok(response) if response.status().is_redirection() => {
                location_header(&response).unwrap_or_else(|| dlink.to_string())
            }
            Ok(_) => dlink.to_string(),
            Err(err) => {
                warn!(error = %err, "could not resolve direct link");
                dlink.to_string()
            }
        }
    }

    /// Build the output record for one listing entry
    ///
    /// Entries without a usable download link are dropped.
    pub async fn process_file(&self, file: &ShareFile) -> Option<ResolvedFile> {
        let download_url = match &file.dlink {
            Some(link) if !link.is_empty() => link.clone(),
            _ => {
                warn!(file = %file.server_filename, "entry has no download link, dropping");
                return None;
            }
        };
        let direct_download_url = self.resolve_direct_link(&download_url).await;

        Some(ResolvedFile {
            file_name: file.server_filename.clone(),
            size: format_size(file.size),
            size_bytes: file.size,
            download_url,
            direct_download_url,
            is_directory: file.is_dir(),
            modify_time: file.server_mtime,
            thumbnails: file.thumbs.clone().unwrap_or_default(),
        })
    }

    /// Resolve a share link end to end
    ///
    /// Per-file failures drop that file from the output; the request only
    /// fails when no file survives.
    pub async fn resolve(&self, share_url: &str) -> Result<Vec<ResolvedFile>> {
        let files = self.fetch_listing(share_url).await?;
        info!(count = files.len(), "listing fetched");

        let mut results = Vec::with_capacity(files.len());
        for file in &files {
            if let Some(resolved) = self.process_file(file).await {
                results.push(resolved);
            }
        }

        if results.is_empty() {
            return Err(ResolveError::AllFilesFailed);
        }
        Ok(results)
    }
}

fn location_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::extract::Query;
    use axum::http::{header, StatusCode};
    use axum::response::Html;
    use axum::routing::{get, head};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use crate::http::RetryPolicy;

    const PAGE_BODY: &str = concat!(
        "<html><script>var u = 'x?fn%28%22JSTOKEN42%22%29';",
        "log('dp-logid=777&clienttype=0');</script></html>"
    );

    struct Upstream {
        base: String,
        queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    }

    /// Stub upstream serving a share page, the listing API, and a
    /// redirecting download endpoint
    ///
    /// The listing bodies are built from closures over the bound address so
    /// entries can point their `dlink` back at the stub.
    async fn spawn_upstream<F, G>(root_list: F, dir_list: G) -> Upstream
    where
        F: FnOnce(&str) -> Value,
        G: FnOnce(&str) -> Value,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let root_list = root_list(&base);
        let dir_list = dir_list(&base);
        let queries = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/s", get(|| async { Html(PAGE_BODY) }))
            .route(
                "/share/list",
                get({
                    let queries = queries.clone();
                    move |Query(query): Query<HashMap<String, String>>| {
                        let queries = queries.clone();
                        let root_list = root_list.clone();
                        let dir_list = dir_list.clone();
                        async move {
                            let is_dir_request = query.contains_key("dir");
                            queries.lock().unwrap().push(query);
                            Json(if is_dir_request { dir_list } else { root_list })
                        }
                    }
                }),
            )
            .route(
                "/dl/:name",
                get(|| async {
                    (
                        StatusCode::FOUND,
                        [(header::LOCATION, "https://cdn.example.com/direct/clip.mp4")],
                    )
                }),
            )
            .route(
                "/dl-headfail",
                head(|| async { StatusCode::FORBIDDEN }).get(|| async {
                    (
                        StatusCode::FOUND,
                        [(header::LOCATION, "https://example.com/file")],
                    )
                }),
            );

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Upstream { base, queries }
    }

    fn resolver_for(base: &str) -> ShareResolver {
        let client = RetryingClient::new(
            None,
            Duration::from_secs(5),
            RetryPolicy {
                max_retries: 2,
                retry_delay: Duration::from_millis(5),
            },
        )
        .unwrap();
        ShareResolver::new(client, base.to_string())
    }

    fn file_entry(name: &str, dlink: Option<&str>) -> Value {
        json!({
            "path": format!("/testdir/{}", name),
            "server_filename": name,
            "size": 2048,
            "isdir": "0",
            "server_mtime": 1700000000u64,
            "dlink": dlink,
        })
    }

    fn empty_list(_base: &str) -> Value {
        json!({"errno": 0, "list": []})
    }

    #[tokio::test]
    async fn test_flat_share_resolution() {
        let upstream = spawn_upstream(
            |base| {
                json!({"errno": 0, "list": [file_entry(
                    "clip.mp4",
                    Some(&format!("{}/dl/clip.mp4", base)),
                )]})
            },
            empty_list,
        )
        .await;

        let resolver = resolver_for(&upstream.base);
        let files = resolver
            .resolve(&format!("{}/s?surl=abc123", upstream.base))
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "clip.mp4");
        assert_eq!(files[0].size, "2.00 KB");
        assert_eq!(files[0].size_bytes, 2048);
        assert_eq!(
            files[0].direct_download_url,
            "https://cdn.example.com/direct/clip.mp4"
        );
        assert!(!files[0].is_directory);

        // Root listing carried the scraped tokens and share id
        let queries = upstream.queries.lock().unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].get("jsToken").unwrap(), "JSTOKEN42");
        assert_eq!(queries[0].get("dplogid").unwrap(), "777");
        assert_eq!(queries[0].get("shorturl").unwrap(), "abc123");
        assert_eq!(queries[0].get("root").unwrap(), "1");
    }

    #[tokio::test]
    async fn test_directory_share_expands_first_entry() {
        let upstream = spawn_upstream(
            |_| {
                json!({"errno": 0, "list": [{
                    "path": "/testdir",
                    "server_filename": "testdir",
                    "size": 0,
                    "isdir": "1",
                }]})
            },
            |base| {
                json!({"errno": 0, "list": [file_entry(
                    "inner.mp4",
                    Some(&format!("{}/dl/inner.mp4", base)),
                )]})
            },
        )
        .await;

        let resolver = resolver_for(&upstream.base);
        let files = resolver
            .resolve(&format!("{}/s?surl=abc123", upstream.base))
            .await
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "inner.mp4");

        let queries = upstream.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        let dir_query = &queries[1];
        assert_eq!(dir_query.get("dir").unwrap(), "/testdir");
        assert_eq!(dir_query.get("order").unwrap(), "asc");
        assert_eq!(dir_query.get("by").unwrap(), "name");
        assert!(!dir_query.contains_key("desc"));
        assert!(!dir_query.contains_key("root"));
    }

    #[tokio::test]
    async fn test_empty_listing_is_no_files() {
        let upstream = spawn_upstream(|_| json!({"errno": -9, "list": []}), empty_list).await;

        let resolver = resolver_for(&upstream.base);
        let err = resolver
            .resolve(&format!("{}/s?surl=abc123", upstream.base))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NoFiles));
    }

    #[tokio::test]
    async fn test_token_extraction_failure_is_scrape_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let app = Router::new().route("/s", get(|| async { Html("<html>no tokens</html>") }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let resolver = resolver_for(&base);
        let err = resolver
            .resolve(&format!("{}/s?surl=abc123", base))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Scrape { .. }));
    }

    #[tokio::test]
    async fn test_head_failure_falls_back_to_get() {
        let upstream = spawn_upstream(empty_list, empty_list).await;

        let resolver = resolver_for(&upstream.base);
        let direct = resolver
            .resolve_direct_link(&format!("{}/dl-headfail", upstream.base))
            .await;
        assert_eq!(direct, "https://example.com/file");
    }

    #[tokio::test]
    async fn test_unreachable_link_returned_unchanged() {
        let upstream = spawn_upstream(empty_list, empty_list).await;

        let resolver = resolver_for(&upstream.base);
        let dlink = "http://127.0.0.1:1/dl/missing";
        assert_eq!(resolver.resolve_direct_link(dlink).await, dlink);
    }

    #[tokio::test]
    async fn test_entries_without_dlink_dropped() {
        let upstream = spawn_upstream(
            |base| {
                json!({"errno": 0, "list": [
                    file_entry("ghost.mp4", None),
                    file_entry("real.mp4", Some(&format!("{}/dl/real.mp4", base))),
                ]})
            },
            empty_list,
        )
        .await;

        let resolver = resolver_for(&upstream.base);
        let files = resolver
            .resolve(&format!("{}/s?surl=abc123", upstream.base))
            .await
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "real.mp4");
    }

    #[tokio::test]
    async fn test_all_entries_failing_fails_request() {
        let upstream = spawn_upstream(
            |_| json!({"errno": 0, "list": [file_entry("ghost.mp4", None)]}),
            empty_list,
        )
        .await;

        let resolver = resolver_for(&upstream.base);
        let err = resolver
            .resolve(&format!("{}/s?surl=abc123", upstream.base))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AllFilesFailed));
    }
}
