use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::{Client, Method, Response, StatusCode};
use tokio::time::sleep;
use tracing::warn;

use crate::error::{ResolveError, Result};
use crate::headers::HeaderGenerator;

/// Retry behavior for upstream requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts before giving up
    pub max_retries: u32,
    /// Base delay; the wait grows linearly with the attempt number
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::config::MAX_RETRIES,
            retry_delay: crate::config::RETRY_DELAY,
        }
    }
}

/// HTTP client with bounded retry on 403 responses and transport errors
///
/// Each attempt sends a freshly randomized browser-like header set unless
/// explicit headers are supplied; the cookie header is always attached.
/// Non-403 error statuses fail immediately without retry. Redirect
/// following is selected per request via two underlying clients.
pub struct RetryingClient {
    follow: Client,
    no_follow: Client,
    headers: HeaderGenerator,
    cookie_header: Option<HeaderValue>,
    policy: RetryPolicy,
}

impl RetryingClient {
    /// Create a client with the given cookie header value and per-attempt timeout
    pub fn new(
        cookie_header: Option<String>,
        timeout: Duration,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let follow = Client::builder().timeout(timeout).build()?;
        let no_follow = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        let cookie_header = match cookie_header {
            Some(value) => Some(HeaderValue::from_str(&value).map_err(|_| {
                ResolveError::Config {
                    message: "cookie values are not valid header characters".to_string(),
                }
            })?),
            None => None,
        };
        Ok(Self {
            follow,
            no_follow,
            headers: HeaderGenerator::new(),
            cookie_header,
            policy,
        })
    }

    /// Perform a request with bounded retries
    ///
    /// Retries on a 403 status or a transport error, waiting
    /// `retry_delay * (attempt + 1)` between attempts. Any other error
    /// status is returned to the caller immediately. On exhausting the
    /// attempt budget the terminal error carries the last cause.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: Option<HeaderMap>,
        params: Option<&[(&str, String)]>,
        follow_redirects: bool,
    ) -> Result<Response> {
        let client = if follow_redirects {
            &self.follow
        } else {
            &self.no_follow
        };

        let mut attempt = 0;
        let mut last_error = None;

        while attempt < self.policy.max_retries {
            attempt += 1;

            let mut request_headers = headers
                .clone()
                .unwrap_or_else(|| self.headers.random_headers());
            if let Some(cookie) = &self.cookie_header {
                request_headers.insert(COOKIE, cookie.clone());
            }

            let mut builder = client.request(method.clone(), url).headers(request_headers);
            if let Some(params) = params {
                builder = builder.query(params);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::FORBIDDEN {
                        warn!(url, attempt, "blocked by upstream (403), retrying");
                        last_error = Some(ResolveError::UpstreamStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    } else if status.is_client_error() || status.is_server_error() {
                        return Err(ResolveError::UpstreamStatus {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    } else {
                        return Ok(response);
                    }
                }
                Err(err) => {
                    warn!(url, attempt, error = %err, "request error, retrying");
                    last_error = Some(ResolveError::Network(err));
                }
            }

            if attempt < self.policy.max_retries {
                sleep(self.policy.retry_delay * (attempt + 1)).await;
            }
        }

        let source = last_error.unwrap_or_else(|| ResolveError::Config {
            message: "retry budget is zero".to_string(),
        });
        Err(ResolveError::RetriesExhausted {
            attempts: self.policy.max_retries,
            source: Box::new(source),
        })
    }
}
