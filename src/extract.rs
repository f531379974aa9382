use url::Url;

/// Return the substring strictly between the first `start` and the next
/// `end` after it
///
/// `None` when either delimiter is absent or `end` only occurs before
/// `start`.
pub fn find_between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let start_index = text.find(start)? + start.len();
    let end_offset = text[start_index..].find(end)?;
    Some(&text[start_index..start_index + end_offset])
}

/// Opaque tokens scraped from the share page, required by the listing API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTokens {
    pub js_token: String,
    pub log_id: String,
}

/// Strategy for pulling the listing-API tokens out of a share page
///
/// The page markup is undocumented and changes without notice; keeping the
/// scraping behind this seam lets the strategy be swapped without touching
/// the orchestration.
pub trait TokenExtractor: Send + Sync {
    fn extract(&self, page: &str) -> Option<PageTokens>;
}

/// Delimiters around the percent-encoded `fn("<token>")` call in the page JS
const JS_TOKEN_START: &str = "fn%28%22";
const JS_TOKEN_END: &str = "%22%29";
/// The dp-logid query parameter embedded in the page's log URLs
const LOG_ID_START: &str = "dp-logid=";
const LOG_ID_END: &str = "&";

/// Production extractor matching the current page markup
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl TokenExtractor for PatternExtractor {
    fn extract(&self, page: &str) -> Option<PageTokens> {
        let js_token = find_between(page, JS_TOKEN_START, JS_TOKEN_END)?;
        let log_id = find_between(page, LOG_ID_START, LOG_ID_END)?;
        Some(PageTokens {
            js_token: js_token.to_string(),
            log_id: log_id.to_string(),
        })
    }
}

/// Pull the `surl` share identifier from the final (post-redirect) page URL
pub fn short_url_param(final_url: &Url) -> Option<String> {
    final_url
        .query_pairs()
        .find(|(name, _)| name == "surl")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
