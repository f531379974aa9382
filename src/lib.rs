pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod headers;
pub mod http;
pub mod listing;
pub mod resolver;
pub mod server;
pub mod types;

pub use config::Config;
pub use cookies::CookieJar;
pub use error::{ResolveError, Result};
pub use extract::{find_between, PageTokens, PatternExtractor, TokenExtractor};
pub use headers::HeaderGenerator;
pub use http::{RetryPolicy, RetryingClient};
pub use listing::{ListResponse, ShareFile};
pub use resolver::ShareResolver;
pub use server::{router, AppState};
pub use types::{format_size, ResolvedFile};
