use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;

/// Cookies loaded from a Netscape-format cookie file
///
/// Each line is a tab-separated record; lines starting with `#` and blank
/// lines are comments. Only the name (field 5) and value (field 6) columns
/// are used; records with fewer than 7 fields are skipped.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
}

impl CookieJar {
    /// Load cookies from a file, returning an empty jar if the file is absent
    ///
    /// Absence of cookies is not an error here; callers that require
    /// credentials check `is_empty` and fail on their own terms.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    /// Parse cookie-file text into a jar
    pub fn parse(text: &str) -> Self {
        let mut cookies = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() >= 7 {
                cookies.insert(parts[5].to_string(), parts[6].to_string());
            }
        }
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Render the jar as a `Cookie` request-header value
    pub fn header_value(&self) -> String {
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }
}
