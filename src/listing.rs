use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::extract::PageTokens;

/// Path of the listing endpoint, relative to the configured API base
pub const SHARE_LIST_PATH: &str = "/share/list";

const APP_ID: &str = "250528";
const CHANNEL: &str = "dubox";
const PAGE_SIZE: &str = "20";

/// Response envelope of the listing API
#[derive(Debug, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub errno: i64,
    #[serde(default)]
    pub list: Vec<ShareFile>,
}

/// One file or directory entry as returned by the listing API
///
/// The API serves some numeric fields as strings and vice versa depending
/// on the entry, so the scalar fields accept either encoding.
#[derive(Debug, Clone, Deserialize)]
pub struct ShareFile {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub server_filename: String,
    #[serde(default, deserialize_with = "u64_or_string")]
    pub size: u64,
    #[serde(default, deserialize_with = "string_or_number")]
    pub isdir: String,
    #[serde(default)]
    pub server_mtime: Option<u64>,
    #[serde(default)]
    pub dlink: Option<String>,
    #[serde(default)]
    pub thumbs: Option<HashMap<String, String>>,
}

impl ShareFile {
    pub fn is_dir(&self) -> bool {
        self.isdir == "1"
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

fn u64_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        String(String),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n,
        Raw::String(s) => s.parse().unwrap_or(0),
    })
}

/// Query parameters for the top-level listing of a share
pub fn root_list_params(
    tokens: &PageTokens,
    surl: &str,
    site_referer: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("app_id", APP_ID.to_string()),
        ("web", "1".to_string()),
        ("channel", CHANNEL.to_string()),
        ("clienttype", "0".to_string()),
        ("jsToken", tokens.js_token.clone()),
        ("dplogid", tokens.log_id.clone()),
        ("page", "1".to_string()),
        ("num", PAGE_SIZE.to_string()),
        ("order", "time".to_string()),
        ("desc", "1".to_string()),
        ("site_referer", site_referer.to_string()),
        ("shorturl", surl.to_string()),
        ("root", "1".to_string()),
    ]
}

/// Query parameters for listing a directory inside a share
///
/// Directory listings order ascending by name and do not accept the
/// `desc` or `root` parameters.
pub fn directory_list_params(
    tokens: &PageTokens,
    surl: &str,
    site_referer: &str,
    dir_path: &str,
) -> Vec<(&'static str, String)> {
    vec![
        ("app_id", APP_ID.to_string()),
        ("web", "1".to_string()),
        ("channel", CHANNEL.to_string()),
        ("clienttype", "0".to_string()),
        ("jsToken", tokens.js_token.clone()),
        ("dplogid", tokens.log_id.clone()),
        ("page", "1".to_string()),
        ("num", PAGE_SIZE.to_string()),
        ("order", "asc".to_string()),
        ("by", "name".to_string()),
        ("site_referer", site_referer.to_string()),
        ("shorturl", surl.to_string()),
        ("dir", dir_path.to_string()),
    ]
}
