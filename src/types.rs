use std::collections::HashMap;

use serde::Serialize;

/// One resolved file in the API response
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedFile {
    /// Display name of the file
    pub file_name: String,
    /// Human-readable size, e.g. "1.00 GB"
    pub size: String,
    /// Raw size in bytes
    pub size_bytes: u64,
    /// Download link as returned by the listing API
    pub download_url: String,
    /// Link after following one redirect hop, or `download_url` unchanged
    pub direct_download_url: String,
    pub is_directory: bool,
    pub modify_time: Option<u64>,
    pub thumbnails: HashMap<String, String>,
}

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// Format a byte count for display
///
/// Two decimal places from 1 KiB up; raw byte counts below that.
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes >= GIB {
        format!("{:.2} GB", size_bytes as f64 / GIB as f64)
    } else if size_bytes >= MIB {
        format!("{:.2} MB", size_bytes as f64 / MIB as f64)
    } else if size_bytes >= KIB {
        format!("{:.2} KB", size_bytes as f64 / KIB as f64)
    } else {
        format!("{} bytes", size_bytes)
    }
}
