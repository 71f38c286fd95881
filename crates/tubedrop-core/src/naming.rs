//! Object keys and download file names derived from untrusted titles.

use std::sync::OnceLock;

use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::{ObjectKey, VideoLink, VideoMetadata};

const SLUG_MAX_LEN: usize = 80;
const TOKEN_LEN: usize = 12;

fn non_slug_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_]+").expect("valid regex"))
}

/// Reduce a title to `[A-Za-z0-9_]` words joined by single `-`.
pub fn slugify(title: &str) -> String {
    let replaced = non_slug_re().replace_all(title, "-");
    let trimmed = replaced.trim_matches('-');
    let mut slug: String = trimmed.chars().take(SLUG_MAX_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "video".to_string()
    } else {
        slug
    }
}

/// Opaque per-request key: `{prefix}{slug}-{token}.mp4`.
///
/// The token mixes the link, the video id and `nonce`, so two requests for
/// the same video (or two videos with the same title) never collide.
pub fn object_key(prefix: &str, link: &VideoLink, meta: &VideoMetadata, nonce: u128) -> ObjectKey {
    let mut h = Sha256::new();
    h.update(link.as_str().as_bytes());
    h.update([0u8]);
    h.update(meta.id.as_bytes());
    h.update([0u8]);
    h.update(nonce.to_le_bytes());
    let token = hex_prefix(&h.finalize(), TOKEN_LEN);

    let prefix = prefix.trim_matches('/');
    let name = format!("{}-{token}.mp4", slugify(&meta.title));
    if prefix.is_empty() {
        ObjectKey(name)
    } else {
        ObjectKey(format!("{prefix}/{name}"))
    }
}

/// Nonce for [`object_key`]: wall clock nanos.
pub fn time_nonce() -> u128 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n as u128)
        .unwrap_or_default()
}

/// File name offered to the downloader (`Content-Disposition`).
pub fn download_file_name(title: &str) -> String {
    format!("{}.mp4", slugify(title))
}

/// Title restricted to printable ASCII so it can travel as object metadata.
pub fn metadata_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect::<String>()
        .trim()
        .to_string()
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(len);
    for b in bytes {
        let _ = write!(&mut out, "{:02x}", b);
        if out.len() >= len {
            out.truncate(len);
            break;
        }
    }
    out
}
