use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use crate::{errors::Error, Result};

pub const DEFAULT_BUCKET: &str = "youtubebotbucket";
pub const DEFAULT_PRESIGN_EXPIRY_SECS: u64 = 3600;
pub const DEFAULT_YTDLP_FORMAT: &str =
    "best[ext=mp4][vcodec!=none][acodec!=none]/best[vcodec!=none][acodec!=none]";

/// How a conversation continues after a link was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationMode {
    /// The conversation ends after one link.
    Single,
    /// Replies offer a "Download Next Video" button and keep accepting links.
    Continuous,
}

impl FromStr for ConversationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" | "once" => Ok(Self::Single),
            "continuous" | "loop" => Ok(Self::Continuous),
            other => Err(Error::Config(format!(
                "CONVERSATION_MODE must be `single` or `continuous`, got `{other}`"
            ))),
        }
    }
}

/// Typed configuration, built once at startup and passed down explicitly.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram
    pub telegram_bot_token: String,
    pub conversation_mode: ConversationMode,

    // Object storage
    pub s3_bucket: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_key_prefix: String,
    pub presign_expiry: Duration,

    // Extraction / staging
    pub ytdlp_path: PathBuf,
    pub ytdlp_format: String,
    pub staging_dir: PathBuf,
    pub download_timeout: Option<Duration>,

    // Worker pool
    pub max_concurrent_jobs: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token =
            resolve_bot_token(env_str("TELEGRAM_BOT_TOKEN"), env_str("API_KEY"))?;

        let conversation_mode = match env_str("CONVERSATION_MODE").and_then(non_empty) {
            Some(v) => v.parse()?,
            None => ConversationMode::Continuous,
        };

        let s3_bucket = env_str("S3_BUCKET")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        let s3_endpoint_url = env_str("S3_ENDPOINT_URL").and_then(non_empty);
        let s3_key_prefix = env_str("S3_KEY_PREFIX").unwrap_or_default();

        let presign_expiry = presign_expiry(
            env_u64("PRESIGN_EXPIRY_SECS").unwrap_or(DEFAULT_PRESIGN_EXPIRY_SECS),
        )?;

        let ytdlp_path = env_path("YTDLP_PATH")
            .or_else(|| which_in_path("yt-dlp"))
            .unwrap_or_else(|| PathBuf::from("/usr/local/bin/yt-dlp"));
        let ytdlp_format = env_str("YTDLP_FORMAT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_YTDLP_FORMAT.to_string());

        let staging_dir =
            env_path("STAGING_DIR").unwrap_or_else(|| PathBuf::from("/tmp/tubedrop"));
        fs::create_dir_all(&staging_dir)?;

        let download_timeout = env_u64("DOWNLOAD_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let max_concurrent_jobs = env_usize("MAX_CONCURRENT_JOBS").unwrap_or(4).max(1);

        Ok(Self {
            telegram_bot_token,
            conversation_mode,
            s3_bucket,
            s3_endpoint_url,
            s3_key_prefix,
            presign_expiry,
            ytdlp_path,
            ytdlp_format,
            staging_dir,
            download_timeout,
            max_concurrent_jobs,
        })
    }
}

/// `API_KEY` is accepted for older deployments when the primary is unset or blank.
fn resolve_bot_token(primary: Option<String>, legacy: Option<String>) -> Result<String> {
    primary
        .and_then(non_empty)
        .or_else(|| legacy.and_then(non_empty))
        .ok_or_else(|| {
            Error::Config("TELEGRAM_BOT_TOKEN environment variable is required".to_string())
        })
}

/// S3 SigV4 caps pre-signed URLs at 7 days.
const MAX_PRESIGN_EXPIRY_SECS: u64 = 7 * 24 * 3600;

fn presign_expiry(secs: u64) -> Result<Duration> {
    if secs == 0 || secs > MAX_PRESIGN_EXPIRY_SECS {
        return Err(Error::Config(format!(
            "PRESIGN_EXPIRY_SECS must be between 1 and {MAX_PRESIGN_EXPIRY_SECS}, got {secs}"
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim().trim_start_matches("export ").trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
