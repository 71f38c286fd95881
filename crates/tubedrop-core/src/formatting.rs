use crate::domain::Delivery;

pub const WELCOME_TEXT: &str =
    "Welcome to the YouTube Downloader Bot. Please send me a YouTube link.";
pub const NEXT_LINK_TEXT: &str = "Please send me the next YouTube link.";
pub const CANCELLED_TEXT: &str = "Operation canceled.";
pub const BUSY_TEXT: &str = "Still working on your previous link. Send /cancel to abort it.";
pub const ENDED_TEXT: &str = "This conversation has ended. Send /start to begin again.";
pub const HELP_TEXT: &str = "Send /start, then a YouTube link. I download the video, upload it \
and reply with a download link that stays valid for a limited time.\n\n\
/start - begin\n/cancel - abort";
pub const NEXT_VIDEO_LABEL: &str = "Download Next Video";

pub fn success_reply(d: &Delivery) -> String {
    format!(
        "Title: {}\nViews: {}\nVideo has been uploaded. Download here: {}",
        d.metadata.title,
        d.metadata.views_label(),
        d.url
    )
}

/// Truncate to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectKey, RetrievalUrl, VideoMetadata};

    #[test]
    fn success_reply_layout() {
        let d = Delivery {
            metadata: VideoMetadata {
                id: "abc".to_string(),
                title: "A <b>title</b>".to_string(),
                view_count: Some(42),
            },
            key: ObjectKey("A-title-000000000000.mp4".to_string()),
            url: RetrievalUrl("https://bucket.s3.amazonaws.com/k?X-Amz-Expires=3600".to_string()),
        };
        assert_eq!(
            success_reply(&d),
            "Title: A <b>title</b>\nViews: 42\nVideo has been uploaded. Download here: https://bucket.s3.amazonaws.com/k?X-Amz-Expires=3600"
        );
    }

    #[test]
    fn unknown_views() {
        let m = VideoMetadata {
            id: "x".to_string(),
            title: "t".to_string(),
            view_count: None,
        };
        assert_eq!(m.views_label(), "unknown");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ééééééé", 5), "éé...");
    }
}
