//! Fake collaborators shared by the in-crate tests.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify, Semaphore};

use crate::{
    domain::{
        ChatId, MessageId, MessageRef, ObjectKey, ResolvedVideo, RetrievalUrl, StreamDescriptor,
        VideoLink, VideoMetadata,
    },
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{ChatAction, InlineKeyboard, MessagingCapabilities},
    },
    ports::{LinkExtractor, ObjectStore, Stager},
    staging::StagedFile,
    Result,
};

pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("tubedrop-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Links starting with `https://` resolve (titles from the map, else derived
/// from the last path segment); `https://slow/...` never resolves; anything
/// else fails like yt-dlp does for non-URLs.
#[derive(Default)]
pub(crate) struct FakeExtractor {
    pub titles: HashMap<String, String>,
}

impl FakeExtractor {
    pub fn with_title(mut self, link: &str, title: &str) -> Self {
        self.titles.insert(link.to_string(), title.to_string());
        self
    }
}

#[async_trait]
impl LinkExtractor for FakeExtractor {
    async fn resolve(&self, link: &VideoLink) -> Result<ResolvedVideo> {
        let raw = link.as_str();
        if raw.starts_with("https://slow/") {
            std::future::pending::<()>().await;
        }
        if !raw.starts_with("https://") {
            return Err(Error::External(format!(
                "ERROR: [generic] '{raw}' is not a valid URL"
            )));
        }
        let id = raw.rsplit('/').next().unwrap_or("id").to_string();
        let title = self
            .titles
            .get(raw)
            .cloned()
            .unwrap_or_else(|| format!("Video {id}"));
        Ok(ResolvedVideo {
            metadata: VideoMetadata {
                id: id.clone(),
                title,
                view_count: Some(1234),
            },
            stream: StreamDescriptor {
                format_id: "18".to_string(),
                ext: "mp4".to_string(),
                height: Some(360),
                url: format!("https://media.example/{id}.mp4"),
                http_headers: Default::default(),
                filesize: Some(4),
            },
        })
    }
}

/// Announces every link it is asked for, then waits for one `release` permit
/// before resolving it like `FakeExtractor`.
pub(crate) struct GatedExtractor {
    pub entered: mpsc::UnboundedSender<String>,
    pub release: Arc<Semaphore>,
}

#[async_trait]
impl LinkExtractor for GatedExtractor {
    async fn resolve(&self, link: &VideoLink) -> Result<ResolvedVideo> {
        let _ = self.entered.send(link.as_str().to_string());
        self.release
            .acquire()
            .await
            .map_err(|_| Error::External("gate closed".to_string()))?
            .forget();
        FakeExtractor::default().resolve(link).await
    }
}

/// With `hold` set, the file is written and `hold` notified, then staging
/// never completes.
pub(crate) struct FakeStager {
    pub dir: PathBuf,
    pub staged: Mutex<Vec<PathBuf>>,
    pub fail: bool,
    pub hold: Option<Arc<Notify>>,
}

impl FakeStager {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            staged: Mutex::new(Vec::new()),
            fail: false,
            hold: None,
        }
    }

    pub fn staged_paths(&self) -> Vec<PathBuf> {
        self.staged.lock().unwrap().clone()
    }
}

#[async_trait]
impl Stager for FakeStager {
    async fn stage(&self, _stream: &StreamDescriptor, key: &ObjectKey) -> Result<StagedFile> {
        if self.fail {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "No space left on device",
            )));
        }
        let path = self.dir.join(key.file_name());
        std::fs::write(&path, b"mp4!")?;
        self.staged.lock().unwrap().push(path.clone());
        let staged = StagedFile::new(path);
        if let Some(hold) = &self.hold {
            hold.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(staged)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Upload {
    pub key: ObjectKey,
    pub title: String,
    pub file_existed: bool,
}

#[derive(Default)]
pub(crate) struct FakeStore {
    pub uploads: Mutex<Vec<Upload>>,
    pub fail_upload: bool,
    /// Notified when an upload starts; that upload then never completes.
    pub hold_upload: Option<Arc<Notify>>,
}

impl FakeStore {
    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn upload(&self, file: &std::path::Path, key: &ObjectKey, title: &str) -> Result<()> {
        if let Some(hold) = &self.hold_upload {
            hold.notify_one();
            std::future::pending::<()>().await;
        }
        if self.fail_upload {
            return Err(Error::External(
                "s3 put_object failed: AccessDenied".to_string(),
            ));
        }
        self.uploads.lock().unwrap().push(Upload {
            key: key.clone(),
            title: title.to_string(),
            file_existed: file.exists(),
        });
        Ok(())
    }

    async fn presign_get(&self, key: &ObjectKey, expires_in: Duration) -> Result<RetrievalUrl> {
        Ok(RetrievalUrl(format!(
            "https://youtubebotbucket.s3.us-east-1.amazonaws.com/{key}?X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Expires={}&X-Amz-Signature=fake",
            expires_in.as_secs()
        )))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Sent {
    pub chat_id: ChatId,
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

#[derive(Default)]
pub(crate) struct FakeMessenger {
    next_id: AtomicUsize,
    sent: Mutex<Vec<Sent>>,
    callbacks: Mutex<Vec<(String, Option<String>)>>,
    actions: Mutex<Vec<(ChatId, ChatAction)>>,
}

impl FakeMessenger {
    fn alloc(&self, chat_id: ChatId) -> MessageRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32 + 1;
        MessageRef {
            chat_id,
            message_id: MessageId(id),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }

    pub fn callbacks(&self) -> Vec<(String, Option<String>)> {
        self.callbacks.lock().unwrap().clone()
    }

    pub fn actions(&self) -> Vec<(ChatId, ChatAction)> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingPort for FakeMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_chat_actions: true,
            supports_inline_keyboards: true,
            max_message_len: 4096,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            keyboard: None,
        });
        Ok(self.alloc(chat_id))
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.actions.lock().unwrap().push((chat_id, action));
        Ok(())
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            keyboard: Some(keyboard),
        });
        Ok(self.alloc(chat_id))
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.callbacks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(|t| t.to_string())));
        Ok(())
    }
}

/// Parks every `send_inline_keyboard` call until `release` is notified.
#[derive(Default)]
pub(crate) struct GatedMessenger {
    pub inner: FakeMessenger,
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl MessagingPort for GatedMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        self.inner.send_text(chat_id, text).await
    }

    async fn send_chat_action(&self, chat_id: ChatId, action: ChatAction) -> Result<()> {
        self.inner.send_chat_action(chat_id, action).await
    }

    async fn send_inline_keyboard(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: InlineKeyboard,
    ) -> Result<MessageRef> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.send_inline_keyboard(chat_id, text, keyboard).await
    }

    async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        self.inner.answer_callback_query(callback_id, text).await
    }
}
