//! Per-chat conversation flow.
//!
//! States: `AwaitingLink` -> `HandlingLink` -> (ended | `AwaitingLink`).
//! A chat without a session is in the terminal state. Every operation sends
//! exactly one chat message; link jobs run on a bounded task pool and report
//! back through the messenger.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::{
    sync::{Mutex, OwnedMutexGuard, Semaphore},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::ConversationMode,
    domain::{ChatId, VideoLink},
    errors::PipelineError,
    formatting::{
        success_reply, truncate_chars, BUSY_TEXT, CANCELLED_TEXT, ENDED_TEXT, NEXT_LINK_TEXT,
        NEXT_VIDEO_LABEL, WELCOME_TEXT,
    },
    messaging::{
        port::MessagingPort,
        types::{ChatAction, InlineKeyboard},
    },
    pipeline::Pipeline,
    Result,
};

/// Callback data of the continuation button.
pub const NEXT_VIDEO_CALLBACK: &str = "next_video";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConversationState {
    AwaitingLink,
    HandlingLink,
}

#[derive(Debug)]
struct Session {
    state: ConversationState,
    /// Bumped whenever the session is (re)created; stale jobs compare against it.
    generation: u64,
    job: Option<CancellationToken>,
}

type Sessions = Arc<Mutex<HashMap<ChatId, Session>>>;

/// One lock per chat, held across a session change and the message that
/// reports it, so a job's reply and `/cancel` or `/start` never interleave.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<ChatId, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: ChatId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub struct Orchestrator {
    mode: ConversationMode,
    pipeline: Arc<Pipeline>,
    messenger: Arc<dyn MessagingPort>,
    workers: Arc<Semaphore>,
    sessions: Sessions,
    chat_locks: Arc<ChatLocks>,
    generations: AtomicU64,
}

enum LinkAdmission {
    NoSession,
    Busy,
    Accepted {
        generation: u64,
        token: CancellationToken,
    },
}

impl Orchestrator {
    pub fn new(
        mode: ConversationMode,
        pipeline: Arc<Pipeline>,
        messenger: Arc<dyn MessagingPort>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            mode,
            pipeline,
            messenger,
            workers: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            chat_locks: Arc::new(ChatLocks::default()),
            generations: AtomicU64::new(1),
        }
    }

    pub fn mode(&self) -> ConversationMode {
        self.mode
    }

    pub async fn state(&self, chat_id: ChatId) -> Option<ConversationState> {
        self.sessions.lock().await.get(&chat_id).map(|s| s.state)
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::Relaxed)
    }

    /// `/start`: (re)enter `AwaitingLink`, dropping whatever the chat was doing.
    pub async fn start(&self, chat_id: ChatId) -> Result<()> {
        let _chat = self.chat_locks.lock_chat(chat_id).await;
        let previous = {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(
                chat_id,
                Session {
                    state: ConversationState::AwaitingLink,
                    generation: self.next_generation(),
                    job: None,
                },
            )
        };
        if let Some(token) = previous.and_then(|s| s.job) {
            tracing::info!(chat_id = chat_id.0, "restart cancels in-flight job");
            token.cancel();
        }

        self.messenger.send_text(chat_id, WELCOME_TEXT).await?;
        Ok(())
    }

    /// Free text while `AwaitingLink`: spawn the pipeline job for it.
    ///
    /// Returns the job handle when a job was started.
    pub async fn handle_link(&self, chat_id: ChatId, text: &str) -> Result<Option<JoinHandle<()>>> {
        let admission = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&chat_id) {
                None => LinkAdmission::NoSession,
                Some(s) if s.state == ConversationState::HandlingLink => LinkAdmission::Busy,
                Some(s) => {
                    let token = CancellationToken::new();
                    s.state = ConversationState::HandlingLink;
                    s.job = Some(token.clone());
                    LinkAdmission::Accepted {
                        generation: s.generation,
                        token,
                    }
                }
            }
        };

        match admission {
            LinkAdmission::NoSession => {
                tracing::debug!(chat_id = chat_id.0, "text outside a conversation ignored");
                Ok(None)
            }
            LinkAdmission::Busy => {
                self.messenger.send_text(chat_id, BUSY_TEXT).await?;
                Ok(None)
            }
            LinkAdmission::Accepted { generation, token } => {
                let job = LinkJob {
                    chat_id,
                    generation,
                    link: VideoLink::new(text),
                    token,
                    mode: self.mode,
                    pipeline: self.pipeline.clone(),
                    messenger: self.messenger.clone(),
                    workers: self.workers.clone(),
                    sessions: self.sessions.clone(),
                    chat_locks: self.chat_locks.clone(),
                };
                Ok(Some(tokio::spawn(job.run())))
            }
        }
    }

    /// `/cancel`: end the conversation at any point, aborting a running job.
    pub async fn cancel(&self, chat_id: ChatId) -> Result<()> {
        let _chat = self.chat_locks.lock_chat(chat_id).await;
        let removed = self.sessions.lock().await.remove(&chat_id);
        if let Some(token) = removed.and_then(|s| s.job) {
            tracing::info!(chat_id = chat_id.0, "cancelling in-flight job");
            token.cancel();
        }

        self.messenger.send_text(chat_id, CANCELLED_TEXT).await?;
        Ok(())
    }

    /// "Download Next Video" button: route the chat back to `AwaitingLink`.
    pub async fn continue_with_next(&self, chat_id: ChatId, callback_id: &str) -> Result<()> {
        if self.mode == ConversationMode::Single {
            self.messenger
                .answer_callback_query(callback_id, Some(ENDED_TEXT))
                .await?;
            return Ok(());
        }

        let _chat = self.chat_locks.lock_chat(chat_id).await;
        let busy = {
            let mut sessions = self.sessions.lock().await;
            match sessions.get_mut(&chat_id) {
                Some(s) if s.state == ConversationState::HandlingLink => true,
                Some(s) => {
                    s.state = ConversationState::AwaitingLink;
                    false
                }
                None => {
                    sessions.insert(
                        chat_id,
                        Session {
                            state: ConversationState::AwaitingLink,
                            generation: self.next_generation(),
                            job: None,
                        },
                    );
                    false
                }
            }
        };

        if busy {
            self.messenger
                .answer_callback_query(callback_id, Some(BUSY_TEXT))
                .await?;
            return Ok(());
        }

        self.messenger
            .answer_callback_query(callback_id, None)
            .await?;
        self.messenger.send_text(chat_id, NEXT_LINK_TEXT).await?;
        Ok(())
    }
}

struct LinkJob {
    chat_id: ChatId,
    generation: u64,
    link: VideoLink,
    token: CancellationToken,
    mode: ConversationMode,
    pipeline: Arc<Pipeline>,
    messenger: Arc<dyn MessagingPort>,
    workers: Arc<Semaphore>,
    sessions: Sessions,
    chat_locks: Arc<ChatLocks>,
}

impl LinkJob {
    async fn run(self) {
        let chat_id = self.chat_id;

        let _permit = tokio::select! {
            biased;
            _ = self.token.cancelled() => return,
            permit = self.workers.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => return,
            },
        };

        let _ = self
            .messenger
            .send_chat_action(chat_id, ChatAction::UploadVideo)
            .await;

        tracing::info!(chat_id = chat_id.0, link = %self.link, "handling link");
        let outcome = self.pipeline.run(&self.link, &self.token).await;

        let reply = match &outcome {
            Ok(delivery) => {
                tracing::info!(chat_id = chat_id.0, key = %delivery.key, "delivered");
                success_reply(delivery)
            }
            Err(PipelineError::Cancelled) => {
                tracing::info!(chat_id = chat_id.0, "job cancelled");
                return;
            }
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, stage = e.stage(), error = %e, "job failed");
                e.user_message()
            }
        };

        // Held until the reply is out; `/cancel` waits for it.
        let _chat = self.chat_locks.lock_chat(chat_id).await;
        if !self.finish().await {
            tracing::debug!(chat_id = chat_id.0, "session moved on; reply dropped");
            return;
        }

        let limit = self.messenger.capabilities().max_message_len;
        let reply = truncate_chars(&reply, limit);
        let sent = match self.mode {
            ConversationMode::Single => self.messenger.send_text(chat_id, &reply).await,
            ConversationMode::Continuous => {
                self.messenger
                    .send_inline_keyboard(
                        chat_id,
                        &reply,
                        InlineKeyboard::single(NEXT_VIDEO_LABEL, NEXT_VIDEO_CALLBACK),
                    )
                    .await
            }
        };
        if let Err(e) = sent {
            tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send job reply");
        }
    }

    /// Leave `HandlingLink`. Returns false if the session this job belonged to
    /// is gone (cancelled or restarted).
    async fn finish(&self) -> bool {
        let mut sessions = self.sessions.lock().await;
        let current = matches!(
            sessions.get(&self.chat_id),
            Some(s) if s.generation == self.generation && !self.token.is_cancelled()
        );
        if !current {
            return false;
        }
        match self.mode {
            ConversationMode::Single => {
                sessions.remove(&self.chat_id);
            }
            ConversationMode::Continuous => {
                if let Some(s) = sessions.get_mut(&self.chat_id) {
                    s.state = ConversationState::AwaitingLink;
                    s.job = None;
                }
            }
        }
        true
    }
}
