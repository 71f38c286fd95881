use std::sync::Arc;

use teloxide::prelude::*;

use tubedrop_core::domain::ChatId;

use crate::router::AppState;

/// Free text is a link candidate; the orchestrator decides whether the chat
/// is waiting for one.
pub async fn handle_text(_bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    if text.trim().is_empty() {
        return Ok(());
    }

    let chat_id = ChatId(msg.chat.id.0);
    // The job runs detached; the handler returns right away so other chats
    // are not held up.
    if let Err(e) = state.orchestrator.handle_link(chat_id, text).await {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to handle link message");
    }
    Ok(())
}
