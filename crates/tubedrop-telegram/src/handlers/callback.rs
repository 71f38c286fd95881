use std::sync::Arc;

use teloxide::prelude::*;

use tubedrop_core::{conversation::NEXT_VIDEO_CALLBACK, domain::ChatId};

use crate::router::AppState;

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<AppState>,
) -> ResponseResult<()> {
    let cb_id = q.id.clone();
    let chat_id = q.message.as_ref().map(|m| m.chat.id);
    let data = q.data.clone().unwrap_or_default();

    // Always answer callback query eventually.
    let Some(chat_id) = chat_id else {
        let _ = bot.answer_callback_query(cb_id).await;
        return Ok(());
    };

    if data != NEXT_VIDEO_CALLBACK {
        tracing::debug!(chat_id = chat_id.0, data = %data, "unknown callback data");
        let _ = bot.answer_callback_query(cb_id).await;
        return Ok(());
    }

    if let Err(e) = state
        .orchestrator
        .continue_with_next(ChatId(chat_id.0), &cb_id)
        .await
    {
        tracing::warn!(chat_id = chat_id.0, error = %e, "continuation button failed");
    }
    Ok(())
}
