use std::sync::Arc;

use teloxide::prelude::*;

use tubedrop_core::{domain::ChatId, formatting::HELP_TEXT};

use crate::router::AppState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BotCommand {
    Start,
    Cancel,
    Help,
}

fn parse_command(text: &str) -> (String, String) {
    // Telegram may send `/cmd@botname arg1 ...`
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();

    (cmd, rest)
}

fn classify(cmd: &str) -> Option<BotCommand> {
    match cmd {
        "start" => Some(BotCommand::Start),
        "cancel" | "stop" => Some(BotCommand::Cancel),
        "help" => Some(BotCommand::Help),
        _ => None,
    }
}

pub async fn handle_command(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let (cmd, _args) = parse_command(text);
    let chat_id = ChatId(msg.chat.id.0);

    let result = match classify(&cmd) {
        Some(BotCommand::Start) => state.orchestrator.start(chat_id).await,
        Some(BotCommand::Cancel) => state.orchestrator.cancel(chat_id).await,
        Some(BotCommand::Help) => {
            if let Err(e) = bot.send_message(msg.chat.id, HELP_TEXT).await {
                tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send help");
            }
            Ok(())
        }
        None => {
            tracing::debug!(chat_id = chat_id.0, command = %cmd, "unknown command ignored");
            Ok(())
        }
    };

    if let Err(e) = result {
        tracing::warn!(chat_id = chat_id.0, command = %cmd, error = %e, "command failed");
    }
    Ok(())
}
