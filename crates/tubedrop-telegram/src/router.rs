use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tubedrop_core::{
    config::Config, conversation::Orchestrator, messaging::port::MessagingPort,
    pipeline::Pipeline,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub orchestrator: Arc<Orchestrator>,
}

pub async fn run_polling(cfg: Arc<Config>, pipeline: Arc<Pipeline>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    match bot.get_me().await {
        Ok(me) => tracing::info!(username = %me.username(), "tubedrop started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed; continuing"),
    }
    tracing::info!(
        bucket = %cfg.s3_bucket,
        mode = ?cfg.conversation_mode,
        staging_dir = %cfg.staging_dir.display(),
        workers = cfg.max_concurrent_jobs,
        "configuration loaded"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let orchestrator = Arc::new(Orchestrator::new(
        cfg.conversation_mode,
        pipeline,
        messenger,
        cfg.max_concurrent_jobs,
    ));

    let state = Arc::new(AppState {
        cfg: cfg.clone(),
        orchestrator,
    });

    let handler = dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handlers::handle_callback))
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
