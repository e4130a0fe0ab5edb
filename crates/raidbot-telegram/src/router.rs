use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use raidbot_core::{
    config::Config,
    dispatch::LinkBot,
    messaging::port::{MessagingPort, PermissionPort},
    store::LinkStore,
};

use crate::handlers;
use crate::{TelegramMessenger, TelegramPermissions};

/// Long-poll Telegram until the process is interrupted.
pub async fn run_polling(cfg: Arc<Config>, store: Arc<LinkStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    let me = bot.get_me().await?;
    tracing::info!(username = me.username(), "raidbot started");
    if let Some(path) = &cfg.audit_log_path {
        tracing::info!(path = %path.display(), json = cfg.audit_log_json, "audit log enabled");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let permissions: Arc<dyn PermissionPort> =
        Arc::new(TelegramPermissions::new(bot.clone(), me.user.id));

    let app = Arc::new(
        LinkBot::new(store, messenger, permissions)
            .with_config(&cfg)
            .with_bot_username(me.username()),
    );

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    tracing::info!("bot is ready to receive messages");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
