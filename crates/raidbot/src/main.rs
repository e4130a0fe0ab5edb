use std::sync::Arc;

use raidbot_core::{config::Config, store::LinkStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    raidbot_core::logging::init("raidbot")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(LinkStore::new());

    tracing::info!("starting raidbot");
    raidbot_telegram::router::run_polling(cfg, store.clone()).await?;

    tracing::info!(chats = store.chat_count(), "raidbot stopped");
    Ok(())
}
