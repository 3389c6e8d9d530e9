use std::sync::Arc;

use anyhow::Context;
use ramen::{
    appsettings::AppSettings,
    handler::ReminderRequestHandler,
    storage::{FileReminderStorage, ReminderStorage},
    telegram::{self, TelegramDeliveryChannel, TelegramInteractionInterface},
    watcher::ReminderWatcher,
};
use teloxide::Bot;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = AppSettings::new().context("failed to load settings")?;
    let timezone = settings.bot.timezone;

    let storage = Arc::new(FileReminderStorage::new(&settings.storage.path, timezone));
    match storage.load().await {
        Ok(()) => {}
        Err(error) if error.is_not_found() => {
            log::warn!(
                "No reminders file at {}, starting empty",
                storage.path().display()
            );
        }
        Err(error) => return Err(error).context("load storage failed"),
    }

    let bot = Bot::new(settings.telegram.token.clone());
    let identity = telegram::identify_bot(&bot, settings.bot.mention.as_deref()).await?;
    log::info!(
        "{} is running as {} ({})",
        settings.bot.display_name,
        identity.mention,
        identity.id
    );

    let cancellation_token = CancellationToken::new();
    let delivery_channel = Arc::new(TelegramDeliveryChannel::new(bot.clone()));
    let watcher = ReminderWatcher::new(storage.clone(), delivery_channel, timezone).with_intervals(
        settings.watcher.tick_interval(),
        settings.watcher.pacing_interval(),
    );
    let watcher_task = watcher.spawn(cancellation_token.child_token());

    let handler = Arc::new(ReminderRequestHandler::new(storage, identity.mention));
    TelegramInteractionInterface::start(bot, handler, timezone, identity.id).await;

    cancellation_token.cancel();
    watcher_task.await.context("reminder watcher panicked")?;

    log::info!("Shut down");
    Ok(())
}
