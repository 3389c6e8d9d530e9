use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use chrono_tz::Tz;
use teloxide::{
    prelude::*,
    types::{ParseMode, UserId},
    utils::html,
};

use crate::{
    delivery::ReminderDeliveryChannel,
    handler::{IncomingMessage, ReminderRequestHandler, Reply},
    reminder::Record,
};

type HandlerResult = anyhow::Result<()>;

/// The bot's own account and the mention commands must start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub mention: String,
}

#[derive(Clone)]
struct ChatContext {
    timezone: Tz,
    bot_id: UserId,
}

impl ChatContext {
    /// Never answer ourselves or other bots.
    fn is_from_bot(&self, author: UserId, author_is_bot: bool) -> bool {
        author_is_bot || author == self.bot_id
    }
}

pub struct TelegramInteractionInterface;

impl TelegramInteractionInterface {
    /// Dispatches incoming messages until Ctrl-C.
    pub async fn start(
        bot: Bot,
        handler: Arc<ReminderRequestHandler>,
        timezone: Tz,
        bot_id: UserId,
    ) {
        log::info!(
            "Starting Telegram interaction interface, listening for {}",
            handler.mention()
        );

        let schema = Update::filter_message().endpoint(receive_message);
        let context = ChatContext { timezone, bot_id };

        Dispatcher::builder(bot, schema)
            .dependencies(dptree::deps![handler, context])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await
    }
}

async fn receive_message(
    bot: Bot,
    msg: Message,
    handler: Arc<ReminderRequestHandler>,
    context: ChatContext,
) -> HandlerResult {
    let (Some(text), Some(user)) = (msg.text(), msg.from.as_ref()) else {
        return Ok(());
    };
    if context.is_from_bot(user.id, user.is_bot) {
        return Ok(());
    }

    let incoming = IncomingMessage {
        text: text.to_owned(),
        user_id: user.id.to_string(),
        channel: msg.chat.id.to_string(),
    };
    let now = Utc::now().with_timezone(&context.timezone);

    if let Some(reply) = handler.handle(&incoming, now).await {
        let body = reply_text(&reply, user.id, &user.full_name());
        bot.send_message(msg.chat.id, body)
            .parse_mode(ParseMode::Html)
            .await?;
    }

    Ok(())
}

/// Confirmations address the author, everything else is plain text.
fn reply_text(reply: &Reply, author: UserId, author_name: &str) -> String {
    let text = html::escape(&reply.to_string());
    match reply {
        Reply::Scheduled { .. } => format!("{} {text}", html::user_mention(author, author_name)),
        _ => text,
    }
}

/// Looks up the bot's account. The mention is `@username` unless one is
/// configured.
pub async fn identify_bot(
    bot: &Bot,
    configured_mention: Option<&str>,
) -> anyhow::Result<BotIdentity> {
    let me = bot.get_me().await.context("failed to look up bot user")?;

    let mention = match configured_mention.filter(|m| !m.is_empty()) {
        Some(mention) => mention.to_owned(),
        None => {
            let username = me
                .user
                .username
                .as_deref()
                .context("bot user has no username")?;
            format!("@{username}")
        }
    };

    Ok(BotIdentity {
        id: me.user.id,
        mention,
    })
}

pub struct TelegramDeliveryChannel {
    bot: Bot,
}

impl TelegramDeliveryChannel {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ReminderDeliveryChannel for TelegramDeliveryChannel {
    async fn send_reminder(&self, record: &Record) -> anyhow::Result<()> {
        let chat_id: i64 = record
            .channel
            .parse()
            .with_context(|| format!("channel {:?} is not a Telegram chat id", record.channel))?;

        self.bot
            .send_message(ChatId(chat_id), reminder_text(record))
            .parse_mode(ParseMode::Html)
            .await?;

        Ok(())
    }
}

fn reminder_text(record: &Record) -> String {
    let mention = format!(
        "<a href=\"tg://user?id={}\">⏰</a>",
        html::escape(&record.user_id)
    );

    if record.content.is_empty() {
        format!("{mention} Reminder!")
    } else {
        format!("{mention} {}", html::escape(&record.content))
    }
}
