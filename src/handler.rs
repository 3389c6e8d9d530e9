use std::{fmt, sync::Arc};

use chrono::DateTime;
use chrono_tz::Tz;

use crate::{
    command::{ParseError, parse_command},
    identity::make_id,
    reminder::{Record, ReminderTime},
    storage::{ReminderStorage, format_timestamp},
    time_resolver::{ResolveError, resolve_remind_at},
};

/// A chat message as delivered by the transport.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub text: String,
    pub user_id: String,
    pub channel: String,
}

/// What to answer in the channel the command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Scheduled { remind_at: DateTime<Tz> },
    Usage { mention: String },
    InvalidTime,
    TimeIsPast,
    NotSaved,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Scheduled { remind_at } => write!(
                f,
                "Got it! I'll remind you at {}.",
                remind_at.format("%Y/%m/%d %H:%M")
            ),
            Reply::Usage { mention } => write!(
                f,
                "When should I remind you? Try \"{mention} 12/10 10:00 eat ramen\" or \"{mention} 10:00 eat ramen\"."
            ),
            Reply::InvalidTime => write!(f, "I couldn't understand that time..."),
            Reply::TimeIsPast => write!(f, "That time has already passed."),
            Reply::NotSaved => write!(f, "Sorry, I couldn't save that reminder. Please try again."),
        }
    }
}

/// Turns addressed chat messages into stored reminders.
pub struct ReminderRequestHandler {
    storage: Arc<dyn ReminderStorage>,
    mention: String,
}

impl ReminderRequestHandler {
    pub fn new(storage: Arc<dyn ReminderStorage>, mention: impl Into<String>) -> Self {
        Self {
            storage,
            mention: mention.into(),
        }
    }

    pub fn mention(&self) -> &str {
        &self.mention
    }

    /// Returns `None` for messages that are not addressed to the bot.
    pub async fn handle(&self, message: &IncomingMessage, now: DateTime<Tz>) -> Option<Reply> {
        let command = match parse_command(&message.text, &self.mention) {
            Ok(command) => command,
            Err(ParseError::MissingMention) => return None,
            Err(ParseError::MissingTime) => {
                return Some(Reply::Usage {
                    mention: self.mention.clone(),
                });
            }
        };

        let remind_at = match resolve_remind_at(command.date, command.time, &now) {
            Ok(remind_at) => remind_at,
            Err(ResolveError::InvalidTime) => return Some(Reply::InvalidTime),
            Err(ResolveError::TimeIsPast) => return Some(Reply::TimeIsPast),
        };

        let record = Record {
            id: make_id(&format!("{}{}", format_timestamp(&remind_at), message.text)),
            user_id: message.user_id.clone(),
            channel: message.channel.clone(),
            content: command.content.to_owned(),
            created_at: ReminderTime::new(now),
            remind_at: ReminderTime::new(remind_at),
        };
        let id = record.id.clone();

        if let Err(error) = self.storage.save(record).await {
            log::error!("Failed to save reminder {id}: {error}");
            return Some(Reply::NotSaved);
        }

        log::info!("Scheduled reminder {id} for user {} at {remind_at}", message.user_id);
        Some(Reply::Scheduled { remind_at })
    }
}
