use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The message is not addressed to the bot.
    #[error("message is not addressed to the bot")]
    MissingMention,

    #[error("date or time is missing")]
    MissingTime,
}

/// A reminder command split into its parts. `date` is empty when the command
/// only names a time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command<'a> {
    pub mention: &'a str,
    pub date: &'a str,
    pub time: &'a str,
    pub content: &'a str,
}

/// Splits `@bot [M/D] H:MM content...` into its parts.
///
/// Tokens are only checked for their shape here, so `99/99` is accepted and
/// left for the time resolver to reject.
pub fn parse_command<'a>(text: &'a str, mention: &str) -> Result<Command<'a>, ParseError> {
    let (to, rest) = next_token(text);
    if to.is_empty() || to != mention {
        return Err(ParseError::MissingMention);
    }

    let (first, rest) = next_token(rest);
    let (date, time, rest) = if is_date(first) {
        let (time, rest) = next_token(rest);
        if !is_time(time) {
            return Err(ParseError::MissingTime);
        }
        (first, time, rest)
    } else if is_time(first) {
        ("", first, rest)
    } else {
        return Err(ParseError::MissingTime);
    };

    Ok(Command {
        mention: to,
        date,
        time,
        content: rest.trim(),
    })
}

/// `M/D` with one or two characters on each side.
pub fn is_date(token: &str) -> bool {
    has_shape(token, '/')
}

/// `H:MM` with one or two characters on each side.
pub fn is_time(token: &str) -> bool {
    has_shape(token, ':')
}

fn has_shape(token: &str, separator: char) -> bool {
    let mut parts = token.split(separator);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(left), Some(right), None) => is_short(left) && is_short(right),
        _ => false,
    }
}

fn is_short(part: &str) -> bool {
    matches!(part.chars().count(), 1 | 2)
}

fn next_token(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (text, ""),
    }
}
