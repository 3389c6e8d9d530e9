use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    #[error("remind date time is invalid")]
    InvalidTime,

    #[error("remind time is in the past")]
    TimeIsPast,
}

/// How far ahead of the new year a January or February date is read as next
/// year's.
const ROLLOVER_WINDOW: Months = Months::new(2);

/// Turns `M/D` and `H:MM` tokens into an instant in `now`'s timezone.
///
/// An empty `date` means today. The year is always `now`'s year, except that a
/// January or February date which has already passed is moved to next year
/// when `now` is within two months of the year end. A 29 February that would
/// land in a non-leap year is `InvalidTime`, never shifted to 1 March.
/// Instants equal to `now` count as past.
pub fn resolve_remind_at(
    date: &str,
    time: &str,
    now: &DateTime<Tz>,
) -> Result<DateTime<Tz>, ResolveError> {
    let tz = now.timezone();
    let (month, day) = if date.is_empty() {
        (now.month(), now.day())
    } else {
        parse_pair(date, '/')?
    };
    let (hour, minute) = parse_pair(time, ':')?;

    let date = NaiveDate::from_ymd_opt(now.year(), month, day).ok_or(ResolveError::InvalidTime)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ResolveError::InvalidTime)?;
    let remind_at = localize(&tz, date.and_time(time))?;

    if remind_at > *now {
        return Ok(remind_at);
    }

    if is_near_next_year(now) && matches!(date.month(), 1 | 2) {
        let next_year = date
            .with_year(now.year() + 1)
            .ok_or(ResolveError::InvalidTime)?;
        return localize(&tz, next_year.and_time(time));
    }

    Err(ResolveError::TimeIsPast)
}

fn is_near_next_year(now: &DateTime<Tz>) -> bool {
    now.date_naive()
        .checked_add_months(ROLLOVER_WINDOW)
        .is_none_or(|later| later.year() != now.year())
}

fn localize(tz: &Tz, naive: NaiveDateTime) -> Result<DateTime<Tz>, ResolveError> {
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or(ResolveError::InvalidTime)
}

fn parse_pair(token: &str, separator: char) -> Result<(u32, u32), ResolveError> {
    let (left, right) = token
        .split_once(separator)
        .ok_or(ResolveError::InvalidTime)?;
    Ok((parse_number(left)?, parse_number(right)?))
}

fn parse_number(part: &str) -> Result<u32, ResolveError> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ResolveError::InvalidTime);
    }
    part.parse().map_err(|_| ResolveError::InvalidTime)
}
