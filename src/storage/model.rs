use std::collections::HashMap;

use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::reminder::{Record, ReminderId, ReminderTime};

use super::StorageError;

pub(super) const FIELD_COUNT: usize = 6;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One CSV row: `id, user_id, channel, content, created_at, remind_at`.
pub(super) struct RecordRow {
    pub id: String,
    pub user_id: String,
    pub channel: String,
    pub content: String,
    pub created_at: String,
    pub remind_at: String,
}

impl From<&Record> for RecordRow {
    fn from(value: &Record) -> Self {
        Self {
            id: value.id.clone(),
            user_id: value.user_id.clone(),
            channel: value.channel.clone(),
            content: value.content.clone(),
            created_at: format_timestamp(value.created_at.time()),
            remind_at: format_timestamp(value.remind_at.time()),
        }
    }
}

impl RecordRow {
    fn from_csv(row: &csv::StringRecord, line: u64) -> Result<Self, StorageError> {
        if row.len() != FIELD_COUNT {
            return Err(StorageError::MalformedRow {
                line,
                found: row.len(),
            });
        }
        let field = |i: usize| row.get(i).unwrap_or_default().to_owned();

        Ok(Self {
            id: field(0),
            user_id: field(1),
            channel: field(2),
            content: field(3),
            created_at: field(4),
            remind_at: field(5),
        })
    }

    fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.id,
            &self.user_id,
            &self.channel,
            &self.content,
            &self.created_at,
            &self.remind_at,
        ]
    }

    fn into_record(self, tz: &Tz, line: u64) -> Result<Record, StorageError> {
        let created_at = parse_timestamp(&self.created_at, tz, line)?;
        let remind_at = parse_timestamp(&self.remind_at, tz, line)?;

        Ok(Record {
            id: self.id,
            user_id: self.user_id,
            channel: self.channel,
            content: self.content,
            created_at: ReminderTime::new(created_at),
            remind_at: ReminderTime::new(remind_at),
        })
    }
}

/// `YYYY-MM-DD HH:MM:SS ZZZ`, the zone written as its abbreviation.
pub(crate) fn format_timestamp(at: &DateTime<Tz>) -> String {
    format!("{} {}", at.format(TIMESTAMP_FORMAT), at.offset())
}

/// Reads the wall clock in `tz`. The abbreviation must name the offset `tz`
/// has at that wall clock, and picks the candidate of an ambiguous local time.
pub(super) fn parse_timestamp(
    value: &str,
    tz: &Tz,
    line: u64,
) -> Result<DateTime<Tz>, StorageError> {
    let invalid = || StorageError::InvalidTimestamp {
        line,
        value: value.to_owned(),
    };

    let (wall_clock, abbreviation) = value.rsplit_once(' ').ok_or_else(invalid)?;
    if abbreviation.is_empty() {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(wall_clock, TIMESTAMP_FORMAT).map_err(|_| invalid())?;

    let same_zone = |at: &DateTime<Tz>| at.offset().to_string() == abbreviation;
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) if same_zone(&at) => Ok(at),
        LocalResult::Ambiguous(earliest, _) if same_zone(&earliest) => Ok(earliest),
        LocalResult::Ambiguous(_, latest) if same_zone(&latest) => Ok(latest),
        _ => Err(invalid()),
    }
}

/// Parses the whole file. Any bad row fails the entire read.
pub(super) fn read_records(
    contents: &[u8],
    tz: &Tz,
) -> Result<HashMap<ReminderId, Record>, StorageError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(contents);

    let mut records = HashMap::new();
    for row in reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let record = RecordRow::from_csv(&row, line)?.into_record(tz, line)?;
        records.insert(record.id.clone(), record);
    }

    Ok(records)
}

/// Serializes records ordered by due time, then id, so rewrites are stable.
pub(super) fn write_records<'a>(
    records: impl IntoIterator<Item = &'a Record>,
) -> Result<Vec<u8>, StorageError> {
    let mut records: Vec<_> = records.into_iter().collect();
    records.sort_by(|a, b| a.remind_at.cmp(&b.remind_at).then_with(|| a.id.cmp(&b.id)));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for record in records {
        writer.write_record(RecordRow::from(record).fields())?;
    }

    writer
        .into_inner()
        .map_err(|error| StorageError::Io(error.into_error()))
}
