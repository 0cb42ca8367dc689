use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// The format accepted on the command line.
pub const INPUT_TIME_FORMAT: &str = "%Y-%m-%d/%H:%M:%S";
// The format used for timestamps persisted in the JSON book.
pub const STORED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const DEFAULT_PARTICIPANTS_LIMIT: usize = 1;

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Lottery {
    // A unique identifier, shared with the scheduled draw job.
    pub id: Uuid,
    // A reference to the creator of the lottery.
    pub creator: u64,
    // The chat scene (channel) the lottery belongs to.
    pub scene: u64,
    pub start_time: String,
    pub end_time: String,
    // A user-chosen identifier, unique within the scene.
    pub keyword: String,
    pub participants_limit: usize,
    #[serde(default)]
    pub participants: Vec<u64>,
    pub bot_id: u64,
    pub adapter: String,
}

impl Lottery {
    pub fn new(
        creator: u64,
        scene: u64,
        keyword: &str,
        participants_limit: usize,
        start_time: DateTime<Local>,
        end_time: DateTime<Local>,
        bot_id: u64,
    ) -> Self {
        Lottery {
            id: Uuid::new_v4(),
            creator,
            scene,
            start_time: start_time.format(STORED_TIME_FORMAT).to_string(),
            end_time: end_time.format(STORED_TIME_FORMAT).to_string(),
            keyword: keyword.to_string(),
            participants_limit,
            participants: Vec::new(),
            bot_id,
            adapter: "discord".to_string(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() >= self.participants_limit
    }

    // Parses the persisted end timestamp back into a local fire time.
    pub fn end_time(&self) -> Result<DateTime<Local>> {
        let naive = NaiveDateTime::parse_from_str(&self.end_time, STORED_TIME_FORMAT)
            .map_err(|_| {
                let message = format!("Invalid end time in the stored lottery: {}", self.end_time);
                Error::Lottery(message)
            })?;
        into_local(naive)
    }

    pub fn pretty_print(&self) -> String {
        format!(
            "Keyword: {}, Start: {}, End: {}, Participants: {} / {}",
            self.keyword,
            self.start_time,
            self.end_time,
            self.participants.len(),
            self.participants_limit,
        )
    }
}

// Parses a command-line timestamp in the YYYY-MM-DD/HH:MM:SS format.
pub fn parse_input_time(value: &str) -> Result<DateTime<Local>> {
    let naive = NaiveDateTime::parse_from_str(value, INPUT_TIME_FORMAT).map_err(|_| {
        Error::Lottery("Time format error, use YYYY-MM-DD/HH:MM:SS".to_string())
    })?;
    into_local(naive)
}

// The current local time, truncated to whole seconds to match the
// precision of the stored timestamps.
pub fn now_truncated() -> DateTime<Local> {
    let now = Local::now();
    now.with_nanosecond(0).unwrap_or(now)
}

// The default end time for a new lottery: today at 23:59:59.
pub fn default_end_time() -> Result<DateTime<Local>> {
    let now = Local::now();
    let naive = now
        .date_naive()
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| Error::Lottery("Can't compute the default end time".to_string()))?;
    into_local(naive)
}

fn into_local(naive: NaiveDateTime) -> Result<DateTime<Local>> {
    naive.and_local_timezone(Local).single().ok_or_else(|| {
        Error::Lottery("Time format error, use YYYY-MM-DD/HH:MM:SS".to_string())
    })
}
