use chrono::{DateTime, Local, Utc};

pub fn iso8601_millis(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn local_stamp(at: DateTime<Local>) -> String {
    at.format("%m/%d/%Y %H:%M:%S").to_string()
}

pub fn local_clock(at: DateTime<Local>) -> String {
    at.format("%Y-%m-%d %I:%M:%S %p").to_string()
}
