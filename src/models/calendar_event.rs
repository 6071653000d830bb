use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const INSTRUCTOR_EVENT_TITLE: &str = "Group Consultation";

/// Which of the two mirrored calendars an operation addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarTarget {
    Instructor,
    Admin,
}

impl fmt::Display for CalendarTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalendarTarget::Instructor => f.write_str("instructor"),
            CalendarTarget::Admin => f.write_str("admin"),
        }
    }
}

/// Title variant on the admin calendar. A slot holds at most two sessions:
/// the first is a plain session, the second is paired with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTitle {
    Session,
    PairedSession,
}

impl SessionTitle {
    /// `position` is the 1-based count of confirmed candidates in the slot,
    /// including the one just confirmed.
    pub fn for_position(position: usize) -> Self {
        if position <= 1 {
            SessionTitle::Session
        } else {
            SessionTitle::PairedSession
        }
    }

    pub fn admin_title(&self, instructor_name: &str) -> String {
        match self {
            SessionTitle::Session => format!("Group Consultation {}", instructor_name),
            SessionTitle::PairedSession => format!("Instructor Dialogue {}", instructor_name),
        }
    }
}

/// Event payload handed to a calendar provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEventRequest {
    pub title: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub time_zone: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_confirmation_in_slot_is_a_paired_session() {
        assert_eq!(SessionTitle::for_position(1), SessionTitle::Session);
        assert_eq!(SessionTitle::for_position(2), SessionTitle::PairedSession);
        assert_eq!(
            SessionTitle::PairedSession.admin_title("Tanaka"),
            "Instructor Dialogue Tanaka"
        );
    }
}
