use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Half-open `[start, end)` interval in minutes since midnight
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub start: u32,
    pub end: u32,
}

impl TimeSlot {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// True when the slot covers no minute at all
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Existing booking the conflict check runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub job_label: String,
    pub slot: TimeSlot,
}

impl Assignment {
    pub fn new(job_label: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            job_label: job_label.into(),
            slot,
        }
    }
}

/// An existing assignment that overlaps a candidate slot
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Conflict {
    pub job_label: String,
    /// `HH:MM - HH:MM`
    pub time_range: String,
}

/// Crew assignment stored in the local database
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduledAssignment {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub crew_member: String,
    pub job_label: String,
    pub work_date: NaiveDate,
    /// `HH:MM`
    pub start_time: String,
    /// `HH:MM`
    pub end_time: String,
    pub notes: Option<String>,
}

impl ScheduledAssignment {
    pub fn new(
        crew_member: String,
        job_label: String,
        work_date: NaiveDate,
        start_time: String,
        end_time: String,
    ) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            crew_member,
            job_label,
            work_date,
            start_time,
            end_time,
            notes: None,
        }
    }
}

impl TryFrom<&Row<'_>> for ScheduledAssignment {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        let uuid_str: String = row.get("uuid")?;
        let uuid = Uuid::parse_str(&uuid_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        let date_str: String = row.get("work_date")?;
        let work_date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;

        Ok(Self {
            id: row.get("id")?,
            uuid,
            crew_member: row.get("crew_member")?,
            job_label: row.get("job_label")?,
            work_date,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            notes: row.get("notes")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot() {
        assert!(TimeSlot::new(600, 600).is_empty());
        assert!(TimeSlot::new(660, 600).is_empty());
        assert!(!TimeSlot::new(540, 600).is_empty());
    }

    #[test]
    fn test_new_assignment_gets_uuid() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let a = ScheduledAssignment::new(
            "dana".to_string(),
            "Mitigation - 12 Elm St".to_string(),
            date,
            "08:00".to_string(),
            "12:00".to_string(),
        );
        assert!(!a.uuid.is_nil());
        assert!(a.id.is_none());
    }
}
