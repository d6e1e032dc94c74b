use crate::error::AppError;
use crate::models::{Assignment, Conflict, ScheduledAssignment, TimeSlot};
use crate::services::schedule_service::{self, minutes_to_time, parse_slot};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Checks the slot and label, returning the parsed slot
fn validate(assignment: &ScheduledAssignment) -> Result<TimeSlot, AppError> {
    if assignment.crew_member.trim().is_empty() {
        return Err(AppError::Validation("Crew member must not be empty".to_string()));
    }
    if assignment.job_label.trim().is_empty() {
        return Err(AppError::Validation("Job label must not be empty".to_string()));
    }

    let slot = parse_slot(&assignment.start_time, &assignment.end_time)?;
    if slot.is_empty() {
        return Err(AppError::Validation(format!(
            "Start {} must be before end {}",
            assignment.start_time, assignment.end_time
        )));
    }
    Ok(slot)
}

/// Stores an assignment. Times are normalized to zero-padded `HH:MM`.
pub fn add_assignment(conn: &Connection, assignment: &ScheduledAssignment) -> Result<Uuid, AppError> {
    let slot = validate(assignment)?;

    conn.execute(
        "INSERT INTO assignments (uuid, crew_member, job_label, work_date, start_time, end_time, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            assignment.uuid.to_string(),
            assignment.crew_member.trim(),
            assignment.job_label.trim(),
            assignment.work_date.format("%Y-%m-%d").to_string(),
            minutes_to_time(slot.start),
            minutes_to_time(slot.end),
            &assignment.notes,
        ],
    )?;

    log::debug!(
        "Added assignment {} for {} on {}",
        assignment.uuid,
        assignment.crew_member,
        assignment.work_date
    );
    Ok(assignment.uuid)
}

/// Assignments of one crew member on one day, earliest first
pub fn list_assignments(
    conn: &Connection,
    crew_member: &str,
    work_date: NaiveDate,
) -> Result<Vec<ScheduledAssignment>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, uuid, crew_member, job_label, work_date, start_time, end_time, notes
         FROM assignments
         WHERE crew_member = ?1 AND work_date = ?2
         ORDER BY start_time ASC, id ASC",
    )?;

    let rows = stmt.query_map(
        params![crew_member.trim(), work_date.format("%Y-%m-%d").to_string()],
        |row| ScheduledAssignment::try_from(row),
    )?;

    let mut assignments = Vec::new();
    for row in rows {
        assignments.push(row?);
    }
    Ok(assignments)
}

pub fn delete_assignment(conn: &Connection, uuid: &Uuid) -> Result<(), AppError> {
    let rows_affected = conn.execute(
        "DELETE FROM assignments WHERE uuid = ?1",
        params![uuid.to_string()],
    )?;

    if rows_affected == 0 {
        return Err(AppError::NotFound(format!("Assignment {}", uuid)));
    }
    Ok(())
}

/// Runs the conflict detector against the stored day of a crew member
pub fn check_assignment_conflicts(
    conn: &Connection,
    crew_member: &str,
    work_date: NaiveDate,
    candidate: &TimeSlot,
) -> Result<Vec<Conflict>, AppError> {
    let existing = list_assignments(conn, crew_member, work_date)?
        .iter()
        .map(|a| -> Result<Assignment, AppError> {
            Ok(Assignment::new(
                a.job_label.clone(),
                parse_slot(&a.start_time, &a.end_time)?,
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(schedule_service::detect_conflicts(candidate, &existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        database::schema::init_schema(&conn).unwrap();
        conn
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 14).unwrap()
    }

    fn booking(member: &str, label: &str, start: &str, end: &str) -> ScheduledAssignment {
        ScheduledAssignment::new(
            member.to_string(),
            label.to_string(),
            day(),
            start.to_string(),
            end.to_string(),
        )
    }

    #[test]
    fn test_add_and_list_sorted_and_normalized() {
        let conn = setup();
        add_assignment(&conn, &booking("sam", "Dry-out check", "13:00", "14:00")).unwrap();
        add_assignment(&conn, &booking("sam", "Mold remediation", "8:00", "9:30")).unwrap();
        add_assignment(&conn, &booking("lee", "Board-up", "08:00", "10:00")).unwrap();

        let list = list_assignments(&conn, "sam", day()).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].job_label, "Mold remediation");
        assert_eq!(list[0].start_time, "08:00");
        assert_eq!(list[1].job_label, "Dry-out check");
    }

    #[test]
    fn test_add_rejects_inverted_and_malformed_slots() {
        let conn = setup();
        let inverted = add_assignment(&conn, &booking("sam", "Demo", "10:00", "09:00"));
        assert!(matches!(inverted, Err(AppError::Validation(_))));

        let empty = add_assignment(&conn, &booking("sam", "Demo", "10:00", "10:00"));
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let malformed = add_assignment(&conn, &booking("sam", "Demo", "ten", "11:00"));
        assert!(matches!(malformed, Err(AppError::Parse(_))));

        assert!(list_assignments(&conn, "sam", day()).unwrap().is_empty());
    }

    #[test]
    fn test_check_conflicts_against_stored_day() {
        let conn = setup();
        add_assignment(&conn, &booking("sam", "Water extraction", "09:30", "10:30")).unwrap();
        add_assignment(&conn, &booking("sam", "Estimate", "10:30", "11:00")).unwrap();
        add_assignment(&conn, &booking("lee", "Other crew", "09:00", "12:00")).unwrap();

        let candidate = parse_slot("09:00", "10:00").unwrap();
        let conflicts = check_assignment_conflicts(&conn, "sam", day(), &candidate).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].job_label, "Water extraction");
        assert_eq!(conflicts[0].time_range, "09:30 - 10:30");

        let back_to_back = parse_slot("11:00", "12:00").unwrap();
        assert!(check_assignment_conflicts(&conn, "sam", day(), &back_to_back)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_assignment() {
        let conn = setup();
        let id = add_assignment(&conn, &booking("sam", "Demo", "07:00", "08:00")).unwrap();
        delete_assignment(&conn, &id).unwrap();
        assert!(list_assignments(&conn, "sam", day()).unwrap().is_empty());
        assert!(matches!(
            delete_assignment(&conn, &id),
            Err(AppError::NotFound(_))
        ));
    }
}
