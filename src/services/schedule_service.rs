use crate::error::AppError;
use crate::models::{Assignment, Conflict, TimeSlot};

/// Parses `HH:MM` into minutes since midnight.
///
/// Accepts exactly two colon-separated runs of ASCII digits, with no
/// surrounding whitespace. Values are not range-checked, so `25:90` parses
/// to 1590.
pub fn time_to_minutes(time: &str) -> Result<u32, AppError> {
    let mut parts = time.split(':');
    let (Some(hours), Some(minutes), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::Parse(format!("'{}' is not HH:MM", time)));
    };

    let parse = |part: &str| -> Result<u32, AppError> {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Parse(format!("'{}' is not HH:MM", time)));
        }
        part.parse::<u32>()
            .map_err(|e| AppError::Parse(format!("'{}': {}", time, e)))
    };

    let hours = parse(hours)?;
    let minutes = parse(minutes)?;
    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .ok_or_else(|| AppError::Parse(format!("'{}' is out of range", time)))
}

/// Formats minutes as zero-padded `HH:MM`. Values of a day or more are not
/// wrapped.
pub fn minutes_to_time(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Builds a slot from two `HH:MM` strings
pub fn parse_slot(start: &str, end: &str) -> Result<TimeSlot, AppError> {
    Ok(TimeSlot::new(time_to_minutes(start)?, time_to_minutes(end)?))
}

pub fn format_slot(slot: &TimeSlot) -> String {
    format!(
        "{} - {}",
        minutes_to_time(slot.start),
        minutes_to_time(slot.end)
    )
}

/// Whether `candidate` collides with `existing` under half-open semantics.
/// Empty slots on either side never collide.
fn overlaps(candidate: &TimeSlot, existing: &TimeSlot) -> bool {
    if candidate.is_empty() || existing.is_empty() {
        return false;
    }

    let starts_inside = candidate.start >= existing.start && candidate.start < existing.end;
    let ends_inside = candidate.end > existing.start && candidate.end <= existing.end;
    let encloses = candidate.start <= existing.start && candidate.end >= existing.end;

    starts_inside || ends_inside || encloses
}

/// Returns the existing assignments that overlap `candidate`, in input order
pub fn detect_conflicts(candidate: &TimeSlot, existing: &[Assignment]) -> Vec<Conflict> {
    existing
        .iter()
        .filter(|assignment| overlaps(candidate, &assignment.slot))
        .map(|assignment| Conflict {
            job_label: assignment.job_label.clone(),
            time_range: format_slot(&assignment.slot),
        })
        .collect()
}

pub fn has_conflict(start: u32, end: u32, existing: &[Assignment]) -> bool {
    !detect_conflicts(&TimeSlot::new(start, end), existing).is_empty()
}
