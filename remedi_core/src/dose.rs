//! Dose occurrence calculator.
//!
//! Pure functions over [`Medication`] schedule parameters: no I/O, no side
//! effects. A medication's *treatment window* runs from `start_time` up to
//! (but excluding) midnight after its final calendar day, i.e.
//! `total_days` counts calendar days starting with the day of the first
//! dose. A dose occurrence exists at `start_time + k * interval_hours` for
//! every k >= 0 that lands strictly inside the window.

use crate::Medication;
use chrono::{DateTime, Duration, NaiveTime, Utc};

/// Exclusive end of the treatment window: midnight (UTC) after the last
/// calendar day of treatment.
pub fn window_end(medication: &Medication) -> DateTime<Utc> {
    let day_start = medication
        .start_time
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();
    day_start + Duration::days(i64::from(medication.total_days))
}

/// The next pending dose at `now`, if any.
///
/// Returns `None` when the medication is inactive or `now` has reached the
/// window end. The lower bound is non-strict: when `now` falls exactly on
/// an occurrence, that occurrence is the next dose. Runs in constant time
/// via interval arithmetic rather than walking every elapsed occurrence.
pub fn next_dose(medication: &Medication, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if !medication.is_active {
        return None;
    }
    let end = window_end(medication);
    if now >= end {
        return None;
    }
    if now <= medication.start_time {
        return Some(medication.start_time);
    }

    let step_secs = i64::from(medication.interval_hours) * 3600;
    let elapsed_secs = (now - medication.start_time).num_seconds();
    let k = elapsed_secs / step_secs;
    let mut candidate = medication.start_time + Duration::seconds(k * step_secs);
    // num_seconds truncates, so candidate may still trail now by a fraction
    while candidate < now {
        candidate += Duration::seconds(step_secs);
    }

    if candidate < end {
        Some(candidate)
    } else {
        None
    }
}

/// All doses strictly after `now` and strictly before the window end, in
/// chronological order. Empty for inactive medications.
pub fn remaining_doses(medication: &Medication, now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    if !medication.is_active {
        return Vec::new();
    }
    let end = window_end(medication);
    let step = Duration::hours(i64::from(medication.interval_hours));

    let mut next = medication.start_time;
    if now >= medication.start_time {
        let step_secs = i64::from(medication.interval_hours) * 3600;
        let k = (now - medication.start_time).num_seconds() / step_secs;
        next = medication.start_time + Duration::seconds(k * step_secs);
        // strictly after now: an occurrence equal to now is not remaining
        while next <= now {
            next += step;
        }
    }

    let mut doses = Vec::new();
    while next < end {
        doses.push(next);
        next += step;
    }
    doses
}

/// The full occurrence set from `start_time` forward, ignoring the current
/// time. This is what the reminder synchronizer submits wholesale; entries
/// already in the past are the scheduler's problem, not filtered here.
pub fn occurrences(medication: &Medication) -> Vec<DateTime<Utc>> {
    let end = window_end(medication);
    let step = Duration::hours(i64::from(medication.interval_hours));

    let mut doses = Vec::new();
    let mut next = medication.start_time;
    while next < end {
        doses.push(next);
        next += step;
    }
    doses
}

/// Whether treatment is underway at `now`: the active flag is set and `now`
/// lies strictly between `start_time` and the window end.
///
/// Both bounds are strict here, unlike dose generation which includes
/// `start_time` itself. The first dose exists at the exact start instant,
/// but the medication only counts as "currently active" once past it.
pub fn is_currently_active(medication: &Medication, now: DateTime<Utc>) -> bool {
    medication.is_active && now > medication.start_time && now < window_end(medication)
}
