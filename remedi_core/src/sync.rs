//! Reminder synchronizer.
//!
//! Reconciles a medication's dose occurrences with the external scheduler:
//! cancel whatever is pending under the medication's payload tag, then
//! resubmit the current occurrence set. Because cancellation always runs
//! first and keys off the tag, the same routine covers create, edit,
//! deactivate, and full resync without special cases.

use crate::{dose, Medication, Result, ReminderRequest, Scheduler};
use uuid::Uuid;

/// Payload tag identifying a medication's reminders in the pending list
pub fn payload_tag(medication: &Medication) -> String {
    format!("medication:{}", medication.id)
}

/// Deterministic reminder id for one occurrence.
///
/// 32-bit FNV-1a over the medication id's 16 raw bytes followed by the
/// occurrence index as 4 little-endian bytes. Stable across restarts, and
/// in practice collision-free for the handful of medications a user
/// tracks; collisions only risk one reminder replacing another.
pub fn reminder_id(medication_id: &Uuid, index: usize) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 16_777_619;

    let mut hash = FNV_OFFSET;
    for byte in medication_id.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    for byte in (index as u32).to_le_bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Cancel every pending reminder carrying this medication's payload tag
pub fn cancel_reminders_for(
    medication: &Medication,
    scheduler: &mut impl Scheduler,
) -> Result<()> {
    let tag = payload_tag(medication);
    let mut cancelled = 0usize;
    for pending in scheduler.list_pending()? {
        if pending.payload == tag {
            scheduler.cancel(pending.id)?;
            cancelled += 1;
        }
    }
    if cancelled > 0 {
        tracing::debug!("Cancelled {} reminders for {}", cancelled, medication.name);
    }
    Ok(())
}

/// Bring the scheduler in line with one medication.
///
/// Stale reminders are cancelled unconditionally, deactivation included.
/// For an active medication the ENTIRE occurrence window is then
/// resubmitted, past occurrences and all; the scheduler is expected to
/// ignore or immediately fire past-due entries. Scheduler failures
/// propagate to the caller.
pub fn sync_reminders_for(
    medication: &Medication,
    scheduler: &mut impl Scheduler,
) -> Result<()> {
    cancel_reminders_for(medication, scheduler)?;

    if !medication.is_active {
        return Ok(());
    }

    let tag = payload_tag(medication);
    let occurrences = dose::occurrences(medication);
    for (index, at) in occurrences.iter().enumerate() {
        scheduler.schedule(ReminderRequest {
            id: reminder_id(&medication.id, index),
            title: format!("Time for {}", medication.name),
            body: format!("Take {} of {}", medication.dosage, medication.name),
            at: *at,
            payload: tag.clone(),
        })?;
    }

    tracing::info!(
        "Scheduled {} reminders for {}",
        occurrences.len(),
        medication.name
    );
    Ok(())
}

/// Clear every reminder regardless of tag (bulk reset flows)
pub fn cancel_all_reminders(scheduler: &mut impl Scheduler) -> Result<()> {
    scheduler.cancel_all()?;
    tracing::info!("Cancelled all pending reminders");
    Ok(())
}

/// Full-state recovery: wipe the scheduler, then re-sync each active
/// medication in collection order. Used after restarts or timezone moves.
pub fn reschedule_all(
    medications: &[Medication],
    scheduler: &mut impl Scheduler,
) -> Result<()> {
    scheduler.cancel_all()?;
    for medication in medications.iter().filter(|m| m.is_active) {
        sync_reminders_for(medication, scheduler)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryScheduler;
    use chrono::{TimeZone, Utc};

    fn med(name: &str) -> Medication {
        Medication::new(
            name,
            "500mg",
            Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            8,
            1,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_reminder_id_matches_fnv1a_reference() {
        // Reference values computed independently from the FNV-1a definition
        let nil = Uuid::nil();
        assert_eq!(reminder_id(&nil, 0), 3_120_489_557);
        assert_eq!(reminder_id(&nil, 1), 1_775_412_548);

        let id = Uuid::parse_str("6f1c1f3a-2b4d-4e5f-8a9b-0c1d2e3f4a5b").unwrap();
        assert_eq!(reminder_id(&id, 0), 1_152_954_044);
        assert_eq!(reminder_id(&id, 3), 893_217_775);
    }

    #[test]
    fn test_reminder_ids_distinct_across_indices() {
        let id = Uuid::new_v4();
        let mut seen = std::collections::HashSet::new();
        for index in 0..200 {
            assert!(seen.insert(reminder_id(&id, index)));
        }
    }

    #[test]
    fn test_sync_schedules_full_window_including_past() {
        // 2 occurrences (08:00, 16:00); both submitted even though the
        // window has long elapsed
        let medication = med("Amoxicillin");
        let mut scheduler = MemoryScheduler::new();

        sync_reminders_for(&medication, &mut scheduler).unwrap();

        let pending = scheduler.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].payload, payload_tag(&medication));
        assert_eq!(pending[0].id, reminder_id(&medication.id, 0));
        assert!(pending[0].body.contains("500mg"));
        assert!(pending[0].title.contains("Amoxicillin"));
    }

    #[test]
    fn test_sync_is_idempotent() {
        let medication = med("Amoxicillin");
        let mut scheduler = MemoryScheduler::new();

        sync_reminders_for(&medication, &mut scheduler).unwrap();
        let first: Vec<_> = scheduler.pending().to_vec();

        sync_reminders_for(&medication, &mut scheduler).unwrap();
        assert_eq!(scheduler.pending(), first.as_slice());
    }

    #[test]
    fn test_sync_inactive_cancels_and_schedules_nothing() {
        let mut medication = med("Amoxicillin");
        let mut scheduler = MemoryScheduler::new();
        sync_reminders_for(&medication, &mut scheduler).unwrap();
        assert!(!scheduler.pending().is_empty());

        medication.is_active = false;
        sync_reminders_for(&medication, &mut scheduler).unwrap();
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_sync_leaves_other_medications_untouched() {
        let first = med("Amoxicillin");
        let second = med("Ibuprofen");
        let mut scheduler = MemoryScheduler::new();

        sync_reminders_for(&first, &mut scheduler).unwrap();
        sync_reminders_for(&second, &mut scheduler).unwrap();

        let mut deactivated = first.clone();
        deactivated.is_active = false;
        sync_reminders_for(&deactivated, &mut scheduler).unwrap();

        let remaining: Vec<_> = scheduler.pending().to_vec();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.payload == payload_tag(&second)));
    }

    #[test]
    fn test_reschedule_all_skips_inactive() {
        let active = med("Amoxicillin");
        let mut inactive = med("Ibuprofen");
        inactive.is_active = false;

        let mut scheduler = MemoryScheduler::new();
        // A stray reminder from an earlier run gets wiped by the reset
        scheduler
            .schedule(ReminderRequest {
                id: 999,
                title: "stale".into(),
                body: "stale".into(),
                at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                payload: "medication:stale".into(),
            })
            .unwrap();

        reschedule_all(&[active.clone(), inactive], &mut scheduler).unwrap();

        let pending = scheduler.pending();
        assert_eq!(pending.len(), 2);
        assert!(pending.iter().all(|r| r.payload == payload_tag(&active)));
    }
}
