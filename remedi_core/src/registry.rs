//! Medication registry: the single source of truth for the collection.
//!
//! Every mutation runs to completion in order — validate, apply in memory,
//! persist the full collection as one blob, reconcile reminders, notify
//! observers. Mutations take `&mut self`, so the borrow checker enforces
//! the single-writer discipline; reads observe a consistent snapshot.
//!
//! Persistence and scheduler failures surface to the caller AFTER the
//! in-memory change has been applied. This matches the system's historical
//! behavior: memory is updated first and no rollback is attempted, an
//! accepted eventual-consistency gap the caller resolves by retrying.

use crate::{dose, sync, Error, Medication, Result, Scheduler, Store};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Fixed key the collection blob is persisted under
pub const STORAGE_KEY: &str = "medications";

/// One upcoming dose, flattened across medications
#[derive(Clone, Debug)]
pub struct UpcomingDose {
    pub medication: Medication,
    pub dose_time: DateTime<Utc>,
    pub time_until: Duration,
}

/// Aggregate counts over the collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    /// Sum of remaining-dose counts over active medications
    pub remaining_doses: usize,
    /// Active medications whose window ends within the next 7 days
    /// (whole elapsed days, floor: 0 < days_until_end <= 7)
    pub ending_within_week: usize,
}

/// Change notification emitted after a mutation fully completes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryEvent {
    Added(Uuid),
    Updated(Uuid),
    Removed(Uuid),
    Toggled { id: Uuid, is_active: bool },
}

type Observer = Box<dyn Fn(&RegistryEvent)>;

/// In-memory medication collection wired to an injected store and
/// scheduler. Constructed explicitly at composition time; there is no
/// global instance.
pub struct MedicationRegistry<St: Store, Sc: Scheduler> {
    medications: Vec<Medication>,
    store: St,
    scheduler: Sc,
    observers: Vec<Observer>,
}

impl<St: Store, Sc: Scheduler> MedicationRegistry<St, Sc> {
    /// Load the persisted collection from the store.
    ///
    /// A missing blob means an empty collection. A corrupt blob is a
    /// recoverable condition: it is logged and treated as empty rather
    /// than failing startup.
    pub fn load(store: St, scheduler: Sc) -> Result<Self> {
        let medications = match store.get(STORAGE_KEY)? {
            None => Vec::new(),
            Some(blob) => match serde_json::from_str(&blob) {
                Ok(medications) => medications,
                Err(e) => {
                    tracing::warn!(
                        "Corrupt medication blob ({}). Starting with an empty collection.",
                        e
                    );
                    Vec::new()
                }
            },
        };

        tracing::debug!("Loaded {} medications", medications.len());
        Ok(Self {
            medications,
            store,
            scheduler,
            observers: Vec::new(),
        })
    }

    /// Register a change observer, invoked after each completed mutation
    pub fn subscribe(&mut self, observer: impl Fn(&RegistryEvent) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    pub fn active_medications(&self) -> Vec<&Medication> {
        self.medications.iter().filter(|m| m.is_active).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == id)
    }

    /// Add a medication: validate, append, persist, schedule reminders
    pub fn add(&mut self, medication: Medication) -> Result<()> {
        medication.validate()?;
        if self.get(medication.id).is_some() {
            return Err(Error::Validation(format!(
                "medication id {} already registered",
                medication.id
            )));
        }

        let id = medication.id;
        let index = self.medications.len();
        self.medications.push(medication);
        self.persist()?;
        sync::sync_reminders_for(&self.medications[index], &mut self.scheduler)?;

        tracing::info!("Added medication {} ({})", self.medications[index].name, id);
        self.notify(&RegistryEvent::Added(id));
        Ok(())
    }

    /// Replace a medication in place by id.
    ///
    /// Reminder reconciliation falls out of a single sync call: its
    /// cancel-by-tag step removes the old occurrences before the new ones
    /// are scheduled.
    pub fn update(&mut self, medication: Medication) -> Result<()> {
        medication.validate()?;
        let index = self
            .medications
            .iter()
            .position(|m| m.id == medication.id)
            .ok_or(Error::NotFound(medication.id))?;

        let id = medication.id;
        self.medications[index] = medication;
        self.persist()?;
        sync::sync_reminders_for(&self.medications[index], &mut self.scheduler)?;

        tracing::info!("Updated medication {} ({})", self.medications[index].name, id);
        self.notify(&RegistryEvent::Updated(id));
        Ok(())
    }

    /// Remove a medication and cancel its reminders.
    ///
    /// An unknown id is rejected before anything is touched, store
    /// included.
    pub fn remove(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or(Error::NotFound(id))?;

        let removed = self.medications.remove(index);
        self.persist()?;
        sync::cancel_reminders_for(&removed, &mut self.scheduler)?;

        tracing::info!("Removed medication {} ({})", removed.name, id);
        self.notify(&RegistryEvent::Removed(id));
        Ok(())
    }

    /// Flip a medication's active flag; returns the new state.
    ///
    /// The same sync call covers both directions: newly active schedules
    /// the window, newly inactive only cancels.
    pub fn toggle(&mut self, id: Uuid) -> Result<bool> {
        let index = self
            .medications
            .iter()
            .position(|m| m.id == id)
            .ok_or(Error::NotFound(id))?;

        self.medications[index].is_active = !self.medications[index].is_active;
        let is_active = self.medications[index].is_active;
        self.persist()?;
        sync::sync_reminders_for(&self.medications[index], &mut self.scheduler)?;

        tracing::info!(
            "Medication {} is now {}",
            self.medications[index].name,
            if is_active { "active" } else { "inactive" }
        );
        self.notify(&RegistryEvent::Toggled { id, is_active });
        Ok(is_active)
    }

    /// Hook for recording that a dose was taken.
    ///
    /// No history is kept yet; this validates the id and logs, so callers
    /// already have a stable entry point when an audit trail lands.
    pub fn mark_dose_taken(&mut self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let medication = self.get(id).ok_or(Error::NotFound(id))?;
        tracing::info!("Dose of {} taken at {}", medication.name, at);
        Ok(())
    }

    /// The next `limit` doses across all active medications, ascending by
    /// time. The sort is stable, so simultaneous doses keep the
    /// medications' insertion order.
    pub fn upcoming_doses(&self, now: DateTime<Utc>, limit: usize) -> Vec<UpcomingDose> {
        let mut upcoming = Vec::new();
        for medication in self.medications.iter().filter(|m| m.is_active) {
            for dose_time in dose::remaining_doses(medication, now) {
                upcoming.push(UpcomingDose {
                    medication: medication.clone(),
                    dose_time,
                    time_until: dose_time - now,
                });
            }
        }
        upcoming.sort_by_key(|u| u.dose_time);
        upcoming.truncate(limit);
        upcoming
    }

    pub fn statistics(&self, now: DateTime<Utc>) -> RegistryStats {
        let active: Vec<_> = self.medications.iter().filter(|m| m.is_active).collect();

        let remaining_doses = active
            .iter()
            .map(|m| dose::remaining_doses(m, now).len())
            .sum();

        let ending_within_week = active
            .iter()
            .filter(|m| {
                let days_until_end = (dose::window_end(m) - now).num_days();
                days_until_end > 0 && days_until_end <= 7
            })
            .count();

        RegistryStats {
            total: self.medications.len(),
            active: active.len(),
            remaining_doses,
            ending_within_week,
        }
    }

    /// Wipe the scheduler and rebuild reminders for every active
    /// medication (restart or timezone-change recovery)
    pub fn resync_reminders(&mut self) -> Result<()> {
        sync::reschedule_all(&self.medications, &mut self.scheduler)
    }

    fn persist(&mut self) -> Result<()> {
        let blob = serde_json::to_string(&self.medications)?;
        self.store.set(STORAGE_KEY, &blob)
    }

    fn notify(&self, event: &RegistryEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }
}
