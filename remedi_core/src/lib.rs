#![forbid(unsafe_code)]

//! Core domain model and business logic for the Remedi medication
//! reminder system.
//!
//! This crate provides:
//! - Domain types (medications and their dosing schedules)
//! - The dose occurrence calculator
//! - Reminder synchronization against an injected scheduler
//! - The medication registry with injected blob persistence
//!
//! Storage and notification delivery are ports ([`Store`], [`Scheduler`]);
//! file-backed implementations are included, platform embedders supply
//! their own.

pub mod config;
pub mod dose;
pub mod error;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use registry::{MedicationRegistry, RegistryEvent, RegistryStats, UpcomingDose, STORAGE_KEY};
pub use scheduler::{FileScheduler, MemoryScheduler, PendingReminder, ReminderRequest, Scheduler};
pub use store::{FileStore, MemoryStore, Store};
pub use sync::{cancel_all_reminders, payload_tag, reminder_id, reschedule_all, sync_reminders_for};
pub use types::Medication;
