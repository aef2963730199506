use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use remedi_core::*;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "remedi")]
#[command(about = "Medication dose scheduling and reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new medication
    Add {
        /// Display name, e.g. "Amoxicillin"
        name: String,

        /// Dosage description, e.g. "500mg"
        dosage: String,

        /// First dose, RFC 3339 or "YYYY-MM-DD HH:MM" (UTC)
        start: String,

        /// Hours between doses
        #[arg(long)]
        interval_hours: u32,

        /// Treatment duration in days
        #[arg(long)]
        days: u32,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List all registered medications
    List,

    /// Edit fields of an existing medication
    Update {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dosage: Option<String>,

        /// New first-dose time, RFC 3339 or "YYYY-MM-DD HH:MM" (UTC)
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        interval_hours: Option<u32>,

        #[arg(long)]
        days: Option<u32>,

        #[arg(long)]
        notes: Option<String>,

        /// Explicitly set the active flag
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a medication and cancel its reminders
    Remove { id: Uuid },

    /// Flip a medication between active and inactive
    Toggle { id: Uuid },

    /// Record that a dose was taken
    Taken { id: Uuid },

    /// Show the next doses across all active medications
    Upcoming {
        /// Maximum number of rows
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show collection statistics
    Stats,

    /// Cancel and rebuild every reminder (recovery after restore or
    /// timezone change)
    Resync,
}

fn main() -> Result<()> {
    remedi_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    let store = FileStore::new(&data_dir);
    let scheduler = FileScheduler::new(data_dir.join("reminders.json"));
    let mut registry = MedicationRegistry::load(store, scheduler)?;

    match cli.command {
        Commands::Add {
            name,
            dosage,
            start,
            interval_hours,
            days,
            notes,
        } => {
            let start_time = parse_start_time(&start)?;
            let medication =
                Medication::new(name, dosage, start_time, interval_hours, days, notes)?;
            let id = medication.id;
            registry.add(medication)?;
            println!("✓ Added medication {}", id);
        }

        Commands::List => {
            if registry.medications().is_empty() {
                println!("No medications registered.");
                return Ok(());
            }
            let now = Utc::now();
            for medication in registry.medications() {
                display_medication(medication, now);
            }
        }

        Commands::Update {
            id,
            name,
            dosage,
            start,
            interval_hours,
            days,
            notes,
            active,
        } => {
            let mut medication = registry
                .get(id)
                .cloned()
                .ok_or(Error::NotFound(id))?;

            if let Some(name) = name {
                medication.name = name;
            }
            if let Some(dosage) = dosage {
                medication.dosage = dosage;
            }
            if let Some(start) = start {
                medication.start_time = parse_start_time(&start)?;
            }
            if let Some(interval_hours) = interval_hours {
                medication.interval_hours = interval_hours;
            }
            if let Some(days) = days {
                medication.total_days = days;
            }
            if let Some(notes) = notes {
                medication.notes = Some(notes);
            }
            if let Some(active) = active {
                medication.is_active = active;
            }

            registry.update(medication)?;
            println!("✓ Updated medication {}", id);
        }

        Commands::Remove { id } => {
            registry.remove(id)?;
            println!("✓ Removed medication {}", id);
        }

        Commands::Toggle { id } => {
            let is_active = registry.toggle(id)?;
            println!(
                "✓ Medication {} is now {}",
                id,
                if is_active { "active" } else { "inactive" }
            );
        }

        Commands::Taken { id } => {
            registry.mark_dose_taken(id, Utc::now())?;
            println!("✓ Dose recorded");
        }

        Commands::Upcoming { limit } => {
            let limit = limit.unwrap_or(config.display.upcoming_limit);
            let now = Utc::now();
            let upcoming = registry.upcoming_doses(now, limit);

            if upcoming.is_empty() {
                println!("No upcoming doses.");
                return Ok(());
            }

            println!("╭─────────────────────────────────────────╮");
            println!("│  UPCOMING DOSES");
            println!("╰─────────────────────────────────────────╯");
            for dose in upcoming {
                println!(
                    "  {}  {} ({}) — {}",
                    dose.dose_time.format("%Y-%m-%d %H:%M"),
                    dose.medication.name,
                    dose.medication.dosage,
                    format_time_until(dose.time_until)
                );
            }
        }

        Commands::Stats => {
            let stats = registry.statistics(Utc::now());
            println!("Medications:        {}", stats.total);
            println!("Active:             {}", stats.active);
            println!("Remaining doses:    {}", stats.remaining_doses);
            println!("Ending this week:   {}", stats.ending_within_week);
        }

        Commands::Resync => {
            registry.resync_reminders()?;
            println!("✓ Reminders rebuilt for all active medications");
        }
    }

    Ok(())
}

fn display_medication(medication: &Medication, now: DateTime<Utc>) {
    let status = if medication.is_active {
        "active"
    } else {
        "inactive"
    };
    println!("{}", medication.id);
    println!("  {} ({}) [{}]", medication.name, medication.dosage, status);
    println!(
        "  every {}h for {} days from {}",
        medication.interval_hours,
        medication.total_days,
        medication.start_time.format("%Y-%m-%d %H:%M")
    );
    match dose::next_dose(medication, now) {
        Some(next) => println!("  next dose: {}", next.format("%Y-%m-%d %H:%M")),
        None => println!("  next dose: none"),
    }
    if let Some(ref notes) = medication.notes {
        println!("  notes: {}", notes);
    }
    println!();
}

fn parse_start_time(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(naive.and_utc());
    }
    Err(Error::Validation(format!(
        "unrecognized start time {:?} (use RFC 3339 or \"YYYY-MM-DD HH:MM\")",
        input
    )))
}

fn format_time_until(until: Duration) -> String {
    let minutes = until.num_minutes();
    if minutes < 60 {
        return format!("in {}m", minutes.max(0));
    }
    let hours = until.num_hours();
    if hours < 24 {
        return format!("in {}h {}m", hours, minutes - hours * 60);
    }
    let days = until.num_days();
    format!("in {}d {}h", days, hours - days * 24)
}
