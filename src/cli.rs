use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "restoration-ops")]
#[command(about = "Field agent for job-site photo uploads and crew scheduling", long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Write a settings file with default values
    InitConfig,
    /// Queue a photo for upload
    Enqueue(EnqueueArgs),
    /// Show queued uploads
    Status,
    /// Upload everything queued right now
    Drain,
    /// Probe connectivity and drain whenever the device comes online
    Watch,
    /// Drop all queued uploads without sending them
    Clear,
    /// Book a crew member for a job
    Assign(AssignArgs),
    /// List a crew member's bookings for a day
    Assignments(DayArgs),
    /// Check a time slot against a crew member's bookings
    Conflicts(SlotArgs),
    /// Remove a booking
    Unassign {
        id: Uuid,
    },
}

#[derive(Debug, Args)]
pub struct EnqueueArgs {
    pub file: PathBuf,
    #[arg(long)]
    pub project: Uuid,
    #[arg(long)]
    pub organization: Uuid,
    #[arg(long)]
    pub user: Uuid,
    #[arg(long)]
    pub caption: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
    #[arg(long, conflicts_with = "after")]
    pub before: bool,
    #[arg(long)]
    pub after: bool,
    #[arg(long)]
    pub room_type: Option<String>,
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lon: Option<f64>,
}

#[derive(Debug, Args)]
pub struct DayArgs {
    #[arg(long)]
    pub crew: String,
    /// YYYY-MM-DD
    #[arg(long)]
    pub date: chrono::NaiveDate,
}

#[derive(Debug, Args)]
pub struct SlotArgs {
    #[command(flatten)]
    pub day: DayArgs,
    /// HH:MM
    #[arg(long)]
    pub start: String,
    /// HH:MM
    #[arg(long)]
    pub end: String,
}

#[derive(Debug, Args)]
pub struct AssignArgs {
    #[command(flatten)]
    pub slot: SlotArgs,
    #[arg(long)]
    pub job: String,
    #[arg(long)]
    pub notes: Option<String>,
    /// Book even if the slot overlaps existing bookings
    #[arg(long)]
    pub force: bool,
}
