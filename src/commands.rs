use crate::cli::{AssignArgs, Cli, Commands, DayArgs, EnqueueArgs, SlotArgs};
use crate::database;
use crate::error::AppError;
use crate::models::{AppSettings, Conflict, ScheduledAssignment};
use crate::services::{
    assignment_service, background_sync, schedule_service, settings_service, upload_service,
};
use photo_queue::{ConnectivityMonitor, DrainOutcome, GeoPoint};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let settings_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(settings_service::DEFAULT_SETTINGS_PATH));
    let settings = || settings_service::load_settings(&settings_path);

    match cli.command {
        Commands::InitConfig => init_config(&settings_path),
        Commands::Enqueue(args) => enqueue(&settings()?, args),
        Commands::Status => status(&settings()?),
        Commands::Drain => drain(&settings()?).await,
        Commands::Watch => watch(&settings()?).await,
        Commands::Clear => {
            let removed = upload_service::open_queue(&settings()?)?.clear()?;
            println!("Removed {} queued photo(s)", removed);
            Ok(())
        }
        Commands::Assign(args) => assign(&settings()?, args),
        Commands::Assignments(args) => list_assignments(&settings()?, args),
        Commands::Conflicts(args) => conflicts(&settings()?, args),
        Commands::Unassign { id } => {
            let conn = database::init_database(&settings()?)?;
            assignment_service::delete_assignment(&conn, &id)?;
            println!("Removed assignment {}", id);
            Ok(())
        }
    }
}

fn init_config(path: &Path) -> Result<(), AppError> {
    if path.exists() {
        return Err(AppError::Validation(format!(
            "{} already exists",
            path.display()
        )));
    }
    settings_service::save_settings(path, &AppSettings::default())?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}

fn enqueue(settings: &AppSettings, args: EnqueueArgs) -> Result<(), AppError> {
    database::init_database(settings)?;
    let queue = upload_service::open_queue(settings)?;

    let request = upload_service::CaptureRequest {
        project_id: args.project,
        organization_id: args.organization,
        uploaded_by: args.user,
        caption: args.caption,
        notes: args.notes,
        is_before: args.before,
        is_after: args.after,
        room_type: args.room_type,
        location: match (args.lat, args.lon) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint {
                latitude,
                longitude,
            }),
            _ => None,
        },
    };

    let id = upload_service::enqueue_file(&queue, &args.file, &request)?;
    println!("Queued {} ({} photo(s) waiting)", id, queue.count()?);
    Ok(())
}

fn status(settings: &AppSettings) -> Result<(), AppError> {
    let queue = upload_service::open_queue(settings)?;
    let snapshot = queue.list_queued()?;

    if snapshot.unreadable() > 0 {
        println!(
            "{} queued photo(s) are unreadable and cannot be uploaded",
            snapshot.unreadable()
        );
    }
    if snapshot.is_empty() {
        println!("No photos queued");
        return Ok(());
    }

    println!("{} photo(s) queued:", snapshot.len());
    for upload in snapshot.iter() {
        let upload = upload?;
        println!(
            "  {}  {}  {} bytes  project {}  queued {}",
            upload.id,
            upload.file_name,
            upload.file_size,
            upload.project_id,
            upload.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn drain(settings: &AppSettings) -> Result<(), AppError> {
    let queue = upload_service::open_queue(settings)?;
    let monitor = ConnectivityMonitor::new(false);

    let online = match settings.probe_url() {
        Some(url) => {
            let client = background_sync::probe_client(settings)?;
            background_sync::probe_once(&client, url).await
        }
        None => true,
    };
    monitor.set_online(online);

    if !online {
        println!("Offline: {} photo(s) remain queued", queue.count()?);
        return Ok(());
    }

    let session = upload_service::build_session(settings, queue, monitor)?;
    match session.drain().await? {
        DrainOutcome::Completed(summary) => println!("{}", summary.message()),
        DrainOutcome::AlreadyRunning => println!("An upload is already in progress"),
    }
    Ok(())
}

async fn watch(settings: &AppSettings) -> Result<(), AppError> {
    let queue = upload_service::open_queue(settings)?;
    let session = upload_service::build_session(settings, queue, ConnectivityMonitor::new(false))?
        .with_notifier(|summary| println!("{}", summary.message()));
    let session = Arc::new(session);

    let _transitions = session.connectivity().observe_connectivity(|online| {
        if online {
            println!("Online, uploading queued photos");
        } else {
            println!("Offline, new photos stay queued");
        }
    });

    let sync = background_sync::start_background_sync(session, settings)?;
    log::info!("Watching connectivity, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    sync.stop();
    Ok(())
}

fn print_conflicts(conflicts: &[Conflict]) {
    for conflict in conflicts {
        println!("  overlaps {} ({})", conflict.job_label, conflict.time_range);
    }
}

fn assign(settings: &AppSettings, args: AssignArgs) -> Result<(), AppError> {
    let conn = database::init_database(settings)?;
    let SlotArgs { day, start, end } = args.slot;

    let candidate = schedule_service::parse_slot(&start, &end)?;
    let conflicts =
        assignment_service::check_assignment_conflicts(&conn, &day.crew, day.date, &candidate)?;

    if !conflicts.is_empty() {
        print_conflicts(&conflicts);
        if !args.force {
            return Err(AppError::Validation(format!(
                "{} is already booked {} time(s) in that slot; use --force to book anyway",
                day.crew,
                conflicts.len()
            )));
        }
        log::warn!("Booking {} despite {} conflict(s)", day.crew, conflicts.len());
    }

    let mut assignment = ScheduledAssignment::new(day.crew, args.job, day.date, start, end);
    assignment.notes = args.notes;
    let id = assignment_service::add_assignment(&conn, &assignment)?;
    println!("Booked {}", id);
    Ok(())
}

fn list_assignments(settings: &AppSettings, args: DayArgs) -> Result<(), AppError> {
    let conn = database::init_database(settings)?;
    let assignments = assignment_service::list_assignments(&conn, &args.crew, args.date)?;

    if assignments.is_empty() {
        println!("{} has no bookings on {}", args.crew, args.date);
        return Ok(());
    }

    for a in assignments {
        println!(
            "  {} - {}  {}  ({})",
            a.start_time, a.end_time, a.job_label, a.uuid
        );
    }
    Ok(())
}

fn conflicts(settings: &AppSettings, args: SlotArgs) -> Result<(), AppError> {
    let conn = database::init_database(settings)?;
    let candidate = schedule_service::parse_slot(&args.start, &args.end)?;
    let conflicts = assignment_service::check_assignment_conflicts(
        &conn,
        &args.day.crew,
        args.day.date,
        &candidate,
    )?;

    if conflicts.is_empty() {
        println!(
            "{} is free {} on {}",
            args.day.crew,
            schedule_service::format_slot(&candidate),
            args.day.date
        );
    } else {
        println!("{} conflict(s):", conflicts.len());
        print_conflicts(&conflicts);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("restoration-ops-{}", uuid::Uuid::new_v4()))
    }

    fn cli(config: &Path, args: &[&str]) -> Cli {
        let config = config.to_str().unwrap();
        let mut argv = vec!["restoration-ops", "--config", config];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[tokio::test]
    async fn test_init_config_writes_defaults_once() {
        let dir = temp_dir();
        let path = dir.join("settings.toml");

        run(cli(&path, &["init-config"])).await.unwrap();
        assert_eq!(
            settings_service::load_settings(&path).unwrap(),
            AppSettings::default()
        );

        let again = run(cli(&path, &["init-config"])).await;
        assert!(matches!(again, Err(AppError::Validation(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_assign_refuses_overlap_unless_forced() {
        let dir = temp_dir();
        let path = dir.join("settings.toml");
        let mut settings = AppSettings::default();
        settings.database_path = dir.join("ops.db").to_string_lossy().into_owned();
        settings_service::save_settings(&path, &settings).unwrap();

        let booking = |start: &'static str, end: &'static str| {
            vec![
                "assign", "--crew", "sam", "--date", "2026-04-14", "--start", start, "--end",
                end, "--job", "Dry-out",
            ]
        };

        run(cli(&path, &booking("09:00", "10:00"))).await.unwrap();

        let overlap = run(cli(&path, &booking("09:30", "10:30"))).await;
        assert!(matches!(overlap, Err(AppError::Validation(_))));

        let mut forced = booking("09:30", "10:30");
        forced.push("--force");
        run(cli(&path, &forced)).await.unwrap();

        let conn = database::init_database(&settings).unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2026, 4, 14).unwrap();
        assert_eq!(
            assignment_service::list_assignments(&conn, "sam", date)
                .unwrap()
                .len(),
            2
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
