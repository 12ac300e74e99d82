//! Insulator command line
//!
//! Usage:
//!   insulator calc <current_bg> <carbs>   - Calculate a dose
//!   insulator latest <carbs>              - Use the newest stored reading
//!   insulator add <mg_dl> [epoch]         - Record a reading
//!   insulator --help                      - Show help
//!   INSULATOR_DBG=1 insulator calc 8 40   - Enable debug output

use std::env;

use log::{info, warn};

use insulator::config::{config_file_path, default_database_path, ensure_data_dir, get_data_dir};
use insulator::health::fetch_latest_blocking;
use insulator::session::{parse_field, DoseSession};
use insulator::storage::{GlucoseSample, Storage};
use insulator::{InsulatorError, Preferences};

fn main() -> Result<(), InsulatorError> {
    let args: Vec<String> = env::args().collect();

    let debug_mode = env::var("INSULATOR_DBG").is_ok();

    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Preferences::create_default(&cfg_path) {
            warn!("Could not create default preferences: {}", e);
        }
    }

    // Data directory first, then current directory
    let preferences = match Preferences::load(&cfg_path) {
        Ok(prefs) => prefs,
        Err(InsulatorError::Io(_)) => Preferences::load("insulator.txt").unwrap_or_else(|e| {
            warn!("Could not load preferences: {}. Using defaults.", e);
            Preferences::default()
        }),
        Err(e) => return Err(e),
    };

    let db_path = preferences
        .database_path
        .clone()
        .unwrap_or_else(|| default_database_path().to_string_lossy().to_string());

    let json = args.iter().any(|a| a == "--json");
    let positional: Vec<&str> = args
        .iter()
        .skip(1)
        .map(|s| s.as_str())
        .filter(|s| *s != "--json")
        .collect();

    match positional.first().copied() {
        Some("calc") => {
            let current = positional.get(1).copied().unwrap_or("");
            let carbs = positional.get(2).copied().unwrap_or("");
            cmd_calc(preferences, current, carbs, json)?;
        }
        Some("latest") => {
            let carbs = positional.get(1).copied().unwrap_or("");
            cmd_latest(preferences, &db_path, carbs, json)?;
        }
        Some("add") => {
            cmd_add(&db_path, positional.get(1).copied(), positional.get(2).copied())?;
        }
        Some("prefs") => {
            println!("{}", serde_json::to_string_pretty(&preferences)?);
        }
        Some("init") => {
            Preferences::create_default(&cfg_path)?;
            eprintln!("Wrote default preferences to {}", cfg_path.display());
        }
        Some("path") | Some("paths") => {
            cmd_show_paths(&db_path);
        }
        Some("--version") | Some("-V") => {
            println!("insulator {}", env!("CARGO_PKG_VERSION"));
        }
        _ => {
            print_help();
        }
    }

    Ok(())
}

/// Calculate from typed-in values
fn cmd_calc(
    preferences: Preferences,
    current: &str,
    carbs: &str,
    json: bool,
) -> Result<(), InsulatorError> {
    let mut session = DoseSession::new(preferences);
    session.set_current_blood_glucose(current)?;
    session.set_carbohydrates_in_meal(carbs)?;
    report(&session, json)
}

/// Calculate using the newest stored reading as the current level
fn cmd_latest(
    preferences: Preferences,
    db_path: &str,
    carbs: &str,
    json: bool,
) -> Result<(), InsulatorError> {
    let unit = preferences.blood_glucose_unit;
    let mut session = DoseSession::new(preferences);
    session.set_carbohydrates_in_meal(carbs)?;

    let sample = fetch_latest_blocking(db_path)?;
    match &sample {
        Some(sample) => eprintln!(
            "Latest reading: {} at {} UTC",
            unit.format(sample.value_in(unit)),
            sample.timestamp
        ),
        None => eprintln!("No stored reading found, current level left unset"),
    }
    session.apply_sample(sample.map(|s| s.value_in(unit)))?;

    report(&session, json)
}

/// Record a mg/dL reading
fn cmd_add(db_path: &str, mg_dl: Option<&str>, epoch: Option<&str>) -> Result<(), InsulatorError> {
    let mg_dl = parse_field("mg/dL reading", mg_dl.unwrap_or(""))?;
    if mg_dl == 0.0 {
        return Err(InsulatorError::InvalidInput("a mg/dL reading is required".to_string()));
    }
    let epoch = match epoch {
        Some(e) => e.parse::<i64>().map_err(|_| {
            InsulatorError::InvalidInput(format!("epoch: '{}' is not an integer", e))
        })?,
        None => chrono::Utc::now().timestamp(),
    };
    let sample = GlucoseSample::from_mg_dl(epoch, mg_dl)?;

    let storage = Storage::new(db_path)?;
    match storage.insert_sample(&sample)? {
        Some(id) => info!("Stored reading #{} ({} mg/dL at {})", id, mg_dl, sample.timestamp),
        None => eprintln!("A reading at {} already exists (skipped)", sample.timestamp),
    }
    eprintln!("Readings in database: {}", storage.count()?);
    Ok(())
}

fn report(session: &DoseSession, json: bool) -> Result<(), InsulatorError> {
    let result = session.result().rounded();
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if session.preferences().is_unconfigured() {
        eprintln!(
            "Warning: factors are not configured, edit {}",
            config_file_path().display()
        );
    }
    println!("{}", result);
    Ok(())
}

/// Show data paths
fn cmd_show_paths(db_path: &str) {
    println!("Insulator Data Paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Preferences:     {}", config_file_path().display());
    println!("  Database:        {}", db_path);
}

fn print_help() {
    eprintln!("Insulator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  insulator calc <current_bg> <carbs> [--json]  Calculate a dose");
    eprintln!("  insulator latest <carbs> [--json]             Use the newest stored reading");
    eprintln!("  insulator add <mg_dl> [epoch]                 Record a reading");
    eprintln!("  insulator prefs                               Show loaded preferences");
    eprintln!("  insulator init                                Reset preferences file");
    eprintln!("  insulator path                                Show data file locations");
    eprintln!("  insulator help                                Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  INSULATOR_DBG=1              Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Preferences: {}", config_file_path().display());
    eprintln!("  Database:    {}", default_database_path().display());
}
