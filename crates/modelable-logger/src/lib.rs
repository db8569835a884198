use colored::Colorize;
use modelable_config::LoggingSettings;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

static LOG_FILE: Mutex<Option<PathBuf>> = Mutex::new(None);
static VERBOSITY: Mutex<u8> = Mutex::new(0);
static NO_STDOUT: Mutex<bool> = Mutex::new(false);
static CURRENT_MANIFEST: Mutex<Option<String>> = Mutex::new(None);

/// Get the current verbosity level
pub fn get_verbosity() -> u8 {
    VERBOSITY.lock().ok().map(|v| *v).unwrap_or(0)
}

/// Get whether console output is disabled
pub fn get_no_stdout() -> bool {
    NO_STDOUT.lock().ok().map(|v| *v).unwrap_or(false)
}

/// Set whether console output is disabled
pub fn set_no_stdout(disabled: bool) {
    if let Ok(mut v) = NO_STDOUT.lock() {
        *v = disabled;
    }
}

/// Get the plugin manifest currently being applied
pub fn get_current_manifest() -> Option<String> {
    CURRENT_MANIFEST.lock().ok().and_then(|guard| guard.clone())
}

/// Set the plugin manifest currently being applied
pub fn set_current_manifest(manifest_name: Option<String>) {
    if let Ok(mut v) = CURRENT_MANIFEST.lock() {
        *v = manifest_name;
    }
}

/// Convert verbosity level to a `tracing`-style level name
/// 0 = warn only, 1 = debug (-v), 2 = trace (-vv)
pub fn verbosity_to_level() -> &'static str {
    match get_verbosity() {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

fn set_verbosity(verbosity: u8) {
    if let Ok(mut v) = VERBOSITY.lock() {
        *v = verbosity;
    }
}

/// Initialize the logger with the default log file and a verbosity level
pub fn init_with_verbosity(verbosity: u8, no_stdout: bool) -> Result<(), String> {
    let log_file = get_config_dir()?.join("modelable.log");
    init_with_log_file(verbosity, no_stdout, &log_file)
}

/// Initialize the logger from the `[logging]` settings section
pub fn init_from_settings(settings: &LoggingSettings) -> Result<(), String> {
    match &settings.log_file {
        Some(log_file) => init_with_log_file(settings.verbosity, settings.no_stdout, log_file),
        None => init_with_verbosity(settings.verbosity, settings.no_stdout),
    }
}

/// Initialize the logger writing to an explicit log file
pub fn init_with_log_file(verbosity: u8, no_stdout: bool, log_file: &Path) -> Result<(), String> {
    set_verbosity(verbosity);
    set_no_stdout(no_stdout);

    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create log directory: {}", e))?;
    }

    // Truncate log file on each run
    if log_file.exists() {
        let _ = fs::remove_file(log_file);
    }

    let mut log_file_guard = LOG_FILE
        .lock()
        .map_err(|_| "Logger state is poisoned".to_string())?;
    *log_file_guard = Some(log_file.to_path_buf());
    drop(log_file_guard);

    init_tracing();
    Ok(())
}

/// Route `tracing` events from the library crates to stderr
///
/// `RUST_LOG` overrides the level derived from the verbosity. Only the first
/// call installs a subscriber.
pub fn init_tracing() {
    if get_no_stdout() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity_to_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Get the config directory path
fn get_config_dir() -> Result<PathBuf, String> {
    #[cfg(not(target_os = "windows"))]
    let config_dir = dirs::home_dir()
        .ok_or("Could not determine home directory")?
        .join(".config")
        .join("modelable");

    #[cfg(target_os = "windows")]
    let config_dir = dirs::config_dir()
        .ok_or("Could not determine config directory")?
        .join("modelable");

    Ok(config_dir)
}

fn write_to_log(level: &str, message: &str) {
    if let Ok(log_file_guard) = LOG_FILE.lock() {
        if let Some(ref log_path) = *log_file_guard {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
                let scope = get_current_manifest().unwrap_or_else(|| "registry".to_string());
                let _ = writeln!(file, "[{}] [{}] {} {}", timestamp, scope, level, message);
            }
        }
    }
}

fn console(line: String) {
    if !get_no_stdout() {
        eprintln!("{}", line);
    }
}

/// Log an informational message (to console if verbose >= 1, always to file)
pub fn info(message: &str) {
    write_to_log("INFO", message);
    if get_verbosity() >= 1 {
        console(message.to_string());
    }
}

/// Log a debug message (to console if verbose >= 1, always to file)
pub fn debug(message: &str) {
    write_to_log("DEBUG", message);
    if get_verbosity() >= 1 {
        console(format!("{} {}", "DEBUG:".blue().bold(), message));
    }
}

/// Log a warning message (to both file and console)
pub fn warn(message: &str) {
    write_to_log("WARN", message);
    console(format!("{} {}", "warning:".yellow().bold(), message));
}

/// Log an error message (to both file and console)
pub fn error(message: &str) {
    write_to_log("ERROR", message);
    console(format!("{} {}", "Error:".red().bold(), message));
}

/// Log a success message
pub fn success(message: &str) {
    write_to_log("SUCCESS", message);
    console(format!("{} {}", "\u{2714}".green().bold(), message));
}

/// Log a single registration step (console only at trace verbosity)
pub fn step(message: &str) {
    if get_verbosity() >= 2 {
        console(format!("TRACE: {}", message));
    }
    write_to_log("STEP", message);
}

/// Get the log file path for display
pub fn get_log_path() -> Option<PathBuf> {
    LOG_FILE.lock().ok().and_then(|guard| guard.clone())
}

/// Print the log file path to the user
pub fn show_log_path() {
    if let Some(path) = get_log_path() {
        eprintln!("Log file: {}", path.display());
    } else if let Ok(config_dir) = get_config_dir() {
        eprintln!("Log file: {}", config_dir.join("modelable.log").display());
    } else {
        eprintln!("Log file location not available");
    }
}
