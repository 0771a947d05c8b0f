use std::io::{self, Write};
use std::path::Path;

use crate::app::AppError;
use crate::config::{self, Config};
use crate::storage::SqliteStorage;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD_CYAN: &str = "\x1b[1;36m";
const ANSI_BOLD_GREEN: &str = "\x1b[1;32m";
const ANSI_BOLD_MAGENTA: &str = "\x1b[1;35m";
const ANSI_BOLD_YELLOW: &str = "\x1b[1;33m";
const ANSI_DIM: &str = "\x1b[2m";

pub(crate) fn init_all(store_root: &Path) -> Result<(), AppError> {
    print_banner("TACKED DOWN 📌")?;
    progress("writing store config")?;
    let config_path = config::config_path(store_root);
    if config_path.exists() {
        progress_warn("config already present; keeping it")?;
    } else {
        config::save(store_root, &Config::default())?;
        progress_ok(&format!("config written to {}", config_path.display()))?;
    }

    let config = config::load(store_root)?;
    let db_path = store_root.join(".tack").join("store.sqlite");
    progress(&format!("opening store database at {}", db_path.display()))?;
    let _ = SqliteStorage::open(
        db_path.to_str().ok_or_else(|| {
            AppError::InvalidArgument("store path is not valid UTF-8".to_string())
        })?,
        config.hard_limit_bytes,
    )?;
    progress_ok("local store ready")?;
    Ok(())
}

pub(crate) fn uninit_all(store_root: &Path) -> Result<(), AppError> {
    print_banner("PULLING THE TACK 📌")?;
    let tack_dir = store_root.join(".tack");
    if tack_dir.exists() {
        progress("removing local store")?;
        std::fs::remove_dir_all(&tack_dir)?;
        progress_ok("local store removed")?;
    } else {
        progress_warn("no local store present")?;
    }
    Ok(())
}

fn progress(message: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_CYAN}•{ANSI_RESET} {message}");
    io::stdout().flush()?;
    Ok(())
}

fn progress_ok(message: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_GREEN}✓{ANSI_RESET} {message}");
    io::stdout().flush()?;
    Ok(())
}

fn progress_warn(message: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_YELLOW}!{ANSI_RESET} {message}");
    io::stdout().flush()?;
    Ok(())
}

fn print_banner(title: &str) -> Result<(), AppError> {
    println!("{ANSI_BOLD_MAGENTA}{title}{ANSI_RESET}");
    println!("{ANSI_BOLD_CYAN}Welcome to tack!{ANSI_RESET}");
    println!(
        "{ANSI_DIM}version {}{ANSI_RESET}",
        env!("CARGO_PKG_VERSION")
    );
    println!();
    io::stdout().flush()?;
    Ok(())
}
