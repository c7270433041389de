// UI layer: a simple interactive menu using `dialoguer`, plus the spinner
// and result line shared with the non-interactive `remove` command.

use crate::api::{default_destination, UploadClient};
use crate::config::{ClientConfig, Settings, API_KEY_ENV};
use crate::error::UploadError;
use anyhow::{Context, Result};
use dialoguer::{Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main interactive menu. Runs a select loop until the user picks "Exit".
/// Failed removals are reported and the loop continues.
pub fn main_menu() -> Result<()> {
    let settings_path = Settings::default_path();
    loop {
        let items = vec!["Remove background", "Set API key", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => handle_remove(&settings_path)?,
            1 => handle_set_key(&settings_path)?,
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Ask for input and output paths, then run one removal behind a spinner.
fn handle_remove(settings_path: &Path) -> Result<()> {
    let config = match ClientConfig::resolve(None, None) {
        Ok(config) => config,
        Err(UploadError::MissingApiKey) => {
            println!("No API key found (flag, {} or saved settings).", API_KEY_ENV);
            let key = prompt_and_save_key(settings_path)?;
            ClientConfig::resolve(Some(key), None)?
        }
        Err(e) => return Err(e.into()),
    };
    let client = UploadClient::new(config)?;

    let input: String = Input::new().with_prompt("Image file path").interact_text()?;
    let source = PathBuf::from(input.trim());
    let suggested = default_destination(&source);
    let output: String = Input::new()
        .with_prompt("Save result to")
        .default(suggested.display().to_string())
        .interact_text()?;
    let destination = PathBuf::from(output.trim());

    let result = with_spinner("Removing background...", || {
        client.remove_background(&source, &destination)
    })?;
    report(&result);
    Ok(())
}

/// Prompt for a key (hidden input) and persist it to the settings file.
fn handle_set_key(settings_path: &Path) -> Result<()> {
    prompt_and_save_key(settings_path)?;
    println!("API key saved to {}", settings_path.display());
    Ok(())
}

fn prompt_and_save_key(settings_path: &Path) -> Result<String> {
    let key: String = Password::new().with_prompt("API key").interact()?;
    let key = key.trim().to_string();
    let mut settings = load_or_replace(settings_path);
    settings.api_key = Some(key.clone());
    settings
        .save(settings_path)
        .with_context(|| format!("Writing {}", settings_path.display()))?;
    Ok(key)
}

/// Current settings, or empty ones when the file cannot be parsed. Saving
/// then replaces the broken file.
fn load_or_replace(settings_path: &Path) -> Settings {
    match Settings::load(settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            println!("{}; it will be replaced.", e);
            Settings::default()
        }
    }
}

/// Run `f` while a spinner with `message` ticks on stderr.
pub fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").context("Invalid spinner template")?,
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let out = f();
    spinner.finish_and_clear();
    Ok(out)
}

/// The line printed for a finished removal.
pub fn outcome_line(result: &crate::error::Result<PathBuf>) -> String {
    match result {
        Ok(path) => format!("✅ Saved: {}", path.display()),
        Err(UploadError::Api { status, message }) => format!("❌ {} {}", status, message),
        Err(e) => format!("❌ {}", e),
    }
}

/// Print the outcome: success on stdout, failure on stderr.
pub fn report(result: &crate::error::Result<PathBuf>) {
    let line = outcome_line(result);
    if result.is_ok() {
        println!("{}", line);
    } else {
        eprintln!("{}", line);
    }
}
