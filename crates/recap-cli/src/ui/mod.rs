use console::style;
use dialoguer::{theme::ColorfulTheme, Password};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use recap_core::{JsonLineProgress, ProgressSink};

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", style("✔").green(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    println!("{} {}", style("✖").red(), msg);
}

/// Print info message (indented)
pub fn info(msg: &str) {
    println!("  {}", msg);
}

/// Print dimmed detail (indented)
pub fn detail(msg: &str) {
    println!("  {}", style(msg).dim());
}

/// Print a header/title
pub fn header(msg: &str) {
    println!();
    println!("  {}", style(msg).bold());
    println!();
}

/// Prompt for a password/token (masked input)
pub fn prompt_password(prompt: &str) -> anyhow::Result<String> {
    let value = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()?;
    Ok(value)
}

/// Create a spinner for indeterminate progress
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Where progress updates from the core go: a spinner for people, JSON lines
/// for wrappers (`--progress-json`).
pub enum StatusLine {
    Spinner(ProgressBar),
    Json(JsonLineProgress),
}

impl StatusLine {
    pub fn new(stage: &'static str, message: &str, json: bool) -> Self {
        if json {
            let progress = JsonLineProgress::new(stage);
            progress.report(message);
            StatusLine::Json(progress)
        } else {
            StatusLine::Spinner(spinner(message))
        }
    }

    pub fn finish(&self) {
        if let StatusLine::Spinner(pb) = self {
            pb.finish_and_clear();
        }
    }
}

impl ProgressSink for StatusLine {
    fn report(&self, message: &str) {
        match self {
            StatusLine::Spinner(pb) => pb.set_message(message.to_string()),
            StatusLine::Json(progress) => progress.report(message),
        }
    }
}
