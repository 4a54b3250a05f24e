use anyhow::Result;
use colored::Colorize;
use declarative::{Diff, PollObserver, Report};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::time::Duration;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Reports
// ============================================================================

/// One word for the state a report ends in
pub fn status_word(report: &Report) -> &'static str {
    if report.failed {
        "failed"
    } else if report.changed {
        "changed"
    } else {
        "ok"
    }
}

/// Print the status line of one report, followed by its diff
pub fn report(label: &str, report: &Report) {
    let word = status_word(report);
    let tag = match word {
        "failed" => format!("[{word}]").red().bold(),
        "changed" => format!("[{word}]").yellow().bold(),
        _ => format!("[{word}]").green(),
    };
    let mark = if report.failed { "✗".red() } else { "✓".green() };
    println!("{mark} {} {tag} {}", label.bold(), report.msg);

    if let Some(diff) = &report.diff {
        show_diff(diff);
    }
    for line in &report.debug {
        dim(line);
    }
}

/// Changed lines between the pretty-printed before and after trees
pub fn diff_lines(diff: &Diff) -> Vec<(ChangeTag, String)> {
    let before = pretty(&diff.before);
    let after = diff.after.as_ref().map(pretty).unwrap_or_default();

    TextDiff::from_lines(&before, &after)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.to_string_lossy().trim_end().to_string()))
        .collect()
}

fn show_diff(diff: &Diff) {
    for (tag, line) in diff_lines(diff) {
        match tag {
            ChangeTag::Delete => println!("    {}", format!("- {line}").red()),
            ChangeTag::Insert => println!("    {}", format!("+ {line}").green()),
            ChangeTag::Equal => {}
        }
    }
}

fn pretty(value: &Value) -> String {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    text.push('\n');
    text
}

/// Print any serializable value as pretty JSON on stdout
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ============================================================================
// Progress
// ============================================================================

/// Spinner shown while waiting for a remote job
pub struct Spinner {
    bar: ProgressBar,
    what: String,
}

impl Spinner {
    /// A spinner for `what`; hidden when output is JSON or quiet
    pub fn new(what: &str, visible: bool) -> Self {
        let bar = if visible {
            let bar = ProgressBar::new_spinner();
            let style = ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        bar.set_message(format!("Waiting for {what}..."));
        Self {
            bar,
            what: what.to_string(),
        }
    }
}

impl PollObserver for Spinner {
    fn on_check(&mut self, attempt: u32, elapsed: Duration) {
        self.bar.set_message(format!(
            "Waiting for {} (check {attempt}, {}s)",
            self.what,
            elapsed.as_secs()
        ));
    }

    fn on_finish(&mut self, _summary: &str) {
        self.bar.finish_and_clear();
    }
}

// ============================================================================
// Tests
// ============================================================================
