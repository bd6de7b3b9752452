/*!
 * CLI styling for upload run reports
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};

use crate::stats::RunSummary;

/// Brand colors for consistent styling
pub struct Theme;

impl Theme {
    pub fn primary<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn success<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    pub fn muted<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    pub fn header<D: std::fmt::Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

/// Unicode icons for visual feedback
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const ARROW_RIGHT: &'static str = "→";
    pub const SATELLITE: &'static str = "🛰";
}

/// Create a standard styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One row per worker, ordered by worker index
pub fn upload_summary_table(summary: &RunSummary) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Worker").add_attribute(Attribute::Bold),
        Cell::new("File").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Sent").add_attribute(Attribute::Bold),
        Cell::new("Duration").add_attribute(Attribute::Bold),
        Cell::new("Detail").add_attribute(Attribute::Bold),
    ]);

    for outcome in &summary.outcomes {
        let detail = match (&outcome.error, &outcome.video_id) {
            (Some(err), _) => Cell::new(err).fg(Color::Red),
            (None, Some(id)) => Cell::new(format!("id {}", id)).fg(Color::DarkGrey),
            (None, None) => Cell::new(""),
        };
        let sent = if outcome.short_read {
            Cell::new(format!("{} (short)", format_bytes(outcome.bytes_sent))).fg(Color::Yellow)
        } else {
            Cell::new(format_bytes(outcome.bytes_sent))
        };

        table.add_row(vec![
            Cell::new(outcome.worker_index),
            Cell::new(&outcome.filename),
            status_cell(outcome.success),
            sent,
            Cell::new(format_duration(outcome.duration.as_secs_f64())),
            detail,
        ]);
    }

    table
}

/// Two-column run totals
pub fn run_totals_table(summary: &RunSummary) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        Cell::new("Upload Summary")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(""),
    ]);

    table.add_row(vec![
        Cell::new("Successful"),
        Cell::new(summary.successful.to_string())
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);

    if summary.failed > 0 {
        table.add_row(vec![
            Cell::new("Failed"),
            Cell::new(summary.failed.to_string())
                .fg(Color::Red)
                .add_attribute(Attribute::Bold),
        ]);
    }

    if summary.short_reads > 0 {
        table.add_row(vec![
            Cell::new("Short Reads"),
            Cell::new(summary.short_reads.to_string()).fg(Color::Yellow),
        ]);
    }

    table.add_row(vec![
        Cell::new("Payload Sent"),
        Cell::new(format_bytes(summary.total_bytes)),
    ]);
    table.add_row(vec![
        Cell::new("Wall Time"),
        Cell::new(format_duration(summary.wall_time.as_secs_f64())),
    ]);
    table.add_row(vec![
        Cell::new("Aggregate Speed"),
        Cell::new(format!("{}/s", format_bytes(summary.aggregate_speed_bps() as u64)))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
    ]);

    if summary.fastest_speed_bps > 0.0 {
        table.add_row(vec![
            Cell::new("Fastest / Slowest"),
            Cell::new(format!(
                "{}/s / {}/s",
                format_bytes(summary.fastest_speed_bps as u64),
                format_bytes(summary.slowest_speed_bps as u64)
            ))
            .fg(Color::DarkGrey),
        ]);
    }

    table
}

fn status_cell(success: bool) -> Cell {
    if success {
        Cell::new(format!("{} ok", Icons::SUCCESS)).fg(Color::Green)
    } else {
        Cell::new(format!("{} failed", Icons::ERROR)).fg(Color::Red)
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f = bytes as f64;
    let base = 1024.0_f64;
    let exp = (bytes_f.ln() / base.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f / base.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.2} {}", value, UNITS[exp])
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = (secs / 60.0).floor();
        format!("{}m {:.0}s", mins, secs % 60.0)
    } else {
        let hours = (secs / 3600.0).floor();
        let mins = ((secs % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours, mins)
    }
}

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}

/// Header line printed before workers start
pub fn print_run_header(target: &str, workers: usize, source: &str) {
    println!(
        "{} {} {} {} {}",
        Theme::header(Icons::SATELLITE),
        Theme::header(format!("{} parallel uploads", workers)),
        Theme::muted(Icons::ARROW_RIGHT),
        Theme::primary(target),
        Theme::muted(format!("({})", source))
    );
}

/// Final line: always printed, success or not
pub fn print_summary_line(summary: &RunSummary) {
    let line = format!("Summary: {}", summary.summary_line());
    if summary.all_succeeded() {
        println!("\n{}", Theme::success(line));
    } else {
        println!("\n{}", Theme::warning(line));
    }
}
