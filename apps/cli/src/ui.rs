use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(60) {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

pub fn create_spinner(progress: &MultiProgress, msg: &str) -> ProgressBar {
    let pb = progress.add(ProgressBar::new_spinner());
    pb.set_style(spinner_style());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn banner(subtitle: &str) {
    println!(
        "\n{}  {}\n",
        style("captiondesk").cyan().bold(),
        style(subtitle).dim()
    );
}

pub fn rule() {
    println!("{}", style("─".repeat(60)).dim());
}

pub fn done(message: &str, elapsed: Duration) -> String {
    format!(
        "{} {} {}",
        style("✓").green().bold(),
        message,
        style(format!("[{}]", format_duration(elapsed))).dim()
    )
}

pub fn failed(message: &str) -> String {
    format!("{} {}", style("✗").red().bold(), message)
}
