use captiondesk_core::{Notification, NotificationCenter, NotificationSink, Severity};
use console::style;
use indicatif::MultiProgress;

/// Prints every notification as a styled line, above any running spinners,
/// and keeps it in a `NotificationCenter` for views that redraw.
pub struct ConsoleSink {
    progress: MultiProgress,
    center: NotificationCenter,
}

impl ConsoleSink {
    pub fn new(progress: MultiProgress, center: NotificationCenter) -> Self {
        Self { progress, center }
    }

    pub fn center(&self) -> &NotificationCenter {
        &self.center
    }
}

pub fn styled(notification: &Notification) -> String {
    let marker = match notification.severity {
        Severity::Info => style("ℹ").cyan().bold(),
        Severity::Success => style("✓").green().bold(),
        Severity::Warning => style("!").yellow().bold(),
        Severity::Error => style("✗").red().bold(),
    };
    format!("{} {}", marker, notification.message)
}

impl NotificationSink for ConsoleSink {
    fn notify(&self, notification: Notification) {
        let line = styled(&notification);
        self.progress.suspend(|| println!("{line}"));
        self.center.notify(notification);
    }
}
