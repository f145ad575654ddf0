//! Terminal output for `cloudsink` commands
//!
//! Human output is a short status line plus an aligned run summary on
//! stdout, with problems on stderr. JSON output prints one document per
//! event, and the sync report serialized as-is.

use cloudsink_sync::engine::SyncReport;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    /// Formatter writing in this format
    pub fn formatter(self) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}

/// Where command results and problems are written
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    /// Final statistics and per-file errors of a sync run
    fn report(&self, report: &SyncReport);
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }

    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }

    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }

    fn report(&self, report: &SyncReport) {
        self.success(&headline(report));
        for line in summary_lines(report) {
            println!("  {line}");
        }
        if !report.errors.is_empty() {
            self.error(&format!(
                "{} file{} or folder{} not synced:",
                report.errors.len(),
                plural(report.errors.len() as u64),
                plural(report.errors.len() as u64)
            ));
            for err in &report.errors {
                eprintln!("  - {err}");
            }
        }
    }
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", serde_json::json!({"success": true, "message": message}));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"success": false, "error": message}));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({"level": "warning", "message": message}));
    }

    fn report(&self, report: &SyncReport) {
        match serde_json::to_string_pretty(report) {
            Ok(json) => println!("{json}"),
            Err(err) => self.error(&format!("Failed to serialize the sync report: {err}")),
        }
    }
}

fn headline(report: &SyncReport) -> String {
    let secs = report.duration_ms as f64 / 1000.0;
    if report.dry_run {
        format!("Dry run completed in {secs:.1}s (no changes made)")
    } else if report.stats.changes() == 0 && report.errors.is_empty() {
        "Already up to date".to_string()
    } else {
        format!("Sync completed in {secs:.1}s")
    }
}

fn summary_lines(report: &SyncReport) -> Vec<String> {
    let stats = &report.stats;
    vec![
        format!("Uploaded:        {} file{}", stats.uploaded, plural(stats.uploaded)),
        format!("Updated:         {} file{}", stats.updated, plural(stats.updated)),
        format!("Folders created: {}", stats.folders_created),
        format!("Already present: {}", stats.already_present),
        format!("Skipped:         {}", stats.skipped),
        format!("Failed:          {}", stats.failed),
        format!(
            "Processed:       {} file{} in {} folder{}",
            stats.files_processed,
            plural(stats.files_processed),
            stats.folders_processed,
            plural(stats.folders_processed)
        ),
        format!("Bytes uploaded:  {}", stats.bytes_uploaded),
    ]
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
