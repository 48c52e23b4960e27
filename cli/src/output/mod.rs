//! Terminal output for the setup run.

pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::OwoColorize as _;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::setup::SetupReport;
use crate::domain::RegistrationOutcome;

/// One line of the closing summary printed after a successful setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLine {
    Done(String),
    Field(&'static str, String),
    Note(String),
    Warning(String),
}

/// What the operator needs to log in to the dashboard, plus follow-ups.
#[must_use]
pub fn summary_lines(report: &SetupReport, registration_command: &str) -> Vec<SummaryLine> {
    let mut lines = vec![
        SummaryLine::Done("Admin node is ready.".into()),
        SummaryLine::Field("Dashboard:", format!("https://{}", report.external_fqdn)),
        SummaryLine::Field("Administrator:", report.admin_email.clone()),
    ];
    if let Some(fingerprint) = &report.fingerprint {
        lines.push(SummaryLine::Field(
            "Certificate SHA-256 fingerprint:",
            fingerprint.clone(),
        ));
        lines.push(SummaryLine::Note(
            "Compare this fingerprint with the one your browser shows on first login.".into(),
        ));
    }
    if let RegistrationOutcome::Failed { .. } = report.registration {
        lines.push(SummaryLine::Warning(format!(
            "This node is not registered; run {registration_command} later to receive updates."
        )));
    }
    lines
}

/// Styling and terminal state shared by the reporter and the summary.
pub struct OutputContext {
    pub styles: Styles,
    /// Stdout is a terminal.
    pub is_tty: bool,
    /// Only errors are printed.
    pub quiet: bool,
}

impl OutputContext {
    /// Colors are used only on a terminal, without `--no-color` or `NO_COLOR`.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if !no_color && is_tty && std::env::var_os("NO_COLOR").is_none() {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Spinners replace plain step lines on an interactive, non-quiet run.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    pub fn title(&self, title: &str) {
        if !self.quiet {
            println!("  {}", title.style(self.styles.header));
        }
    }

    pub fn done(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    pub fn field(&self, label: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", label.style(self.styles.dim));
        }
    }

    pub fn summary(&self, lines: &[SummaryLine]) {
        for line in lines {
            match line {
                SummaryLine::Done(msg) => self.done(msg),
                SummaryLine::Field(label, value) => self.field(label, value),
                SummaryLine::Note(msg) if !self.quiet => {
                    println!("  {} {msg}", "ℹ".style(self.styles.info));
                }
                SummaryLine::Note(_) => {}
                SummaryLine::Warning(msg) => self.warn(msg),
            }
        }
    }
}
