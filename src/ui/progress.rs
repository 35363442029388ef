use crate::import::ImportSummary;
use crate::import::progress::{QUERY_EXECUTED, READ_DONE, WRITE_DONE};
use crate::output::is_quiet;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

const BAR_TEMPLATE: &str = "{spinner:.green} {msg:<18} [{bar:40.cyan/blue}] {pos:>3}%";

/// Terminal progress bar fed by import progress events
pub struct ImportProgress {
    bar: ProgressBar,
    started: Instant,
}

impl ImportProgress {
    pub fn new() -> Self {
        let bar = if console::Term::stdout().is_term() && !is_quiet() {
            ProgressBar::new(u64::from(WRITE_DONE))
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(phase_label(0));
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar, started: Instant::now() }
    }

    pub fn set(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(phase_label(percent));
    }

    /// Leave the bar where it stopped, e.g. after a failure
    pub fn abandon(&self) {
        self.bar.abandon();
    }

    pub fn finish_with_summary(&self, summary: &ImportSummary) {
        self.bar.finish_and_clear();
        println!();
        let headline = if summary.cancelled {
            format!("{} Import cancelled after {}", Icons::STOP, HumanDuration(self.started.elapsed()))
                .style(theme().warn.clone())
                .to_string()
        } else {
            format!("{} Import complete in {}", Icons::CHECK, HumanDuration(self.started.elapsed()))
                .style(theme().success.clone())
                .to_string()
        };
        println!("{}", headline);
        println!(
            "  {} {} new records added  {} {} duplicates skipped",
            Icons::NEW.style(theme().info.clone()),
            summary.new_records,
            Icons::SKIP.style(theme().info.clone()),
            summary.skipped_records
        );
    }
}

impl Default for ImportProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn phase_label(percent: u8) -> &'static str {
    match percent {
        p if p < QUERY_EXECUTED => "Opening databases",
        p if p < READ_DONE => "Reading transfers",
        p if p < WRITE_DONE => "Writing records",
        _ => "Done",
    }
}
