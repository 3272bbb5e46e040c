//! Console progress reporting

use indicatif::{ProgressBar, ProgressStyle};
use tsnic_core::flash::{Phase, ProgressSink};

/// Bar template for a phase; `{msg}` carries the completion note
fn phase_template(phase: Phase) -> String {
    match phase {
        Phase::Erase => format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} sectors ({{eta}}) {} {{msg}}",
            phase
        ),
        _ => format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {} {{msg}}",
            phase
        ),
    }
}

/// Create a progress bar style for a phase
fn create_progress_bar_style(phase: Phase) -> Result<ProgressStyle, Box<dyn std::error::Error>> {
    Ok(ProgressStyle::default_bar()
        .template(&phase_template(phase))?
        .progress_chars("#>-"))
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self { current_bar: None }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&mut self, phase: Phase, total: u64) {
        let pb = ProgressBar::new(total);
        pb.set_style(
            create_progress_bar_style(phase).unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        self.current_bar = Some(pb);
    }

    fn update(&mut self, _phase: Phase, done: u64, _total: u64) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(done);
        }
    }

    fn finish(&mut self, _phase: Phase) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message("done");
        }
    }
}

/// Pick the progress reporter for the requested verbosity
pub fn reporter(quiet: bool) -> Box<dyn ProgressSink> {
    if quiet {
        Box::new(tsnic_core::flash::NoProgress)
    } else {
        Box::new(IndicatifProgress::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHASES: [Phase; 4] = [Phase::Erase, Phase::Write, Phase::Verify, Phase::Dump];

    #[test]
    fn test_templates_show_message() {
        for phase in PHASES {
            let template = phase_template(phase);
            assert!(template.ends_with(&format!("{} {{msg}}", phase)));
            assert!(create_progress_bar_style(phase).is_ok());
        }
        assert!(phase_template(Phase::Erase).contains("sectors"));
        assert!(phase_template(Phase::Dump).contains("{bytes}"));
    }

    #[test]
    fn test_finish_sets_message() {
        let mut progress = IndicatifProgress::new();
        progress.start(Phase::Write, 2048);
        let pb = progress.current_bar.clone().unwrap();
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());

        progress.update(Phase::Write, 1024, 2048);
        assert_eq!(pb.position(), 1024);

        progress.finish(Phase::Write);
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "done");
        assert!(progress.current_bar.is_none());
    }
}
