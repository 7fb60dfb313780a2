use console::style;

use crate::synthesis::{JobReport, JobStatus, RunSummary};

pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// One line per job
    pub fn report(&self, report: &JobReport) {
        let label = style(format!("{:<9}", report.status.as_str()));
        let status = match report.status {
            JobStatus::Passed => label.green(),
            JobStatus::Failed | JobStatus::Error => label.red(),
            JobStatus::Abandoned | JobStatus::Skipped => label.yellow(),
        };
        let detail = match (&report.artifact, &report.error) {
            (_, Some(error)) => error.clone(),
            (Some(path), None) => path.display().to_string(),
            (None, None) => String::new(),
        };
        println!(
            "  {} {} {} {}",
            status,
            report.test_name,
            style(format!("({} rounds)", report.rounds)).dim(),
            style(detail).dim()
        );
    }

    /// Totals and per-job lines for a finished run
    pub fn summary(&self, summary: &RunSummary) {
        self.section(&format!("Run {}", summary.run_id));
        for report in &summary.reports {
            self.report(report);
        }
        println!();
        println!(
            "  {} passed, {} failed, {} abandoned, {} errors, {} skipped",
            style(summary.passed).green().bold(),
            style(summary.failed).red().bold(),
            style(summary.abandoned).yellow(),
            style(summary.errored).red(),
            style(summary.skipped).yellow(),
        );

        if summary.cancelled {
            self.warning("Run cancelled; partial output was kept");
        } else if summary.total() == 0 {
            self.info("Nothing to test");
        } else if summary.is_success() {
            self.success("All generated tests pass");
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
