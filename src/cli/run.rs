use super::ui;
use crate::jobs::{Job, JobReport};
use anyhow::Result;
use comfy_table::{Cell, Table};

impl JobReport {
    pub fn display_as_table(&self) -> Table {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Job"),
            ui::header_cell("Attempted"),
            ui::header_cell("Succeeded"),
            ui::header_cell("Failed"),
            ui::header_cell("Skipped"),
        ]);
        table.add_row(vec![
            Cell::new(self.job),
            ui::count_cell(self.attempted, false),
            ui::count_cell(self.succeeded, false),
            ui::count_cell(self.failed, true),
            ui::count_cell(self.skipped, false),
        ]);
        table
    }
}

/// Runs one job to completion behind a spinner and prints its report.
pub async fn run_once(job: &dyn Job) -> Result<JobReport> {
    let spinner = ui::new_spinner(&format!("Running {}", job.name()));
    let result = job.run().await;
    spinner.finish_and_clear();

    match &result {
        Ok(report) => {
            println!("{}", ui::style_text(job.name(), ui::StyleType::Title));
            println!("{}", report.display_as_table());
        }
        Err(e) => println!(
            "{} {}",
            ui::style_text(job.name(), ui::StyleType::Error),
            ui::style_text(&format!("{e:#}"), ui::StyleType::Subtle)
        ),
    }
    result
}
