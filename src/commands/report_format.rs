use std::path::PathBuf;

/// Outcome of one pipeline stage. Failures are counted, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: &'static str,
    pub outputs: Vec<PathBuf>,
    pub skipped: usize,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            outputs: Vec::new(),
            skipped: 0,
        }
    }

    pub fn record(&mut self, path: PathBuf) {
        self.outputs.push(path);
    }

    pub fn skip(&mut self) {
        self.skipped += 1;
    }
}

pub fn format_stage_report(report: &StageReport) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Stage: {}", report.stage));
    lines.push(format!("Files written: {}", report.outputs.len()));
    lines.push(format!("Skipped: {}", report.skipped));
    for output in &report.outputs {
        lines.push(format!("  {}", output.display()));
    }
    lines.join("\n")
}
