use super::PipelineMetrics;
use std::sync::Arc;

pub struct PipelineMonitor {
    metrics: Arc<PipelineMetrics>,
}

impl PipelineMonitor {
    pub fn new(metrics: Arc<PipelineMetrics>) -> Self {
        Self { metrics }
    }

    /// One-line progress report: rows per channel and sink size
    pub fn progress_line(&self) -> String {
        format!(
            "#samples per channel: {:<15} file_size: {:.2} Mb",
            self.metrics.rows_written(),
            self.metrics.sink_bytes() as f64 / (1024.0 * 1024.0)
        )
    }

    pub fn generate_report(&self) -> String {
        let s = self.metrics.snapshot();

        let mut report = String::from("=== Acquisition Summary ===\n");
        report.push_str(&format!(
            "  Acquired: {} blocks ({} samples per channel)\n",
            s.blocks_acquired, s.samples_acquired
        ));
        report.push_str(&format!(
            "  Persisted: {} blocks, {} rows, {} bytes\n",
            s.blocks_persisted, s.rows_written, s.sink_bytes
        ));
        report.push_str(&format!(
            "  Faults: {}\n",
            if s.read_faults > 0 {
                format!("{} read error{}", s.read_faults, if s.read_faults == 1 { "" } else { "s" })
            } else {
                "none".to_string()
            }
        ));
        if s.observer_drops > 0 {
            report.push_str(&format!("  Live view dropped {} chunks\n", s.observer_drops));
        }

        report
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }
}
