use daqstream::observability::{PipelineMetrics, PipelineMonitor};
use std::sync::Arc;

#[test]
fn test_metrics_track_backlog() {
    let metrics = PipelineMetrics::new();
    metrics.record_block_acquired(10);
    metrics.record_block_acquired(10);
    metrics.record_block_persisted(10, 120);

    assert_eq!(metrics.blocks_acquired(), 2);
    assert_eq!(metrics.backlog(), 1);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.samples_acquired, 20);
    assert_eq!(snapshot.rows_written, 10);
    assert_eq!(snapshot.sink_bytes, 120);
}

#[test]
fn test_progress_line() {
    let metrics = Arc::new(PipelineMetrics::new());
    metrics.record_block_persisted(1000, 1024 * 1024);

    let line = PipelineMonitor::new(metrics).progress_line();
    assert!(line.starts_with("#samples per channel: 1000"));
    assert!(line.ends_with("file_size: 1.00 Mb"));
}

#[test]
fn test_monitor_report() {
    let metrics = Arc::new(PipelineMetrics::new());
    metrics.record_block_acquired(5);
    metrics.record_block_acquired(5);
    metrics.record_block_persisted(5, 64);
    metrics.record_read_fault();

    let report = PipelineMonitor::new(metrics).generate_report();
    assert!(report.contains("2 blocks (10 samples per channel)"));
    assert!(report.contains("1 blocks, 5 rows, 64 bytes"));
    assert!(report.contains("1 read error"));
    assert!(!report.contains("dropped"));
}

#[test]
fn test_report_without_faults() {
    let report = PipelineMonitor::new(Arc::new(PipelineMetrics::new())).generate_report();
    assert!(report.contains("Faults: none"));
}
