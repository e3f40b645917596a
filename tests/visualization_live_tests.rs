use daqstream::core::{ChannelSet, SampleBlock};
use daqstream::observability::PipelineMetrics;
use daqstream::visualization::{poll_interval, LiveMonitor};
use std::sync::Arc;
use std::time::Duration;

fn monitor() -> LiveMonitor {
    LiveMonitor::new(ChannelSet::new(["ai0", "ai1", "ai2"]).unwrap(), 4)
}

fn block(offset: f64) -> SampleBlock {
    SampleBlock::new(vec![
        vec![offset, offset + 1.0],
        vec![offset + 10.0, offset + 11.0],
        vec![offset + 20.0, offset + 21.0],
    ])
    .unwrap()
}

#[test]
fn test_poll_interval() {
    assert_eq!(poll_interval(1000, 100), Duration::from_millis(100));
    assert_eq!(poll_interval(1000, 1), Duration::from_millis(1));
    assert_eq!(poll_interval(1_000_000, 1), Duration::from_millis(1));
    assert_eq!(poll_interval(3, 1), Duration::from_millis(333));
}

#[test]
fn test_observer_sees_only_its_channel() {
    let live = monitor();
    let mut ai1 = live.attach("ai1").unwrap();

    live.publish(&block(0.0));
    assert_eq!(ai1.poll(), vec![10.0, 11.0]);
    assert_eq!(ai1.channel_id(), "ai1");
}

#[test]
fn test_window_keeps_latest_samples() {
    let live = monitor();
    let mut ai0 = live.attach("ai0").unwrap();

    for i in 0..3 {
        live.publish(&block(i as f64 * 100.0));
    }
    assert_eq!(ai0.poll(), vec![100.0, 101.0, 200.0, 201.0]);
}

#[test]
fn test_unknown_channel_cannot_be_observed() {
    assert!(monitor().attach("ai7").is_err());
}

#[test]
fn test_selection_sync_creates_and_removes_observers() {
    let live = monitor();

    let created = live.sync_selection(&["ai0", "ai2"]).unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(live.observed_channels(), vec!["ai0", "ai2"]);

    let created = live.sync_selection(&["ai2", "ai1"]).unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].channel_id(), "ai1");
    assert_eq!(live.observed_channels(), vec!["ai1", "ai2"]);

    live.sync_selection::<&str>(&[]).unwrap();
    assert!(live.observed_channels().is_empty());
}

#[test]
fn test_dropped_observer_is_pruned() {
    let live = monitor();
    let observer = live.attach("ai0").unwrap();
    drop(observer);

    live.publish(&block(0.0));
    assert!(!live.is_observed("ai0"));
}

#[test]
fn test_slow_observer_drops_instead_of_blocking() {
    let metrics = Arc::new(PipelineMetrics::new());
    let live = monitor().with_depth(1).with_metrics(metrics.clone());
    let mut observer = live.attach("ai2").unwrap();

    live.publish(&block(0.0));
    live.publish(&block(1.0));
    live.publish(&block(2.0));

    assert_eq!(observer.poll(), vec![20.0, 21.0]);
    assert_eq!(metrics.snapshot().observer_drops, 2);
}
