use daqstream::core::{AcquisitionConfig, ChannelSet, DaqError, SampleBlock};
use daqstream::engine::{AcquisitionLoop, CancellationToken, SampleChannel, StopState};
use daqstream::hal::mock::SimulatedSource;
use daqstream::observability::PipelineMetrics;
use daqstream::visualization::LiveMonitor;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn config() -> AcquisitionConfig {
    AcquisitionConfig::new(ChannelSet::new(["ai0", "ai1"]).unwrap(), 1000).with_samples_per_read(2)
}

fn blocks(n: usize) -> Vec<SampleBlock> {
    (0..n)
        .map(|i| {
            let base = (i * 2) as f64;
            SampleBlock::new(vec![vec![base, base + 1.0], vec![-base, -base - 1.0]]).unwrap()
        })
        .collect()
}

#[test]
fn test_blocks_reach_channel_in_read_order() {
    let source = SimulatedSource::scripted(blocks(3));
    let probe = source.probe();
    let channel = SampleChannel::bounded(8);
    let token = CancellationToken::new();

    let worker = AcquisitionLoop::new(Box::new(source), &config(), channel.producer(), token.clone());
    let handle = thread::spawn(move || worker.run());

    let consumer = channel.consumer();
    let received: Vec<SampleBlock> = (0..3).map(|_| consumer.get().unwrap()).collect();
    token.signal();
    let report = handle.join().unwrap().unwrap();

    assert_eq!(received, blocks(3));
    assert_eq!(report.blocks, 3);
    assert_eq!(report.samples_per_channel, 6);
    assert_eq!(probe.configure_calls(), 1);
    assert_eq!(probe.start_calls(), 1);
    assert_eq!(probe.close_calls(), 1);
    assert_eq!(token.state(), StopState::Acknowledged);
}

#[test]
fn test_never_reads_an_empty_buffer() {
    let source = SimulatedSource::scripted(blocks(1));
    let probe = source.probe();
    let channel = SampleChannel::bounded(4);
    let token = CancellationToken::new();

    let worker = AcquisitionLoop::new(Box::new(source), &config(), channel.producer(), token.clone());
    let handle = thread::spawn(move || worker.run());

    channel.consumer().get().unwrap();
    // Script is exhausted; the loop now idles on zero available samples
    thread::sleep(Duration::from_millis(30));
    token.signal();
    handle.join().unwrap().unwrap();

    assert_eq!(probe.read_calls(), 1);
    assert_eq!(probe.reads_while_empty(), 0);
}

#[test]
fn test_read_fault_ends_run_and_closes_once() {
    let source = SimulatedSource::scripted(blocks(5)).fail_read_after(2);
    let probe = source.probe();
    let channel = SampleChannel::bounded(8);
    let metrics = Arc::new(PipelineMetrics::new());

    let worker = AcquisitionLoop::new(
        Box::new(source),
        &config(),
        channel.producer(),
        CancellationToken::new(),
    )
    .with_metrics(metrics.clone());

    let result = worker.run();
    assert!(matches!(result, Err(DaqError::HardwareRead(_))));
    assert_eq!(probe.close_calls(), 1);
    assert_eq!(channel.len(), 2);
    assert_eq!(metrics.blocks_acquired(), 2);
    assert_eq!(metrics.read_faults(), 1);
}

#[test]
fn test_start_failure_closes_once_without_reading() {
    let source = SimulatedSource::scripted(blocks(1)).fail_on_start();
    let probe = source.probe();
    let channel = SampleChannel::bounded(2);

    let worker = AcquisitionLoop::new(
        Box::new(source),
        &config(),
        channel.producer(),
        CancellationToken::new(),
    );

    assert!(matches!(worker.run(), Err(DaqError::Configuration(_))));
    assert_eq!(probe.read_calls(), 0);
    assert_eq!(probe.close_calls(), 1);
    assert!(channel.is_empty());
}

#[test]
fn test_stop_requested_before_start_reads_nothing() {
    let source = SimulatedSource::scripted(blocks(2));
    let probe = source.probe();
    let channel = SampleChannel::bounded(2);
    let token = CancellationToken::new();
    token.signal();

    let report = AcquisitionLoop::new(Box::new(source), &config(), channel.producer(), token)
        .run()
        .unwrap();

    assert_eq!(report.blocks, 0);
    assert_eq!(probe.read_calls(), 0);
    assert_eq!(probe.close_calls(), 1);
}

#[test]
fn test_in_flight_read_completes_before_stop() {
    let source = SimulatedSource::scripted(blocks(4)).with_read_delay(Duration::from_millis(100));
    let probe = source.probe();
    let channel = SampleChannel::bounded(8);
    let token = CancellationToken::new();

    let worker = AcquisitionLoop::new(Box::new(source), &config(), channel.producer(), token.clone());
    let handle = thread::spawn(move || worker.run());

    while !probe.read_in_flight() {
        thread::sleep(Duration::from_millis(1));
    }
    token.signal();
    let report = handle.join().unwrap().unwrap();

    assert_eq!(report.blocks, 1);
    assert_eq!(channel.len(), 1);
    assert_eq!(probe.close_calls(), 1);
}

#[test]
fn test_live_observers_get_copies() {
    let source = SimulatedSource::scripted(blocks(2));
    let channel = SampleChannel::bounded(8);
    let token = CancellationToken::new();
    let live = LiveMonitor::new(config().channels, 16);
    let mut observer = live.attach("ai1").unwrap();

    let worker = AcquisitionLoop::new(Box::new(source), &config(), channel.producer(), token.clone())
        .with_live(live)
        .with_idle_backoff(Duration::from_micros(100));
    let handle = thread::spawn(move || worker.run());

    let consumer = channel.consumer();
    consumer.get().unwrap();
    consumer.get().unwrap();
    token.signal();
    handle.join().unwrap().unwrap();

    assert_eq!(observer.poll(), vec![0.0, -1.0, -2.0, -3.0]);
}
