use daqstream::core::{DaqError, SampleBlock};
use daqstream::engine::{SampleChannel, TryPutError};
use std::thread;
use std::time::Duration;
use tokio::time::timeout;

fn block(value: f64) -> SampleBlock {
    SampleBlock::single(vec![value])
}

#[test]
fn test_blocks_leave_in_order() {
    let channel = SampleChannel::bounded(8);
    let producer = channel.producer();
    let consumer = channel.consumer();

    for i in 0..5 {
        producer.put(block(i as f64)).unwrap();
    }
    let received: Vec<f64> = (0..5).map(|_| consumer.get().unwrap().channels()[0][0]).collect();
    assert_eq!(received, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    assert!(consumer.is_empty());
}

#[test]
fn test_full_channel_refuses_try_put() {
    let channel = SampleChannel::bounded(2);
    let producer = channel.producer();

    producer.try_put(block(0.0)).unwrap();
    producer.try_put(block(1.0)).unwrap();
    assert!(producer.is_full());

    match producer.try_put(block(2.0)) {
        Err(TryPutError::Full(returned)) => assert_eq!(returned.channels()[0][0], 2.0),
        other => panic!("expected Full, got {:?}", other),
    }
    assert_eq!(channel.len(), 2);
}

#[tokio::test]
async fn test_put_blocks_until_consumer_takes_one() {
    let channel = SampleChannel::bounded(2);
    let producer = channel.producer();
    let consumer = channel.consumer();
    producer.put(block(0.0)).unwrap();
    producer.put(block(1.0)).unwrap();

    let blocked = tokio::task::spawn_blocking(move || producer.put(block(2.0)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished(), "put should wait while the channel is full");

    assert_eq!(consumer.get().unwrap().channels()[0][0], 0.0);
    let result = timeout(Duration::from_secs(2), blocked).await;
    assert!(result.expect("put never unblocked").unwrap().is_ok());
    assert_eq!(consumer.len(), 2);
}

#[test]
fn test_consumer_drains_before_reporting_closed() {
    let channel = SampleChannel::bounded(4);
    let producer = channel.producer();
    let consumer = channel.consumer();
    drop(channel);

    producer.put(block(7.0)).unwrap();
    drop(producer);

    assert_eq!(consumer.get().unwrap().channels()[0][0], 7.0);
    assert!(matches!(consumer.get(), Err(DaqError::ChannelClosed)));
}

#[test]
fn test_put_fails_once_consumers_are_gone() {
    let channel = SampleChannel::bounded(1);
    let producer = channel.producer();
    drop(channel);

    assert!(matches!(producer.put(block(0.0)), Err(DaqError::ChannelClosed)));
    assert!(matches!(producer.try_put(block(0.0)), Err(TryPutError::Closed(_))));
}

#[test]
fn test_producer_thread_hands_over_every_block() {
    let channel = SampleChannel::bounded(1);
    let producer = channel.producer();
    let consumer = channel.consumer();
    drop(channel);

    let worker = thread::spawn(move || {
        for i in 0..100 {
            producer.put(block(i as f64)).unwrap();
        }
    });

    let mut received = Vec::new();
    while let Ok(b) = consumer.get() {
        received.push(b.channels()[0][0]);
    }
    worker.join().unwrap();

    assert_eq!(received, (0..100).map(|i| i as f64).collect::<Vec<_>>());
}
