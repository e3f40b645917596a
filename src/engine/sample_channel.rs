use crate::core::{DaqError, DaqResult, SampleBlock};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Why a non-blocking put did not go through. The block is handed back.
#[derive(Debug)]
pub enum TryPutError {
    Full(SampleBlock),
    Closed(SampleBlock),
}

/// Bounded FIFO of sample blocks between the acquisition and persistence workers.
///
/// `put` blocks while `capacity` blocks are outstanding, `get` blocks while
/// empty. Blocks leave in the order they entered. `get` is destructive, so
/// each channel has exactly one logical consumer.
#[derive(Clone)]
pub struct SampleChannel {
    tx: Sender<SampleBlock>,
    rx: Receiver<SampleBlock>,
    capacity: usize,
}

impl SampleChannel {
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    pub fn producer(&self) -> BlockProducer {
        BlockProducer {
            tx: self.tx.clone(),
        }
    }

    pub fn consumer(&self) -> BlockConsumer {
        BlockConsumer {
            rx: self.rx.clone(),
        }
    }

    pub fn put(&self, block: SampleBlock) -> DaqResult<()> {
        self.tx.send(block).map_err(|_| DaqError::ChannelClosed)
    }

    pub fn get(&self) -> DaqResult<SampleBlock> {
        self.rx.recv().map_err(|_| DaqError::ChannelClosed)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Blocks currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Sending end handed to the acquisition worker
#[derive(Clone)]
pub struct BlockProducer {
    tx: Sender<SampleBlock>,
}

impl BlockProducer {
    /// Blocking send; fails only once every receiving end is gone
    pub fn put(&self, block: SampleBlock) -> DaqResult<()> {
        self.tx.send(block).map_err(|_| DaqError::ChannelClosed)
    }

    pub fn try_put(&self, block: SampleBlock) -> Result<(), TryPutError> {
        self.tx.try_send(block).map_err(|e| match e {
            TrySendError::Full(b) => TryPutError::Full(b),
            TrySendError::Disconnected(b) => TryPutError::Closed(b),
        })
    }

    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }
}

/// Receiving end handed to the persistence worker
#[derive(Clone)]
pub struct BlockConsumer {
    rx: Receiver<SampleBlock>,
}

impl BlockConsumer {
    /// Blocking receive. `ChannelClosed` once every sending end is gone and
    /// the queue is drained.
    pub fn get(&self) -> DaqResult<SampleBlock> {
        self.rx.recv().map_err(|_| DaqError::ChannelClosed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
