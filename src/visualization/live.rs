use crate::core::{ChannelSet, DaqError, DaqResult, SampleBlock};
use crate::observability::PipelineMetrics;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Chunks an observer may fall behind by before new ones are dropped
pub const DEFAULT_OBSERVER_DEPTH: usize = 32;

/// Refresh period for live plots: the time one read spans, in whole milliseconds.
///
/// `1000 / (sampling_rate / samples_per_read)`, at least 1 ms.
pub fn poll_interval(sampling_rate_hz: u32, samples_per_read: usize) -> Duration {
    let rate = f64::from(sampling_rate_hz.max(1));
    let millis = 1000.0 / (rate / samples_per_read.max(1) as f64);
    Duration::from_millis(millis.round().max(1.0) as u64)
}

/// Read side of one live channel view.
///
/// Each observer owns its own queue, so draining it never takes samples away
/// from persistence or from other observers. Dropping the observer detaches it.
pub struct ChannelObserver {
    channel_id: String,
    rx: Receiver<Arc<Vec<f64>>>,
    window: VecDeque<f64>,
    window_len: usize,
}

impl ChannelObserver {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Pull every pending chunk into the window and return the latest samples,
    /// oldest first
    pub fn poll(&mut self) -> Vec<f64> {
        while let Ok(chunk) = self.rx.try_recv() {
            self.window.extend(chunk.iter().copied());
        }
        while self.window.len() > self.window_len {
            self.window.pop_front();
        }
        self.window.iter().copied().collect()
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }
}

struct ObserverSlot {
    index: usize,
    tx: Sender<Arc<Vec<f64>>>,
}

/// Fan-out of acquired blocks to per-channel observers.
///
/// Observers exist only for channels currently selected for display and are
/// created and destroyed with that selection. Publishing never blocks the
/// acquisition worker: a full observer queue drops the newest chunk.
#[derive(Clone)]
pub struct LiveMonitor {
    channels: ChannelSet,
    slots: Arc<Mutex<HashMap<String, ObserverSlot>>>,
    depth: usize,
    window_len: usize,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl LiveMonitor {
    pub fn new(channels: ChannelSet, window_len: usize) -> Self {
        Self {
            channels,
            slots: Arc::new(Mutex::new(HashMap::new())),
            depth: DEFAULT_OBSERVER_DEPTH,
            window_len: window_len.max(1),
            metrics: None,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ObserverSlot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start observing a channel. Replaces an earlier observer of the same channel.
    pub fn attach(&self, channel_id: &str) -> DaqResult<ChannelObserver> {
        let index = self.channels.index_of(channel_id).ok_or_else(|| {
            DaqError::config(format!(
                "channel '{}' is not part of the acquisition {}",
                channel_id, self.channels
            ))
        })?;

        let (tx, rx) = bounded(self.depth);
        self.lock()
            .insert(channel_id.to_string(), ObserverSlot { index, tx });

        Ok(ChannelObserver {
            channel_id: channel_id.to_string(),
            rx,
            window: VecDeque::with_capacity(self.window_len),
            window_len: self.window_len,
        })
    }

    /// Stop feeding a channel. Returns false if it was not observed.
    pub fn detach(&self, channel_id: &str) -> bool {
        self.lock().remove(channel_id).is_some()
    }

    /// Make the observed set equal to `selection`: new observers for newly
    /// selected channels, removal of deselected ones. Returns the new observers.
    pub fn sync_selection<S: AsRef<str>>(&self, selection: &[S]) -> DaqResult<Vec<ChannelObserver>> {
        let wanted: Vec<&str> = selection.iter().map(AsRef::as_ref).collect();

        let stale: Vec<String> = self
            .lock()
            .keys()
            .filter(|id| !wanted.contains(&id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            self.detach(&id);
        }

        let mut created = Vec::new();
        for id in wanted {
            if !self.is_observed(id) {
                created.push(self.attach(id)?);
            }
        }
        Ok(created)
    }

    pub fn is_observed(&self, channel_id: &str) -> bool {
        self.lock().contains_key(channel_id)
    }

    /// Sorted ids of observed channels
    pub fn observed_channels(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Copy each observed channel of `block` into its observer queue
    pub fn publish(&self, block: &SampleBlock) {
        let mut slots = self.lock();
        if slots.is_empty() {
            return;
        }

        slots.retain(|id, slot| {
            let Some(samples) = block.channel(slot.index) else {
                return true;
            };
            match slot.tx.try_send(Arc::new(samples.to_vec())) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    if let Some(metrics) = &self.metrics {
                        metrics.record_observer_drop();
                    }
                    true
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::debug!("Live observer for {} went away", id);
                    false
                }
            }
        });
    }
}
