use super::{DaqError, DaqResult};

/// One hardware read worth of samples, channel-major.
///
/// `channels[c][n]` is sample `n` of channel `c`. Every channel holds the same
/// number of samples; single-channel reads are still one inner sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBlock {
    channels: Vec<Vec<f64>>,
}

impl SampleBlock {
    pub fn new(channels: Vec<Vec<f64>>) -> DaqResult<Self> {
        let Some(first) = channels.first() else {
            return Err(DaqError::MalformedBlock("block has no channels".to_string()));
        };

        let expected = first.len();
        if let Some((idx, ch)) = channels
            .iter()
            .enumerate()
            .find(|(_, ch)| ch.len() != expected)
        {
            return Err(DaqError::MalformedBlock(format!(
                "channel {} holds {} samples, channel 0 holds {}",
                idx,
                ch.len(),
                expected
            )));
        }

        Ok(Self { channels })
    }

    /// Single-channel block
    pub fn single(samples: Vec<f64>) -> Self {
        Self {
            channels: vec![samples],
        }
    }

    /// Split a buffer laid out channel after channel (DAQmx "group by channel").
    pub fn from_grouped(data: Vec<f64>, num_channels: usize) -> DaqResult<Self> {
        if num_channels == 0 || data.len() % num_channels != 0 {
            return Err(DaqError::MalformedBlock(format!(
                "{} samples cannot be split across {} channels",
                data.len(),
                num_channels
            )));
        }

        let per_channel = data.len() / num_channels;
        let channels = if per_channel == 0 {
            vec![Vec::new(); num_channels]
        } else {
            data.chunks(per_channel).map(<[f64]>::to_vec).collect()
        };
        Self::new(channels)
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn samples_per_channel(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    pub fn into_channels(self) -> Vec<Vec<f64>> {
        self.channels
    }

    /// Copy sample `n` of every channel into `row`, replacing its contents.
    pub fn fill_row(&self, n: usize, row: &mut Vec<f64>) {
        row.clear();
        row.extend(self.channels.iter().map(|ch| ch[n]));
    }

    /// Sample-major view: one row per sample index, one value per channel.
    pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.samples_per_channel()).map(move |n| self.channels.iter().map(|ch| ch[n]).collect())
    }
}
