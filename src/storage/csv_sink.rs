use crate::core::{ChannelSet, DaqError, DaqResult, SampleBlock};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only CSV file of timestamped rows.
///
/// Layout: `time,<ch0>,<ch1>,...` once at the top, then one line per sample
/// index. The timestamp of row `k` is `k / sampling_rate`, where `k` counts
/// every data row in the file, including rows from earlier runs.
pub struct CsvSink {
    path: PathBuf,
    writer: BufWriter<File>,
    num_channels: usize,
    sampling_rate_hz: f64,
    /// Data rows already in the file when it was opened
    rows_before: u64,
    rows_written: u64,
    row: Vec<f64>,
}

impl CsvSink {
    /// Open `path` for append, creating it (and its directory) if needed.
    ///
    /// The header is written only into an empty file. A non-empty file must
    /// already carry the header for `channels`.
    pub fn open(path: impl AsRef<Path>, channels: &ChannelSet, sampling_rate_hz: u32) -> DaqResult<Self> {
        if sampling_rate_hz == 0 {
            return Err(DaqError::config("sampling rate must be positive"));
        }

        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let header = channels.header().join(",");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let existing_len = file.metadata()?.len();
        let mut writer = BufWriter::new(file);
        let mut rows_before = 0;

        if existing_len == 0 {
            writeln!(writer, "{}", header)?;
            writer.flush()?;
            log::info!("Saving samples in '{}'", path.display());
        } else {
            let (found, rows) = read_existing(&path)?;
            if found != header {
                return Err(DaqError::HeaderMismatch {
                    expected: header,
                    found,
                });
            }
            rows_before = rows;
            log::info!(
                "Appending samples to '{}' ({} rows already present)",
                path.display(),
                rows
            );
        }

        Ok(Self {
            path,
            writer,
            num_channels: channels.len(),
            sampling_rate_hz: f64::from(sampling_rate_hz),
            rows_before,
            rows_written: 0,
            row: Vec::with_capacity(channels.len()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows appended through this sink
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Data rows in the file, earlier runs included
    pub fn total_rows(&self) -> u64 {
        self.rows_before + self.rows_written
    }

    /// Timestamp the next row will carry
    pub fn next_timestamp(&self) -> f64 {
        self.total_rows() as f64 / self.sampling_rate_hz
    }

    /// Write one row: the next timestamp, then one value per channel
    pub fn write_row(&mut self, values: &[f64]) -> DaqResult<()> {
        if values.len() != self.num_channels {
            return Err(DaqError::MalformedBlock(format!(
                "row has {} values, sink has {} channels",
                values.len(),
                self.num_channels
            )));
        }

        write!(self.writer, "{:.6}", self.next_timestamp())?;
        for value in values {
            write!(self.writer, ",{}", value)?;
        }
        writeln!(self.writer)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Transpose a channel-major block into rows and append them.
    /// Returns the number of rows written.
    pub fn append_block(&mut self, block: &SampleBlock) -> DaqResult<usize> {
        if block.num_channels() != self.num_channels {
            return Err(DaqError::MalformedBlock(format!(
                "block has {} channels, sink has {}",
                block.num_channels(),
                self.num_channels
            )));
        }

        let mut row = std::mem::take(&mut self.row);
        let rows = block.samples_per_channel();
        let result = (0..rows).try_for_each(|n| {
            block.fill_row(n, &mut row);
            self.write_row(&row)
        });
        self.row = row;
        result.map(|_| rows)
    }

    pub fn flush(&mut self) -> DaqResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Size on disk after flushing buffered rows
    pub fn size_bytes(&mut self) -> DaqResult<u64> {
        self.flush()?;
        Ok(self.writer.get_ref().metadata()?.len())
    }

    /// Flush and close, returning the final file size
    pub fn finish(mut self) -> DaqResult<u64> {
        let size = self.size_bytes()?;
        self.writer.get_ref().sync_all()?;
        Ok(size)
    }
}

/// Header line and number of non-empty data rows of an existing file
fn read_existing(path: &Path) -> DaqResult<(String, u64)> {
    let mut lines = BufReader::new(File::open(path)?).lines();
    let header = match lines.next() {
        Some(line) => line?.trim_end_matches('\r').to_string(),
        None => String::new(),
    };

    let mut rows = 0;
    for line in lines {
        if !line?.trim().is_empty() {
            rows += 1;
        }
    }
    Ok((header, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_timestamps_count_from_open() {
        let dir = tempdir().unwrap();
        let channels = ChannelSet::new(["ai0"]).unwrap();
        let mut sink = CsvSink::open(dir.path().join("t.csv"), &channels, 4).unwrap();

        assert_eq!(sink.next_timestamp(), 0.0);
        sink.write_row(&[1.0]).unwrap();
        sink.write_row(&[2.0]).unwrap();
        assert_eq!(sink.next_timestamp(), 0.5);
    }

    #[test]
    fn test_reopened_sink_continues_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let channels = ChannelSet::new(["ai0"]).unwrap();

        let mut first = CsvSink::open(&path, &channels, 10).unwrap();
        first.write_row(&[1.0]).unwrap();
        first.write_row(&[2.0]).unwrap();
        first.finish().unwrap();

        let mut second = CsvSink::open(&path, &channels, 10).unwrap();
        assert_eq!(second.rows_written(), 0);
        assert_eq!(second.total_rows(), 2);
        second.write_row(&[3.0]).unwrap();
        second.finish().unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "time,ai0\n0.000000,1\n0.100000,2\n0.200000,3\n"
        );
    }

    #[test]
    fn test_rejects_row_of_wrong_width() {
        let dir = tempdir().unwrap();
        let channels = ChannelSet::new(["ai0", "ai1"]).unwrap();
        let mut sink = CsvSink::open(dir.path().join("t.csv"), &channels, 10).unwrap();

        assert!(sink.write_row(&[1.0]).is_err());
        assert_eq!(sink.rows_written(), 0);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("nested").join("m.csv");
        let channels = ChannelSet::new(["ai0"]).unwrap();

        let sink = CsvSink::open(&path, &channels, 10).unwrap();
        drop(sink);

        assert_eq!(fs::read_to_string(&path).unwrap(), "time,ai0\n");
    }
}
