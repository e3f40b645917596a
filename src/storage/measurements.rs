use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A recorded CSV file found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementFile {
    pub path: PathBuf,
    /// File name shown in selection lists
    pub label: String,
}

/// All `*.csv` files below `dir`, sorted by path. A missing directory yields
/// an empty list.
pub fn list_measurements(dir: impl AsRef<Path>) -> io::Result<Vec<MeasurementFile>> {
    let mut found = Vec::new();
    let dir = dir.as_ref();
    if dir.is_dir() {
        collect_csv(dir, &mut found)?;
    }
    found.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(found)
}

fn collect_csv(dir: &Path, found: &mut Vec<MeasurementFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_csv(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "csv") {
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            found.push(MeasurementFile { path, label });
        }
    }
    Ok(())
}

/// A recorded file loaded back into memory for after-the-fact plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Header fields, "time" first
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Measurement {
    pub fn channel_names(&self) -> &[String] {
        self.columns.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.iter().map(|r| r.get(idx).copied()).collect()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.first().copied()).collect()
    }
}

pub fn load_measurement(path: impl AsRef<Path>) -> Result<Measurement> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read measurement {}", path.display()))?;

    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| anyhow!("Measurement {} is empty", path.display()))?;
    let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
    if columns.first().map(String::as_str) != Some("time") || columns.len() < 2 {
        anyhow::bail!("Measurement {} has no time/channel header", path.display());
    }

    let rows = lines
        .enumerate()
        .map(|(i, line)| {
            let row = line
                .split(',')
                .map(|field| field.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .with_context(|| format!("Line {} of {} is not numeric", i + 2, path.display()))?;
            if row.len() != columns.len() {
                anyhow::bail!(
                    "Line {} of {} has {} fields, header has {}",
                    i + 2,
                    path.display(),
                    row.len(),
                    columns.len()
                );
            }
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Measurement { columns, rows })
}
