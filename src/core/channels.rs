use super::{DaqError, DaqResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ordered, deduplicated set of hardware channel identifiers (e.g. "ai0").
///
/// Identifiers are kept in lexicographic order regardless of the order they
/// were supplied in. The order defines the block layout and the CSV columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ChannelSet {
    ids: Vec<String>,
}

impl ChannelSet {
    pub fn new<I, S>(ids: I) -> DaqResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique = BTreeSet::new();
        for id in ids {
            let id = id.into().trim().to_string();
            validate_channel_id(&id)?;
            unique.insert(id);
        }

        if unique.is_empty() {
            return Err(DaqError::config("at least one input channel is required"));
        }

        Ok(Self {
            ids: unique.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Position of a channel within a block (binary search, ids are sorted)
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.ids.binary_search_by(|probe| probe.as_str().cmp(id)).ok()
    }

    /// Fully qualified physical names, e.g. "/Dev1/ai0"
    pub fn physical_names(&self, device: &str) -> Vec<String> {
        self.ids.iter().map(|id| physical_name(device, id)).collect()
    }

    /// CSV header fields: "time" followed by every channel id
    pub fn header(&self) -> Vec<String> {
        std::iter::once("time".to_string())
            .chain(self.ids.iter().cloned())
            .collect()
    }
}

pub fn physical_name(device: &str, channel: &str) -> String {
    format!("/{}/{}", device.trim_matches('/'), channel)
}

/// Channel ids end up as CSV columns, so separators and whitespace are rejected.
pub fn validate_channel_id(id: &str) -> DaqResult<()> {
    if id.is_empty() {
        return Err(DaqError::config("channel id must not be empty"));
    }
    if id.chars().any(|c| c == ',' || c == '"' || c.is_whitespace()) {
        return Err(DaqError::config(format!("invalid channel id '{}'", id)));
    }
    Ok(())
}

impl TryFrom<Vec<String>> for ChannelSet {
    type Error = DaqError;

    fn try_from(ids: Vec<String>) -> DaqResult<Self> {
        ChannelSet::new(ids)
    }
}

impl From<ChannelSet> for Vec<String> {
    fn from(set: ChannelSet) -> Self {
        set.ids
    }
}

impl fmt::Display for ChannelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.ids.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_follows_sorted_order() {
        let set = ChannelSet::new(["ai4", "ai0", "ai2"]).unwrap();
        assert_eq!(set.index_of("ai0"), Some(0));
        assert_eq!(set.index_of("ai4"), Some(2));
        assert_eq!(set.index_of("ai1"), None);
    }

    #[test]
    fn test_physical_names() {
        let set = ChannelSet::new(["ai1", "ai0"]).unwrap();
        assert_eq!(set.physical_names("Dev1"), vec!["/Dev1/ai0", "/Dev1/ai1"]);
        assert_eq!(physical_name("/Dev2/", "ai3"), "/Dev2/ai3");
    }
}
