use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChromInfo {
    pub label: String,
    pub length: u64,
}

/// Ordered chromosome names and lengths, with reverse lookup from name to index
///
/// The chromosome index scheme defined here is used for every genome segment in the graph, so two
/// graphs can only be merged when their chromosome lists match.
///
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,

    #[serde(skip)]
    label_to_index: HashMap<String, usize>,
}

impl ChromList {
    pub fn add_chrom(&mut self, label: &str, length: u64) {
        assert!(
            !self.label_to_index.contains_key(label),
            "Attempted to add duplicate chromosome label '{label}' to chromosome list"
        );
        self.label_to_index
            .insert(label.to_string(), self.data.len());
        self.data.push(ChromInfo {
            label: label.to_string(),
            length,
        });
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.label_to_index.get(label).copied()
    }

    /// Restore the name lookup table after deserialization
    pub fn rebuild_lookup(&mut self) {
        self.label_to_index = self
            .data
            .iter()
            .enumerate()
            .map(|(chrom_index, info)| (info.label.clone(), chrom_index))
            .collect();
    }
}

impl PartialEq for ChromList {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for ChromList {}
