use std::fmt;

use serde::{Deserialize, Serialize};

use crate::chrom_list::ChromList;
use crate::int_range::IntRange;

/// The structure represents a contiguous region of the genome on a single chromosome
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GenomeSegment {
    /// chrom_index is defined by the chromosome list stored in the graph header
    pub chrom_index: usize,
    pub range: IntRange,
}

impl GenomeSegment {
    pub fn new(chrom_index: usize, start: i64, end: i64) -> Self {
        Self {
            chrom_index,
            range: IntRange::from_pair(start, end),
        }
    }

    pub fn intersect(&self, other: &Self) -> bool {
        self.chrom_index == other.chrom_index && self.range.intersect_range(&other.range)
    }

    /// Return true if this segment covers all of `other`
    pub fn is_superset_of(&self, other: &Self) -> bool {
        self.chrom_index == other.chrom_index && self.range.is_superset_of(&other.range)
    }

    /// Expand this segment to cover `other`, which must be on the same chromosome
    pub fn merge(&mut self, other: &Self) {
        assert_eq!(
            self.chrom_index, other.chrom_index,
            "Can't merge genome segments from different chromosomes"
        );
        self.range.merge(&other.range);
    }

    pub fn size(&self) -> i64 {
        self.range.size()
    }
}

impl fmt::Debug for GenomeSegment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{:?}", self.chrom_index, self.range)
    }
}

/// Convert from a string in 'samtools' region format (e.g. chr20:100-200) to a tuple of
/// (chrom_index, start, end)
/// ...where start and end are converted to the zero-indexed half-open convention used for bed
///
/// Commas will be stripped out of coordinates if present
///
pub fn parse_samtools_region_string(chrom_list: &ChromList, str: &str) -> (usize, i64, i64) {
    let s1 = str.split(':').collect::<Vec<_>>();
    let s1l = s1.len();
    assert!(
        s1l > 0 && s1l < 3,
        "Unexpected format in genome region string {}",
        str
    );
    let chrom_index = match chrom_list.index_of(s1[0]) {
        Some(x) => x,
        None => {
            panic!("Can't find chromosome '{}' in graph file header", s1[0]);
        }
    };
    let chrom_size = chrom_list.data[chrom_index].length as i64;
    let (start, end) = if s1l == 1 {
        (0, chrom_size)
    } else {
        let s2 = s1[1].split('-').collect::<Vec<_>>();
        let s2l = s2.len();
        assert!(
            s2l > 0 && s2l < 3,
            "Unexpected format in genome region string {}",
            str
        );
        let s2 = s2
            .into_iter()
            .map(|s| {
                let mut s = String::from(s);
                s.retain(|c| c != ',');
                s
            })
            .collect::<Vec<_>>();
        let start = s2[0].parse::<i64>().unwrap() - 1;
        if s2l == 1 {
            (start, chrom_size)
        } else {
            let end = s2[1].parse::<i64>().unwrap();
            (start, end)
        }
    };
    (chrom_index, start, end)
}
