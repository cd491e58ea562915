//! Detection of indexes that are too similar to be demultiplexed within one lane.

use itertools::Itertools;

use crate::config::CheckConfig;
use crate::error::{IndexClash, SimilarIndexError};
use crate::sample::Sample;
use crate::samplesheet::SampleSheet;

/// Number of differing positions after cutting both indexes to the shorter length
pub fn index_mismatches(first: &str, second: &str) -> usize {
    first
        .bytes()
        .zip(second.bytes())
        .filter(|(a, b)| a != b)
        .count()
}

/// Whether two indexes are too close to each other to be told apart
pub fn too_similar(first: &str, second: &str, min_distance: usize) -> bool {
    let similar = index_mismatches(first, second) < min_distance;
    if similar {
        debug!("Indexes {} and {} are too similar", first, second);
    }
    similar
}

/// Compare one pair of samples, `Some` if they clash.
///
/// Similar i7 indexes are tolerated as long as both samples have i5 indexes
/// that are different enough.
pub fn compare_samples(a: &Sample, b: &Sample, min_distance: usize) -> Option<IndexClash> {
    if a.unique_id == b.unique_id {
        return None;
    }
    let i7_clash = too_similar(&a.index, &b.index, min_distance);
    if !i7_clash {
        return None;
    }

    let index2 = match (&a.index2, &b.index2) {
        (Some(a2), Some(b2)) => {
            if !too_similar(a2, b2, min_distance) {
                debug!(
                    "i7 indexes {} and {} are too similar but i5 indexes {} and {} tell them apart",
                    a.index, b.index, a2, b2
                );
                return None;
            }
            Some((a2.clone(), b2.clone()))
        }
        _ => None,
    };

    Some(IndexClash {
        lane: a.lane,
        first: a.unique_id.clone(),
        second: b.unique_id.clone(),
        index: (a.index.clone(), b.index.clone()),
        index2,
    })
}

/// Compare every pair of samples sharing a lane. All clashing pairs are reported at once.
pub fn detect_index_clashes<S: AsRef<Sample>>(
    samplesheet: &SampleSheet<S>,
    config: &CheckConfig,
) -> Result<(), SimilarIndexError> {
    debug!("Checking SampleSheet for index clashes");
    let mut clashes = Vec::new();

    for lane in samplesheet.get_lanes() {
        let in_lane: Vec<&Sample> = samplesheet
            .samples()
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| s.lane == lane)
            .collect();

        for (a, b) in in_lane.into_iter().tuple_combinations() {
            if let Some(clash) = compare_samples(a, b, config.min_index_distance) {
                error!("Indexes too similar to run in the same lane: {}", clash);
                clashes.push(clash);
            }
        }
    }

    if clashes.is_empty() {
        Ok(())
    } else {
        Err(SimilarIndexError { clashes })
    }
}
