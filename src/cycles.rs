//! Override cycles, e.g. `Y151;I8N2;I8N2;Y151`, and the checks run on them.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{CountGroup, OverrideCyclesError, PositionMismatch};
use crate::sample::BoundSample;
use crate::samplesheet::SampleSheet;

lazy_static! {
    static ref RE_CYCLES: Regex = Regex::new(r"([INYU])(\d*)").unwrap();
    static ref RE_CYCLES_FULL: Regex = Regex::new(r"^(?:[INYU]+\d*)+$").unwrap();
    static ref RE_INDEX: Regex = Regex::new(r"^I(\d*)").unwrap();
}

/// Semicolon-delimited read/index sections of one sample
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverrideCycles(String);

// a token without a count stands for a single cycle
fn token_cycles(count: &str) -> u32 {
    if count.is_empty() {
        1
    } else {
        count.parse().unwrap_or_else(|e| {
            error!("Couldn't interpret override cycles count {}: {}", count, e);
            u32::MAX
        })
    }
}

impl OverrideCycles {
    /// `None` for blank values
    pub fn new(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            None
        } else {
            Some(OverrideCycles(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.0.split(';')
    }

    /// Sum of all `<letter><count>` tokens per section: `Y151;I8N2` gives `[151, 10]`
    pub fn read_cycle_counts(&self) -> Vec<u32> {
        self.sections()
            .map(|section| {
                if !RE_CYCLES_FULL.is_match(section) {
                    error!("Couldn't interpret override cycles section {} from {}", section, self.0);
                }
                RE_CYCLES
                    .captures_iter(section)
                    .map(|c| token_cycles(&c[2]))
                    .fold(0u32, |acc, n| acc.saturating_add(n))
            })
            .collect()
    }

    /// Length of the leading `I` run of every index section, in order
    pub fn index_lengths(&self) -> Vec<u32> {
        self.sections()
            .filter_map(|section| RE_INDEX.captures(section).map(|c| token_cycles(&c[1])))
            .collect()
    }
}

impl fmt::Display for OverrideCycles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn non_n_length(index: &str) -> u32 {
    index.chars().filter(|c| *c != 'N').count() as u32
}

/// Compare each sample's override cycles with the length of its own indexes.
///
/// Disagreements are only warnings, the returned messages are the ones logged.
pub fn check_internal_override_cycles(samplesheet: &SampleSheet<BoundSample>) -> Vec<String> {
    let mut warnings = Vec::new();
    for bound in samplesheet.samples() {
        let sample = &bound.sample;
        let oc = match &bound.override_cycles {
            Some(oc) => oc,
            None => {
                warnings.push(format!("Could not find override cycles for sample \"{}\"", sample.unique_id));
                continue;
            }
        };

        let index_lengths = oc.index_lengths();
        if let Some(i7_cycles) = index_lengths.get(0) {
            if non_n_length(&sample.index) != *i7_cycles {
                warnings.push(format!(
                    "Sample '{}' override cycle value '{}' does not match sample i7 '{}'",
                    sample.sample_id, oc, sample.index
                ));
            }
        }
        if let (Some(i5_cycles), Some(index2)) = (index_lengths.get(1), &sample.index2) {
            if non_n_length(index2) != *i5_cycles {
                warnings.push(format!(
                    "Sample '{}' override cycle value '{}' does not match sample i5 '{}'",
                    sample.sample_id, oc, index2
                ));
            }
        }
        if index_lengths.len() == 1 {
            if let Some(index2) = &sample.index2 {
                warnings.push(format!(
                    "Override cycles '{}' suggests only one index but sample '{}' has a second index '{}'",
                    oc, sample.sample_id, index2
                ));
            }
        }
    }

    for w in &warnings {
        warn!("{}", w);
    }
    warnings
}

fn count_groups<I: IntoIterator<Item = (u32, String)>>(values: I) -> Vec<CountGroup> {
    let mut groups: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    for (value, sample) in values {
        groups.entry(value).or_default().push(sample);
    }
    groups
        .into_iter()
        .map(|(value, samples)| CountGroup { value, samples })
        .collect()
}

/// Check that every sample agrees on the number of read/index sections and on the
/// summed cycle count of each section. Returns the per-section cycle counts.
pub fn check_global_override_cycles(
    samplesheet: &SampleSheet<BoundSample>,
) -> Result<Vec<u32>, OverrideCyclesError> {
    let counted: Vec<(&str, Vec<u32>)> = samplesheet
        .samples()
        .iter()
        .filter_map(|s| {
            if s.override_cycles.is_none() {
                warn!("Could not find override cycles for sample \"{}\"", s.sample.unique_id);
            }
            s.override_cycles
                .as_ref()
                .map(|oc| (s.sample.unique_id.as_str(), oc.read_cycle_counts()))
        })
        .collect();

    if counted.is_empty() {
        error!("Found no override cycles matches");
        return Err(OverrideCyclesError::NoOverrideCycles);
    }

    // 1/2: same number of sections everywhere
    let section_counts = count_groups(
        counted
            .iter()
            .map(|(id, counts)| (counts.len() as u32, id.to_string())),
    );
    if section_counts.len() > 1 {
        error!("Found an error with override cycles matches");
        for g in &section_counts {
            error!(
                "The following samples have {} read/index sections: {}",
                g.value,
                g.samples.join(", ")
            );
        }
        return Err(OverrideCyclesError::SectionCount { groups: section_counts });
    }
    let num_sections = counted[0].1.len();
    info!(
        "Override cycles check 1/2 complete - All samples have the correct number of override cycles sections - {}",
        num_sections
    );

    // 2/2: identical cycles per section
    let mut section_cycle_counts = Vec::with_capacity(num_sections);
    let mut mismatches = Vec::new();
    for position in 0..num_sections {
        let groups = count_groups(
            counted
                .iter()
                .map(|(id, counts)| (counts[position], id.to_string())),
        );
        if groups.len() > 1 {
            error!("Found an error with override cycles matches for read/index section {}", position + 1);
            for g in &groups {
                error!("CycleCount: {} Samples: {}", g.value, g.samples.join(", "));
            }
            mismatches.push(PositionMismatch { position, groups });
        } else {
            section_cycle_counts.push(groups[0].value);
        }
    }
    if !mismatches.is_empty() {
        return Err(OverrideCyclesError::CycleCount { mismatches });
    }

    info!(
        "Override cycles check 2/2 complete - All samples have the identical number of cycles per section - \"{}\"",
        section_cycle_counts.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
    );
    Ok(section_cycle_counts)
}
