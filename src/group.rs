//! Splitting a bound samplesheet into one samplesheet per override cycles value.

use std::collections::{BTreeMap, BTreeSet};

use crate::sample::BoundSample;
use crate::samplesheet::SampleSheet;

/// File name of the samplesheet holding one override cycles group
pub fn group_file_name(override_cycles: &str) -> String {
    format!("SampleSheet.{}.csv", override_cycles.replace(';', "_"))
}

/// Partition the samples (and their `[Data]` rows) by override cycles.
///
/// Each group is an independent copy of the whole sheet with
/// `[Settings] OverrideCycles` set to the group's value. Samples without
/// override cycles end up in no group.
pub fn group_by_override_cycles(samplesheet: &SampleSheet<BoundSample>) -> BTreeMap<String, SampleSheet<BoundSample>> {
    let mut values = BTreeSet::new();
    for bound in samplesheet.samples() {
        match &bound.override_cycles {
            Some(oc) => {
                values.insert(oc.as_str());
            }
            None => warn!(
                "Sample {} has no override cycles and is left out of all groups",
                bound.sample.unique_id
            ),
        }
    }

    let mut groups = BTreeMap::new();
    for value in values {
        let mut group = samplesheet.clone();
        group.retain_samples(|s| s.override_cycles.as_ref().map(|oc| oc.as_str()) == Some(value));
        assert!(!group.is_empty(), "override cycles group {} is empty", value);
        group.settings.insert("OverrideCycles", value);
        info!("Override cycles {}: {} samples", value, group.len());
        groups.insert(value.to_string(), group);
    }
    groups
}

/// Group and serialize, keyed by override cycles value
pub fn group_texts(samplesheet: &SampleSheet<BoundSample>) -> BTreeMap<String, String> {
    group_by_override_cycles(samplesheet)
        .into_iter()
        .map(|(oc, group)| (oc, group.to_string()))
        .collect()
}
