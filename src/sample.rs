//! A single sequencer-facing sample row and the naming conventions it has to follow.
//!
//! `Sample_ID` values are composites of the internal sample id and the library id,
//! e.g. `MDX200001_L2000001`. Libraries sequenced again carry a `_topup` or `_rerun`
//! suffix (`MDX200001_L2000001_topup2`).

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::cycles::OverrideCycles;
use crate::error::FormatError;
use crate::metadata::MetadataRecord;

const SAMPLE_ID: &str = r"(?:(?:PRJ|CCR|MDX|TGX)\d{6}|(?:NTC|PTC)_\w+)";
const TOPUP: &str = r"(?:_topup\d?)";
const RERUN: &str = r"(?:_rerun\d?)";

lazy_static! {
    static ref LIBRARY_ID: String = format!(
        r"(?:L\d{{7}}|L{})(?:{}|{})?",
        SAMPLE_ID, TOPUP, RERUN
    );
    static ref RE_SAMPLE_ID: Regex = Regex::new(&format!("^{}$", SAMPLE_ID)).unwrap();
    static ref RE_LIBRARY_ID: Regex = Regex::new(&format!("^{}$", *LIBRARY_ID)).unwrap();
    static ref RE_UNIQUE_ID: Regex =
        Regex::new(&format!("^({})_({})", SAMPLE_ID, *LIBRARY_ID)).unwrap();
    static ref RE_UNIQUE_ID_FULL: Regex =
        Regex::new(&format!("^{}_{}$", SAMPLE_ID, *LIBRARY_ID)).unwrap();
    static ref RE_TOPUP: Regex = Regex::new(TOPUP).unwrap();
    static ref RE_EXPERIMENT: Regex = Regex::new(&format!("{}|{}", TOPUP, RERUN)).unwrap();
    static ref RE_YEAR: Regex = Regex::new(r"^\D*(\d{2})").unwrap();
}

/// Remove a `_topup` suffix, leaving reruns untouched
pub fn strip_topup(id: &str) -> String {
    RE_TOPUP.replace_all(id, "").into_owned()
}

fn strip_experiment_suffix(id: &str) -> String {
    RE_EXPERIMENT.replace_all(id, "").into_owned()
}

/// Sample on the sequencer, one per `[Data]` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Raw `Sample_ID`
    pub unique_id: String,
    pub sample_name: String,
    /// i7 index, trailing no-calls removed
    pub index: String,
    /// i5 index, `None` on single-indexed sheets
    pub index2: Option<String>,
    pub lane: u32,
    pub project: Option<String>,
    pub sample_id: String,
    pub library_id: String,
    pub year: String,
}

impl Sample {
    /// Construct a sample and run all naming checks, failing on the first violation.
    ///
    /// An empty `index2` is treated as absent.
    pub fn new(
        unique_id: &str,
        sample_name: &str,
        index: &str,
        index2: Option<&str>,
        lane: u32,
        project: Option<&str>,
    ) -> Result<Self, FormatError> {
        let (sample_id, library_id) = split_unique_id(unique_id)?;

        if !RE_UNIQUE_ID_FULL.is_match(unique_id) {
            error!("Sample / Library ID {} did not match the expected regex", unique_id);
            return Err(FormatError::SampleNameFormat(format!(
                "{} is not a sample id followed by a library id",
                unique_id
            )));
        }

        check_sample_name(unique_id, &sample_id, sample_name)?;

        if !RE_SAMPLE_ID.is_match(&sample_id) {
            error!("Sample ID {} did not match the expected regex", sample_id);
            return Err(FormatError::SampleNameFormat(format!(
                "sample id {} does not match the expected format",
                sample_id
            )));
        }
        if !RE_LIBRARY_ID.is_match(&library_id) {
            error!("Library ID {} did not match the expected regex", library_id);
            return Err(FormatError::SampleNameFormat(format!(
                "library id {} does not match the expected format",
                library_id
            )));
        }

        let year = year_from_library_id(&library_id)?;

        Ok(Sample {
            unique_id: unique_id.to_string(),
            sample_name: sample_name.to_string(),
            index: index.to_string(),
            index2: index2.filter(|i| !i.is_empty()).map(|i| i.to_string()),
            lane,
            project: project.filter(|p| !p.is_empty()).map(|p| p.to_string()),
            sample_id,
            library_id,
            year,
        })
    }

    pub fn is_topup(&self) -> bool {
        RE_TOPUP.is_match(&self.library_id)
    }

    /// Library id used to look the sample up in the metadata table
    pub fn lookup_library_id(&self) -> String {
        strip_topup(&self.library_id)
    }

    /// Rebuild the sample this top-up was sequenced from. Indexes are not carried over.
    pub fn original(&self) -> Result<Sample, FormatError> {
        Sample::new(
            &strip_topup(&self.unique_id),
            &self.sample_name,
            "",
            None,
            self.lane,
            None,
        )
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.unique_id)
    }
}

impl AsRef<Sample> for Sample {
    fn as_ref(&self) -> &Sample {
        self
    }
}

/// A sample joined to exactly one metadata record.
///
/// Only bound samples carry override cycles, so the override-cycles checks
/// and grouping can only be run on a sheet of `BoundSample`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSample {
    pub sample: Sample,
    pub metadata: MetadataRecord,
    pub override_cycles: Option<OverrideCycles>,
}

impl BoundSample {
    pub fn new(sample: Sample, metadata: MetadataRecord) -> Self {
        let override_cycles = OverrideCycles::new(&metadata.override_cycles);
        BoundSample {
            sample,
            metadata,
            override_cycles,
        }
    }

    /// Summed cycles per read/index section, empty without override cycles
    pub fn read_cycle_counts(&self) -> Vec<u32> {
        self.override_cycles
            .as_ref()
            .map(|oc| oc.read_cycle_counts())
            .unwrap_or_default()
    }
}

impl AsRef<Sample> for BoundSample {
    fn as_ref(&self) -> &Sample {
        &self.sample
    }
}

/// Split `MDX200001_L2000001` into `("MDX200001", "L2000001")`
pub fn split_unique_id(unique_id: &str) -> Result<(String, String), FormatError> {
    match RE_UNIQUE_ID.captures(unique_id) {
        Some(c) => Ok((c[1].to_string(), c[2].to_string())),
        None => {
            error!("Could not split sample and library id from {}", unique_id);
            Err(FormatError::SampleNameFormat(format!(
                "could not split sample and library id from {}",
                unique_id
            )))
        }
    }
}

// Sample_Name has to be the tail of Sample_ID, ignoring topup/rerun suffixes
fn check_sample_name(unique_id: &str, sample_id: &str, sample_name: &str) -> Result<(), FormatError> {
    if sample_name.is_empty() {
        error!("Sample ID {} did not have corresponding Sample_Name", sample_id);
        return Err(FormatError::SampleNameFormat(format!(
            "sample {} has no Sample_Name",
            unique_id
        )));
    }
    let clean_unique_id = strip_experiment_suffix(unique_id);
    let clean_sample_name = strip_experiment_suffix(sample_name);
    if !clean_unique_id.ends_with(&clean_sample_name) {
        error!(
            "Sample_Name ({}) is not the libraryID defined in the Sample_ID ({}) format",
            sample_name, unique_id
        );
        return Err(FormatError::SampleNameFormat(format!(
            "Sample_Name {} does not match Sample_ID {}",
            sample_name, unique_id
        )));
    }
    Ok(())
}

/// `L2000001` was prepared in 2020
fn year_from_library_id(library_id: &str) -> Result<String, FormatError> {
    match RE_YEAR.captures(library_id) {
        Some(c) => Ok(format!("20{}", &c[1])),
        None => {
            error!("Could not get year from library ID \"{}\"", library_id);
            Err(FormatError::SampleNameFormat(format!(
                "could not get year from library id {}",
                library_id
            )))
        }
    }
}
