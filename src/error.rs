//! Error taxonomy of the checker.
//!
//! Structural and naming errors abort parsing on the first offence, metadata
//! lookups are collected across all samples before they are reported.

use std::fmt;

use itertools::join;

/// Errors raised while reading the samplesheet text or constructing samples
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// The first non-blank line was not a `[Section]` header
    #[error("Top line of samplesheet was not a section header: {0:?}")]
    MissingSectionHeader(String),

    /// A `[Section]` name outside of Header, Reads, Settings and Data
    #[error("Unknown samplesheet section [{0}]")]
    UnknownSection(String),

    #[error("Samplesheet section [{0}] appears more than once")]
    DuplicateSection(String),

    #[error("Samplesheet has no [Data] section")]
    MissingData,

    /// A required `[Data]` column is absent
    #[error("Could not find column \"{0}\" in samplesheet")]
    ColumnNotFound(String),

    /// A `[Data]` column that is not in the set of valid column names
    #[error("Column \"{0}\" is not a valid samplesheet column")]
    InvalidColumn(String),

    #[error("Row {row} of [Data] has {found} fields, expected {expected}")]
    RowLength { row: usize, found: usize, expected: usize },

    #[error("Sample {sample} has an invalid lane \"{lane}\"")]
    InvalidLane { sample: String, lane: String },

    /// Sample_ID, Sample_Name, sample id or library id do not follow the naming convention
    #[error("Sample name format error: {0}")]
    SampleNameFormat(String),

    #[error("Found two samples with the same id: '{0}'")]
    SampleDuplicate(String),

    #[error("Could not find sample {0} in samplesheet")]
    SampleNotFound(String),

    /// Keys that must be present in `[Header]` but are not
    #[error("Samplesheet header did not have the appropriate attributes: {}", join(.0, ", "))]
    SampleSheetHeader(Vec<String>),
}

/// Errors raised while joining samples against the metadata table
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The metadata lookup itself failed. No retry is attempted.
    #[error("Failed to fetch metadata for the library ids in the samplesheet: {0}")]
    ApiCall(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Got no metadata rows back for library id '{library_id}' and sample id '{sample_id}'")]
    LibraryNotFound { library_id: String, sample_id: String },

    #[error("Got {count} metadata rows back for library id '{library_id}' and sample id '{sample_id}'")]
    MultipleLibrary {
        library_id: String,
        sample_id: String,
        count: usize,
    },

    /// Aggregate of every sample that could not be bound
    #[error("The following samples had issues - {}", join(.0, ", "))]
    GetMetaData(Vec<String>),

    #[error("No subject ID for {0}")]
    SubjectIdMissing(String),

    /// Top-up samples whose original library does not resolve uniquely
    #[error("Could not resolve the original library of top-up samples: {}", join(.0, ", "))]
    TopupOrigin(Vec<String>),

    #[error("Metadata sheet is missing column \"{0}\"")]
    MissingColumn(String),

    #[error("Metadata sheet has no worksheets")]
    EmptyWorkbook,

    #[error("Could not read metadata sheet: {0}")]
    Xlsx(#[from] calamine::XlsxError),
}

/// One pair of samples in the same lane that cannot be told apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexClash {
    pub lane: u32,
    pub first: String,
    pub second: String,
    pub index: (String, String),
    /// `None` when one of the two samples is single-indexed
    pub index2: Option<(String, String)>,
}

impl fmt::Display for IndexClash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lane {}: {} ({}) and {} ({})",
            self.lane, self.first, self.index.0, self.second, self.index.1
        )?;
        if let Some((a, b)) = &self.index2 {
            write!(f, " with i5 {} and {}", a, b)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Found indexes that were too similar to each other: {}", join(.clashes, "; "))]
pub struct SimilarIndexError {
    pub clashes: Vec<IndexClash>,
}

/// A distinct value together with every sample exhibiting it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountGroup {
    pub value: u32,
    pub samples: Vec<String>,
}

impl fmt::Display for CountGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.value, join(&self.samples, ", "))
    }
}

/// Disagreement of the summed cycle count at one read/index section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionMismatch {
    /// Zero-based section position
    pub position: usize,
    pub groups: Vec<CountGroup>,
}

impl fmt::Display for PositionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section {}: {}", self.position + 1, join(&self.groups, " / "))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OverrideCyclesError {
    #[error("Found no samples with override cycles")]
    NoOverrideCycles,

    /// Samples split their override cycles into different numbers of sections
    #[error("Samples disagree on the number of read/index sections: {}", join(.groups, " / "))]
    SectionCount { groups: Vec<CountGroup> },

    #[error("Samples disagree on cycle counts: {}", join(.mismatches, "; "))]
    CycleCount { mismatches: Vec<PositionMismatch> },
}

/// Anything that can abort a check run
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    SimilarIndex(#[from] SimilarIndexError),

    #[error(transparent)]
    OverrideCycles(#[from] OverrideCyclesError),

    #[error("Failed to read samplesheet: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read run archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}
