//! End-to-end check pipelines over a parsed samplesheet.

use crate::config::CheckConfig;
use crate::cycles::{check_global_override_cycles, check_internal_override_cycles};
use crate::error::CheckError;
use crate::index::detect_index_clashes;
use crate::metadata::{bind_metadata, check_metadata_correspondence, MetadataSource};
use crate::sample::{BoundSample, Sample};
use crate::samplesheet::SampleSheet;

/// Outcome of a successful metadata check
#[derive(Debug)]
pub struct MetadataCheck {
    pub samplesheet: SampleSheet<BoundSample>,
    /// Cycles per read/index section shared by all samples
    pub cycle_counts: Vec<u32>,
    /// Per-sample override cycles disagreements, already logged
    pub warnings: Vec<String>,
}

/// Checks that need nothing but the samplesheet itself
pub fn run_sample_sheet_content_check<S: AsRef<Sample>>(
    samplesheet: &SampleSheet<S>,
    config: &CheckConfig,
) -> Result<(), CheckError> {
    info!("Check samplesheet content");
    samplesheet.check_header_metadata()?;
    samplesheet.check_sample_uniqueness()?;
    detect_index_clashes(samplesheet, config)?;
    Ok(())
}

/// Bind metadata, then run every check that depends on it
pub fn run_sample_sheet_check_with_metadata<M: MetadataSource + ?Sized>(
    samplesheet: SampleSheet<Sample>,
    source: &M,
) -> Result<MetadataCheck, CheckError> {
    info!("Check samplesheet against metadata");
    let samplesheet = bind_metadata(samplesheet, source)?;
    check_metadata_correspondence(&samplesheet)?;

    info!("Check override cycles");
    let cycle_counts = check_global_override_cycles(&samplesheet)?;
    let warnings = check_internal_override_cycles(&samplesheet);

    Ok(MetadataCheck {
        samplesheet,
        cycle_counts,
        warnings,
    })
}
