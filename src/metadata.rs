//! Binding of samples to their library metadata.
//!
//! Metadata comes from an external registry behind [`MetadataSource`]. All library
//! ids of a samplesheet are fetched with a single lookup, every sample is then
//! matched against the returned rows by library id and sample id.

use std::error::Error;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};

use crate::error::MetadataError;
use crate::sample::{BoundSample, Sample};
use crate::samplesheet::SampleSheet;

/// Sample types that are not held to the metadata conventions
const UNCHECKED_TYPES: [&str; 1] = ["10X"];

/// One library row of the metadata registry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRecord {
    pub library_id: String,
    pub sample_id: String,
    pub override_cycles: String,
    pub assay: String,
    /// WGS, WTS, 10X, ...
    pub sample_type: String,
    pub subject_id: String,
}

impl MetadataRecord {
    /// Value of a field by its registry name
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "library_id" => Some(&self.library_id),
            "sample_id" => Some(&self.sample_id),
            "override_cycles" => Some(&self.override_cycles),
            "assay" => Some(&self.assay),
            "type" => Some(&self.sample_type),
            "subject_id" => Some(&self.subject_id),
            _ => None,
        }
    }
}

pub type FetchError = Box<dyn Error + Send + Sync>;

/// Anything that can look up metadata rows where `field` is one of `values`
pub trait MetadataSource {
    fn fetch_metadata(&self, field: &str, values: &[String]) -> Result<Vec<MetadataRecord>, FetchError>;
}

impl<F> MetadataSource for F
where
    F: Fn(&str, &[String]) -> Result<Vec<MetadataRecord>, FetchError>,
{
    fn fetch_metadata(&self, field: &str, values: &[String]) -> Result<Vec<MetadataRecord>, FetchError> {
        self(field, values)
    }
}

/// Outcome of matching one sample against the metadata table
#[derive(Debug)]
pub enum MatchStatus<'a> {
    None,
    One(&'a MetadataRecord),
    Multiple(usize),
}

/// Find the metadata rows of a sample. Top-up samples match the rows of their original library.
pub fn match_sample<'a>(sample: &Sample, table: &'a [MetadataRecord]) -> MatchStatus<'a> {
    let library_id = sample.lookup_library_id();
    let mut candidates: Vec<&MetadataRecord> = table
        .iter()
        .filter(|r| r.library_id == library_id && r.sample_id == sample.sample_id)
        .collect();
    match candidates.len() {
        0 => MatchStatus::None,
        1 => MatchStatus::One(candidates.remove(0)),
        n => MatchStatus::Multiple(n),
    }
}

/// Like [`match_sample`], but anything other than exactly one row is an error
pub fn find_metadata_row<'a>(sample: &Sample, table: &'a [MetadataRecord]) -> Result<&'a MetadataRecord, MetadataError> {
    match match_sample(sample, table) {
        MatchStatus::One(record) => Ok(record),
        MatchStatus::None => {
            error!(
                "Got no rows back for library id '{}' and sample id '{}'",
                sample.lookup_library_id(),
                sample.sample_id
            );
            Err(MetadataError::LibraryNotFound {
                library_id: sample.lookup_library_id(),
                sample_id: sample.sample_id.clone(),
            })
        }
        MatchStatus::Multiple(count) => {
            error!(
                "Got {} rows back for library id '{}' and sample id '{}'",
                count,
                sample.lookup_library_id(),
                sample.sample_id
            );
            Err(MetadataError::MultipleLibrary {
                library_id: sample.lookup_library_id(),
                sample_id: sample.sample_id.clone(),
                count,
            })
        }
    }
}

/// Fetch the metadata of every sample with one lookup and bind each sample to its row.
///
/// Samples that cannot be bound are collected and reported together.
pub fn bind_metadata<M: MetadataSource + ?Sized>(
    samplesheet: SampleSheet<Sample>,
    source: &M,
) -> Result<SampleSheet<BoundSample>, MetadataError> {
    let mut library_ids: Vec<String> = Vec::new();
    for sample in samplesheet.samples() {
        if sample.is_topup() {
            info!("{} is a top up sample. Investigating the previous sample", sample.unique_id);
        }
        let id = sample.lookup_library_id();
        if !library_ids.contains(&id) {
            library_ids.push(id);
        }
    }

    let table = source.fetch_metadata("library_id", &library_ids).map_err(|e| {
        error!("Failed to fetch metadata for library ids in the sample sheet: {}", e);
        MetadataError::ApiCall(e)
    })?;
    debug!("Fetched {} metadata rows for {} libraries", table.len(), library_ids.len());

    let mut bound = Vec::with_capacity(samplesheet.len());
    let mut error_samples = Vec::new();
    for sample in samplesheet.samples() {
        match find_metadata_row(sample, &table) {
            Ok(record) => bound.push(BoundSample::new(sample.clone(), record.clone())),
            Err(e) => {
                error!("Could not find metadata for sample {}: {}", sample.sample_id, e);
                error_samples.push(sample.sample_id.clone());
            }
        }
    }

    if !error_samples.is_empty() {
        return Err(MetadataError::GetMetaData(error_samples));
    }
    Ok(samplesheet.with_samples(bound, table))
}

/// Check bound samples against the conventions of the metadata registry:
/// every non-10X sample has a subject, and every top-up has a resolvable original library.
pub fn check_metadata_correspondence(samplesheet: &SampleSheet<BoundSample>) -> Result<(), MetadataError> {
    info!("Checking SampleSheet data against metadata");
    let mut failed_topups = Vec::new();

    for bound in samplesheet.samples() {
        let sample = &bound.sample;
        if UNCHECKED_TYPES.contains(&bound.metadata.sample_type.as_str()) {
            debug!("Not checking metadata columns as sample {} is '{}'", sample, bound.metadata.sample_type);
            continue;
        }

        if bound.metadata.subject_id.is_empty() {
            error!("No subject ID for {}", sample.sample_id);
            return Err(MetadataError::SubjectIdMissing(sample.sample_id.clone()));
        }

        if sample.is_topup() {
            info!("{} is a top up sample. Investigating the previous sample", sample.unique_id);
            let resolved = sample
                .original()
                .map_err(|e| e.to_string())
                .and_then(|orig| {
                    find_metadata_row(&orig, samplesheet.metadata_table())
                        .map(|_| ())
                        .map_err(|e| e.to_string())
                });
            if let Err(e) = resolved {
                error!("Could not resolve the original library of {}: {}", sample.unique_id, e);
                failed_topups.push(sample.unique_id.clone());
            }
        }
    }

    if failed_topups.is_empty() {
        Ok(())
    } else {
        Err(MetadataError::TopupOrigin(failed_topups))
    }
}

/// Metadata tracking sheet exported to an Excel workbook
#[derive(Debug, Default)]
pub struct XlsxMetadata {
    pub records: Vec<MetadataRecord>,
}

const XLSX_COLUMNS: [(&str, &str); 6] = [
    ("library_id", "LibraryID"),
    ("sample_id", "SampleID"),
    ("override_cycles", "OverrideCycles"),
    ("assay", "Assay"),
    ("type", "Type"),
    ("subject_id", "SubjectID"),
];

impl XlsxMetadata {
    /// Read the first worksheet. Rows with an empty LibraryID are skipped.
    pub fn open<P: AsRef<Path>>(xlsx: P) -> Result<Self, MetadataError> {
        let mut wb: Xlsx<_> = open_workbook(xlsx.as_ref())?;
        let sheetname = wb.sheet_names().first().cloned().ok_or(MetadataError::EmptyWorkbook)?;
        let sheet = wb.worksheet_range(&sheetname).ok_or(MetadataError::EmptyWorkbook)??;

        let mut rows = sheet.rows();
        let header_row: Vec<String> = match rows.next() {
            Some(r) => r.iter().map(|d| d.to_string().trim().to_string()).collect(),
            None => return Err(MetadataError::EmptyWorkbook),
        };
        let mut cols = Vec::with_capacity(XLSX_COLUMNS.len());
        for (_, title) in XLSX_COLUMNS.iter() {
            let col = header_row
                .iter()
                .position(|c| c == title)
                .ok_or_else(|| MetadataError::MissingColumn(title.to_string()))?;
            cols.push(col);
        }

        let cell = |row: &[calamine::DataType], col: usize| row.get(col).map(|d| d.to_string().trim().to_string()).unwrap_or_default();
        let records = rows
            .map(|row| MetadataRecord {
                library_id: cell(row, cols[0]),
                sample_id: cell(row, cols[1]),
                override_cycles: cell(row, cols[2]),
                assay: cell(row, cols[3]),
                sample_type: cell(row, cols[4]),
                subject_id: cell(row, cols[5]),
            })
            .filter(|r| !r.library_id.is_empty())
            .collect::<Vec<_>>();
        info!("Read {} libraries from {}", records.len(), xlsx.as_ref().display());
        Ok(XlsxMetadata { records })
    }
}

impl MetadataSource for XlsxMetadata {
    fn fetch_metadata(&self, field: &str, values: &[String]) -> Result<Vec<MetadataRecord>, FetchError> {
        if !XLSX_COLUMNS.iter().any(|(name, _)| *name == field) {
            return Err(format!("Unknown metadata field {}", field).into());
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.field(field).map_or(false, |v| values.iter().any(|x| x == v)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samplesheet::parse;
    use crate::testutil::{record, write_xlsx, SHEET};
    use std::cell::Cell;

    fn registry() -> Vec<MetadataRecord> {
        vec![
            record("L2000001", "MDX200001", "Y151;I8;I8;Y151"),
            record("L2000002", "MDX200002", "Y151;I8;I8;Y151"),
            record("L2100003", "MDX210003", "Y151;I8;I8;Y151"),
            record("L2100004", "PTC_TsqN210101", "Y151;I8;I8;Y151"),
        ]
    }

    #[test]
    fn binds_with_a_single_lookup() {
        let calls = Cell::new(0);
        let source = |field: &str, values: &[String]| -> Result<Vec<MetadataRecord>, FetchError> {
            calls.set(calls.get() + 1);
            assert_eq!(field, "library_id");
            assert_eq!(values.len(), 4);
            Ok(registry())
        };
        let bound = bind_metadata(parse(SHEET).unwrap(), &source).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(bound.len(), 4);
        assert_eq!(bound.metadata_table().len(), 4);
        assert_eq!(
            bound.samples()[0].override_cycles.as_ref().map(|oc| oc.as_str()),
            Some("Y151;I8;I8;Y151")
        );
        assert!(check_metadata_correspondence(&bound).is_ok());
    }

    #[test]
    fn aggregates_binding_errors() {
        let source = |_: &str, _: &[String]| -> Result<Vec<MetadataRecord>, FetchError> {
            let mut rows = registry();
            rows.retain(|r| r.library_id != "L2000001");
            rows.push(record("L2100003", "MDX210003", "Y151;I8;I8;Y151"));
            Ok(rows)
        };
        match bind_metadata(parse(SHEET).unwrap(), &source) {
            Err(MetadataError::GetMetaData(samples)) => assert_eq!(samples, vec!["MDX200001", "MDX210003"]),
            other => panic!("unexpected {:?}", other.map(|s| s.len())),
        }
    }

    #[test]
    fn fetch_failure_is_fatal() {
        let source = |_: &str, _: &[String]| -> Result<Vec<MetadataRecord>, FetchError> { Err("timeout".into()) };
        assert!(matches!(bind_metadata(parse(SHEET).unwrap(), &source), Err(MetadataError::ApiCall(_))));
    }

    #[test]
    fn topup_resolves_to_original_library() {
        let text = "[Data]\nSample_ID,Sample_Name,index\nMDX200001_L2000001,L2000001,ACGTACGT\nMDX200001_L2000001_topup,L2000001_topup,GGTTAACC\n";
        let source = |_: &str, values: &[String]| -> Result<Vec<MetadataRecord>, FetchError> {
            assert_eq!(values, ["L2000001".to_string()]);
            Ok(vec![record("L2000001", "MDX200001", "Y151;I8;I8;Y151")])
        };
        let bound = bind_metadata(parse(text).unwrap(), &source).unwrap();
        assert_eq!(bound.samples()[0].metadata, bound.samples()[1].metadata);
        assert!(check_metadata_correspondence(&bound).is_ok());
    }

    #[test]
    fn subject_id_required_except_for_10x() {
        let text = "[Data]\nSample_ID,Sample_Name,index\nMDX200001_L2000001,L2000001,ACGTACGT\n";
        let mut row = record("L2000001", "MDX200001", "Y151;I8;I8;Y151");
        row.subject_id.clear();
        let rows = vec![row.clone()];
        let source = move |_: &str, _: &[String]| -> Result<Vec<MetadataRecord>, FetchError> { Ok(rows.clone()) };
        let bound = bind_metadata(parse(text).unwrap(), &source).unwrap();
        assert!(matches!(check_metadata_correspondence(&bound), Err(MetadataError::SubjectIdMissing(_))));

        row.sample_type = "10X".to_string();
        let rows = vec![row];
        let source = move |_: &str, _: &[String]| -> Result<Vec<MetadataRecord>, FetchError> { Ok(rows.clone()) };
        let bound = bind_metadata(parse(text).unwrap(), &source).unwrap();
        assert!(check_metadata_correspondence(&bound).is_ok());
    }

    #[test]
    fn xlsx_source_filters_by_field() {
        let source = XlsxMetadata { records: registry() };
        let rows = source
            .fetch_metadata("library_id", &["L2000002".to_string(), "L2100004".to_string()])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].sample_id, "PTC_TsqN210101");
        assert!(source.fetch_metadata("colour", &[]).is_err());
    }

    #[test]
    fn xlsx_columns_by_title() {
        let tmp = tempfile::tempdir().unwrap();
        let xlsx = tmp.path().join("metadata.xlsx");
        write_xlsx(
            &xlsx,
            &[
                &["Type", "LibraryID", "Comment", "SampleID", "SubjectID", "OverrideCycles", "Assay"],
                &["WGS", "L2000001", "first", "MDX200001", "SBJ00001", "Y151;I8;I8;Y151", "TsqNano"],
                &["WTS", "", "no library", "MDX200009", "SBJ00009", "Y151;I8;I8;Y151", "NebRNA"],
                &["10X", "L2100004", "", "PTC_TsqN210101", "", "Y28;I8;Y91", "10X-5prime"],
            ],
        )
        .unwrap();

        let source = XlsxMetadata::open(&xlsx).unwrap();
        assert_eq!(
            source.records,
            vec![
                MetadataRecord {
                    library_id: "L2000001".to_string(),
                    sample_id: "MDX200001".to_string(),
                    override_cycles: "Y151;I8;I8;Y151".to_string(),
                    assay: "TsqNano".to_string(),
                    sample_type: "WGS".to_string(),
                    subject_id: "SBJ00001".to_string(),
                },
                MetadataRecord {
                    library_id: "L2100004".to_string(),
                    sample_id: "PTC_TsqN210101".to_string(),
                    override_cycles: "Y28;I8;Y91".to_string(),
                    assay: "10X-5prime".to_string(),
                    sample_type: "10X".to_string(),
                    subject_id: String::new(),
                },
            ]
        );
    }

    #[test]
    fn xlsx_missing_column_or_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let xlsx = tmp.path().join("metadata.xlsx");
        write_xlsx(
            &xlsx,
            &[
                &["LibraryID", "SampleID", "OverrideCycles", "Assay", "Type"],
                &["L2000001", "MDX200001", "Y151;I8;I8;Y151", "TsqNano", "WGS"],
            ],
        )
        .unwrap();
        match XlsxMetadata::open(&xlsx) {
            Err(MetadataError::MissingColumn(column)) => assert_eq!(column, "SubjectID"),
            other => panic!("unexpected {:?}", other),
        }

        let empty = tmp.path().join("empty.xlsx");
        write_xlsx(&empty, &[]).unwrap();
        assert!(matches!(XlsxMetadata::open(&empty), Err(MetadataError::EmptyWorkbook)));
    }
}
