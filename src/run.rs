use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use zip::ZipArchive;

use crate::config::CheckConfig;
use crate::error::{CheckError, FormatError};
use crate::samplesheet::SampleSheet;

const SAMPLESHEET: &str = "SampleSheet.csv";

/// A samplesheet as found on disk, possibly inside a sequencing run
#[derive(Debug)]
pub struct Run {
    pub name: String,
    pub path: PathBuf,
    /// Raw samplesheet text
    pub samplesheet: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

impl Run {
    /// Constructor delegation, plain samplesheet file
    fn from_file(path: &Path) -> Result<Self, CheckError> {
        let samplesheet = std::fs::read_to_string(path)?;
        Ok(Run {
            name: file_name(path),
            path: PathBuf::from(path),
            samplesheet,
        })
    }

    /// Constructor delegation, will pick up the SampleSheet.csv of a run directory
    fn from_dir(path: &Path) -> Result<Self, CheckError> {
        let run_name = file_name(path);
        let ss = path.join(SAMPLESHEET);
        let samplesheet = std::fs::read_to_string(&ss).map_err(|e| {
            error!("{}: No {} found: {}", run_name, SAMPLESHEET, e);
            e
        })?;
        Ok(Run {
            name: run_name,
            path: PathBuf::from(path),
            samplesheet,
        })
    }

    /// Constructor delegation, will pick up `<run>/SampleSheet.csv` from a zipped run
    fn from_zip(path: &Path) -> Result<Self, CheckError> {
        let mut z = ZipArchive::new(File::open(path)?)?;
        let run_name = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut samplesheet = String::new();
        let mut entry = z.by_name(&format!("{}/{}", run_name, SAMPLESHEET)).map_err(|e| {
            error!("{}: No {} found in archive: {}", run_name, SAMPLESHEET, e);
            e
        })?;
        entry.read_to_string(&mut samplesheet)?;

        Ok(Run {
            name: run_name,
            path: PathBuf::from(path),
            samplesheet,
        })
    }

    /// Read a samplesheet from a given path.
    ///
    /// The path might either be the samplesheet itself, a sequencing run
    /// directory or a zip file containing one.
    pub fn from_path(path: &Path) -> Result<Self, CheckError> {
        let run = if path.is_dir() {
            Self::from_dir(path)?
        } else if path.extension().map_or(false, |e| e.eq_ignore_ascii_case("zip")) {
            Self::from_zip(path)?
        } else {
            Self::from_file(path)?
        };
        debug!("{}: read {} bytes of samplesheet", run.name, run.samplesheet.len());
        Ok(run)
    }

    pub fn parse(&self, config: &CheckConfig) -> Result<SampleSheet, FormatError> {
        SampleSheet::parse(&self.samplesheet, config)
    }
}
