use clap::arg_enum;
use std::path::PathBuf;
use structopt::StructOpt;

arg_enum! {
    /// Column convention of the `[Data]` section
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum SheetFormat {
        V1,
        V2
    }
}

impl SheetFormat {
    /// Columns every `[Data]` section has to carry
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            SheetFormat::V1 => &["Sample_ID", "Sample_Name", "index"],
            SheetFormat::V2 => &["Sample_ID", "index"],
        }
    }

    /// The closed set of columns a `[Data]` section may carry
    pub fn valid_columns(self) -> &'static [&'static str] {
        match self {
            SheetFormat::V1 => &[
                "Lane",
                "Sample_ID",
                "Sample_Name",
                "Sample_Plate",
                "Sample_Well",
                "Index_Plate_Well",
                "I7_Index_ID",
                "index",
                "I5_Index_ID",
                "index2",
                "Sample_Project",
                "Description",
            ],
            SheetFormat::V2 => &["Lane", "Sample_ID", "index", "index2", "Sample_Project"],
        }
    }
}

/// Knobs of a check run, handed to every check that needs them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Two indexes in the same lane need at least this many mismatches
    pub min_index_distance: usize,
    pub format: SheetFormat,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            min_index_distance: 3,
            format: SheetFormat::V1,
        }
    }
}

#[derive(StructOpt, Debug)]
pub enum Command {
    /// Check a samplesheet for format errors and index clashes
    Check {
        /// Metadata tracking sheet (.xlsx). Enables the metadata and override cycles checks
        #[structopt(short, long, parse(from_os_str))]
        metadata: Option<PathBuf>,

        /// SampleSheet.csv, a run folder or a zipped run folder
        #[structopt(parse(from_os_str))]
        samplesheet: PathBuf,
    },

    /// Check a samplesheet and split it into one samplesheet per override cycles value
    Split {
        /// Metadata tracking sheet (.xlsx)
        #[structopt(short, long, parse(from_os_str))]
        metadata: PathBuf,

        /// Target folder for the grouped samplesheets
        #[structopt(default_value = ".", short, long, parse(from_os_str))]
        outdir: PathBuf,

        /// SampleSheet.csv, a run folder or a zipped run folder
        #[structopt(parse(from_os_str))]
        samplesheet: PathBuf,
    },
}

#[derive(StructOpt, Debug)]
pub struct Opt {
    /// Minimum number of mismatches between two indexes in the same lane
    #[structopt(default_value = "3", long)]
    pub min_index_distance: usize,

    /// Column convention of the [Data] section
    #[structopt(possible_values=&SheetFormat::variants(), default_value="V1", case_insensitive=true, long)]
    pub format: SheetFormat,

    #[structopt(subcommand)]
    pub cmd: Command,
}

impl Opt {
    pub fn check_config(&self) -> CheckConfig {
        CheckConfig {
            min_index_distance: self.min_index_distance,
            format: self.format,
        }
    }
}
