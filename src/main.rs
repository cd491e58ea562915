#[macro_use]
extern crate log;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};

use env_logger::Env;
use structopt::StructOpt;

use sscheck::checker;
use sscheck::config::{self, CheckConfig};
use sscheck::group;
use sscheck::metadata::XlsxMetadata;
use sscheck::run::Run;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

fn check(samplesheet: PathBuf, metadata: Option<PathBuf>, config: &CheckConfig) -> Result<()> {
    let run = Run::from_path(&samplesheet)?;
    let ss = run.parse(config)?;
    checker::run_sample_sheet_content_check(&ss, config)?;

    match metadata {
        Some(xlsx) => {
            let source = XlsxMetadata::open(&xlsx)?;
            let checked = checker::run_sample_sheet_check_with_metadata(ss, &source)?;
            info!(
                "{}: {} samples, cycles per section {:?}, {} warnings",
                run.name,
                checked.samplesheet.len(),
                checked.cycle_counts,
                checked.warnings.len()
            );
        }
        None => warn!("No metadata sheet given, skipping metadata and override cycles checks"),
    }

    info!("{}: samplesheet passed all checks", run.name);
    Ok(())
}

fn split(samplesheet: PathBuf, metadata: PathBuf, outdir: &Path, config: &CheckConfig) -> Result<()> {
    let run = Run::from_path(&samplesheet)?;
    let ss = run.parse(config)?;
    checker::run_sample_sheet_content_check(&ss, config)?;

    let source = XlsxMetadata::open(&metadata)?;
    let checked = checker::run_sample_sheet_check_with_metadata(ss, &source)?;

    std::fs::create_dir_all(outdir)?;
    for (oc, group) in group::group_by_override_cycles(&checked.samplesheet) {
        let target = outdir.join(group::group_file_name(&oc));
        info!("Writing {} samples to {}...", group.len(), target.display());
        let mut f = File::create(&target)?;
        group.write(&mut f)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // set up logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opt = config::Opt::from_args();
    let check_config = opt.check_config();

    match opt.cmd {
        config::Command::Check { metadata, samplesheet } => check(samplesheet, metadata, &check_config),

        config::Command::Split {
            metadata,
            outdir,
            samplesheet,
        } => split(samplesheet, metadata, &outdir, &check_config),
    }
}
