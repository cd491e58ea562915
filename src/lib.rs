#[macro_use]
extern crate log;

pub mod checker;
pub mod config;
pub mod cycles;
pub mod error;
pub mod group;
pub mod index;
pub mod metadata;
pub mod run;
pub mod sample;
pub mod samplesheet;
pub mod table;

#[cfg(test)]
mod testutil;

pub use crate::config::CheckConfig;
pub use crate::error::CheckError;
pub use crate::metadata::{bind_metadata, MetadataRecord, MetadataSource};
pub use crate::sample::{BoundSample, Sample};
pub use crate::samplesheet::{parse, SampleSheet};
