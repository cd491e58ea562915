//! Reading and writing of section-based samplesheets.
//!
//! A samplesheet is an INI-like CSV file with the sections `[Header]`, `[Reads]`,
//! `[Settings]` and `[Data]`. The `[Data]` section is a table with one sample per row.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::CheckConfig;
use crate::error::FormatError;
use crate::metadata::MetadataRecord;
use crate::sample::{split_unique_id, Sample};
use crate::table::Table;

lazy_static! {
    static ref RE_SECTION: Regex = Regex::new(r"^\[(\w+)\]$").unwrap();
}

/// Keys that have to be present in `[Header]`
const REQUIRED_HEADER_KEYS: [&str; 2] = ["Assay", "Experiment Name"];

/// Insertion-ordered key/value lines of `[Header]` and `[Settings]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues(Vec<(String, String)>);

impl KeyValues {
    pub fn new() -> Self {
        KeyValues(Vec::new())
    }

    /// Overwrites the value of an existing key in place
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split every line on its first comma
    fn from_lines(lines: Vec<String>) -> Self {
        let mut kv = KeyValues::new();
        for line in lines {
            match line.split_once(',') {
                Some((k, v)) => kv.insert(k, v),
                None => kv.insert(line.as_str(), ""),
            }
        }
        kv
    }

    fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let lines: Vec<String> = self
            .iter()
            .map(|(k, v)| if v.is_empty() { k.to_string() } else { format!("{},{}", k, v) })
            .collect();
        write!(w, "{}", lines.join("\n"))
    }
}

/// One parsed samplesheet section
#[derive(Debug)]
enum Section {
    Header(KeyValues),
    Reads(Vec<String>),
    Settings(KeyValues),
    Data(Table),
}

impl Section {
    fn from_lines(name: &str, lines: Vec<String>) -> Result<Self, FormatError> {
        match name {
            "Header" => Ok(Section::Header(KeyValues::from_lines(lines))),
            "Reads" => Ok(Section::Reads(lines)),
            "Settings" => Ok(Section::Settings(KeyValues::from_lines(lines))),
            "Data" => Ok(Section::Data(Table::from_csv_lines(&lines)?)),
            other => {
                error!("Samplesheet section [{}] is not supported", other);
                Err(FormatError::UnknownSection(other.to_string()))
            }
        }
    }
}

/// Cut the raw text into named sections. Blank lines are dropped, so are trailing
/// commas outside of `[Data]` where they would be empty fields.
fn read_sections(text: &str) -> Result<Vec<(String, Vec<String>)>, FormatError> {
    let mut sections: Vec<(String, Vec<String>)> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        let stripped = line.trim_end_matches(',');
        if stripped.is_empty() {
            continue;
        }

        if let Some(captures) = RE_SECTION.captures(stripped) {
            let name = captures[1].to_string();
            if sections.iter().any(|(n, _)| *n == name) {
                error!("Samplesheet section [{}] appears more than once", name);
                return Err(FormatError::DuplicateSection(name));
            }
            sections.push((name, Vec::new()));
            continue;
        }

        match sections.last_mut() {
            None => {
                error!("Top line of csv was not a section header. Exiting");
                return Err(FormatError::MissingSectionHeader(line.to_string()));
            }
            Some((name, lines)) if name == "Data" => lines.push(line.to_string()),
            Some((_, lines)) => lines.push(stripped.to_string()),
        }
    }
    Ok(sections)
}

/// A whole samplesheet.
///
/// `S` is the sample representation: plain [`Sample`]s after parsing,
/// [`BoundSample`](crate::sample::BoundSample)s once metadata has been bound.
/// `data` and `samples` always hold the same samples in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSheet<S = Sample> {
    pub header: KeyValues,
    pub reads: Vec<String>,
    pub settings: KeyValues,
    data: Table,
    samples: Vec<S>,
    metadata_table: Vec<MetadataRecord>,
}

/// Parse samplesheet text with the default configuration
pub fn parse(text: &str) -> Result<SampleSheet, FormatError> {
    SampleSheet::parse(text, &CheckConfig::default())
}

impl SampleSheet<Sample> {
    /// Parse samplesheet text. Fails on the first structural or naming error.
    pub fn parse(text: &str, config: &CheckConfig) -> Result<Self, FormatError> {
        let mut header = KeyValues::new();
        let mut reads = Vec::new();
        let mut settings = KeyValues::new();
        let mut data = None;

        for (name, lines) in read_sections(text)? {
            match Section::from_lines(&name, lines)? {
                Section::Header(kv) => header = kv,
                Section::Reads(r) => reads = r,
                Section::Settings(kv) => settings = kv,
                Section::Data(t) => data = Some(t),
            }
        }

        let data = data.ok_or_else(|| {
            error!("Samplesheet has no [Data] section");
            FormatError::MissingData
        })?;
        SampleSheet::from_parts(header, reads, settings, data, config)
    }

    /// Build a samplesheet from already separated sections
    pub fn from_parts(
        header: KeyValues,
        reads: Vec<String>,
        settings: KeyValues,
        mut data: Table,
        config: &CheckConfig,
    ) -> Result<Self, FormatError> {
        for column in config.format.required_columns() {
            if !data.has_column(column) {
                error!("Could not find column \"{}\" in samplesheet", column);
                return Err(FormatError::ColumnNotFound(column.to_string()));
            }
        }
        let valid = config.format.valid_columns();
        if let Some(column) = data.columns().iter().find(|c| !valid.contains(&c.as_str())) {
            error!("Column \"{}\" is not a valid samplesheet column", column);
            return Err(FormatError::InvalidColumn(column.clone()));
        }

        // trailing Ns are no-calls, not part of the index
        data.map_column("index", |v| v.trim_end_matches('N').to_string());
        data.map_column("index2", |v| v.trim_end_matches('N').to_string());

        let samples = (0..data.len())
            .map(|row| sample_from_row(&data, row))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SampleSheet {
            header,
            reads,
            settings,
            data,
            samples,
            metadata_table: Vec::new(),
        })
    }
}

fn sample_from_row(data: &Table, row: usize) -> Result<Sample, FormatError> {
    let unique_id = data.get(row, "Sample_ID").unwrap_or_default();
    let lane = match data.get(row, "Lane") {
        Some(lane) => lane.trim().parse::<u32>().map_err(|_| {
            error!("Sample {} has an invalid lane \"{}\"", unique_id, lane);
            FormatError::InvalidLane {
                sample: unique_id.to_string(),
                lane: lane.to_string(),
            }
        })?,
        // without lanes everything is compared as one lane
        None => 1,
    };
    // v2 sheets have no Sample_Name, the library id takes its place
    let sample_name = match data.get(row, "Sample_Name") {
        Some(name) => name.to_string(),
        None => split_unique_id(unique_id)?.1,
    };
    Sample::new(
        unique_id,
        &sample_name,
        data.get(row, "index").unwrap_or_default(),
        data.get(row, "index2"),
        lane,
        data.get(row, "Sample_Project"),
    )
}

impl<S> SampleSheet<S> {
    pub fn samples(&self) -> &[S] {
        &self.samples
    }

    pub fn data(&self) -> &Table {
        &self.data
    }

    /// Metadata rows fetched while binding, empty before
    pub fn metadata_table(&self) -> &[MetadataRecord] {
        &self.metadata_table
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Swap the sample representation, keeping all sections
    pub(crate) fn with_samples<T>(self, samples: Vec<T>, metadata_table: Vec<MetadataRecord>) -> SampleSheet<T> {
        assert_eq!(samples.len(), self.samples.len(), "sample count changed while rebinding");
        SampleSheet {
            header: self.header,
            reads: self.reads,
            settings: self.settings,
            data: self.data,
            samples,
            metadata_table,
        }
    }

    /// Write the samplesheet back out, sections in fixed order
    pub fn write<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "[Header]")?;
        self.header.write(w)?;
        write!(w, "\n\n[Reads]\n{}", self.reads.join("\n"))?;
        writeln!(w, "\n\n[Settings]")?;
        self.settings.write(w)?;
        writeln!(w, "\n\n[Data]")?;
        self.data.write_csv(w)?;
        writeln!(w)
    }
}

impl<S: AsRef<Sample>> SampleSheet<S> {
    pub fn get(&self, unique_id: &str) -> Option<&S> {
        self.samples.iter().find(|s| s.as_ref().unique_id == unique_id)
    }

    /// Distinct lanes of all samples, `{1}` when the sheet has no Lane column
    pub fn get_lanes(&self) -> BTreeSet<u32> {
        if !self.data.has_column("Lane") {
            info!("No lanes defined, returning lane 1 for the purpose of checking indexes");
            return std::iter::once(1).collect();
        }
        self.samples.iter().map(|s| s.as_ref().lane).collect()
    }

    /// Distinct library years, tells which metadata sheets are needed
    pub fn get_years(&self) -> BTreeSet<String> {
        self.samples.iter().map(|s| s.as_ref().year.clone()).collect()
    }

    pub fn check_sample_uniqueness(&self) -> Result<(), FormatError> {
        for (i, a) in self.samples.iter().enumerate() {
            for b in &self.samples[i + 1..] {
                if a.as_ref().unique_id == b.as_ref().unique_id {
                    error!("Found two samples with the same id: '{}'", a.as_ref().unique_id);
                    return Err(FormatError::SampleDuplicate(a.as_ref().unique_id.clone()));
                }
            }
        }
        Ok(())
    }

    /// Append a sample, writing a matching `[Data]` row. Columns the sample
    /// knows nothing about are left empty.
    pub fn add_sample(&mut self, sample: S) -> Result<(), FormatError> {
        let new = sample.as_ref();
        if self.get(&new.unique_id).is_some() {
            error!("Sample with ID: {} already exists in sample sheet", new.unique_id);
            return Err(FormatError::SampleDuplicate(new.unique_id.clone()));
        }
        let row = self
            .data
            .columns()
            .iter()
            .map(|column| match column.as_str() {
                "Lane" => new.lane.to_string(),
                "Sample_ID" => new.unique_id.clone(),
                "Sample_Name" => new.sample_name.clone(),
                "index" => new.index.clone(),
                "index2" => new.index2.clone().unwrap_or_default(),
                "Sample_Project" => new.project.clone().unwrap_or_default(),
                _ => String::new(),
            })
            .collect();
        self.data.push_row(row)?;
        self.samples.push(sample);
        Ok(())
    }

    /// Remove the sample with this `Sample_ID` together with its `[Data]` row
    pub fn remove_sample(&mut self, unique_id: &str) -> Result<S, FormatError> {
        let pos = self
            .samples
            .iter()
            .position(|s| s.as_ref().unique_id == unique_id)
            .ok_or_else(|| {
                error!("Could not find sample {} when removing sample from sample sheet", unique_id);
                FormatError::SampleNotFound(unique_id.to_string())
            })?;
        self.data.remove_row(pos);
        Ok(self.samples.remove(pos))
    }

    /// Keep only the samples (and rows) matching `keep`
    pub(crate) fn retain_samples<F: Fn(&S) -> bool>(&mut self, keep: F) {
        let kept: Vec<bool> = self.samples.iter().map(|s| keep(s)).collect();
        let mut pos = 0;
        self.samples.retain(|_| {
            let k = kept[pos];
            pos += 1;
            k
        });
        self.data.retain_rows(|row| kept[row]);
    }

    /// `Assay` and `Experiment Name` must be set in `[Header]`
    pub fn check_header_metadata(&self) -> Result<(), FormatError> {
        info!("Checking SampleSheet metadata");
        let missing: Vec<String> = REQUIRED_HEADER_KEYS
            .iter()
            .filter(|key| self.header.get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        for key in &missing {
            error!("{} not defined in Header!", key);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(FormatError::SampleSheetHeader(missing))
        }
    }
}

impl<S> fmt::Display for SampleSheet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.write(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
