//! Fixtures shared by the unit tests.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::metadata::{bind_metadata, FetchError, MetadataRecord};
use crate::sample::{split_unique_id, BoundSample};
use crate::samplesheet::{parse, SampleSheet};

/// Two lanes, one control sample, one index with trailing no-calls
pub const SHEET: &str = "[Header]
IEMFileVersion,5
Experiment Name,Run1
Date,2021-03-01
Assay,TruSeq

[Reads]
151
151

[Settings]
Adapter,AGATCGGAAGAGCACACGTCTGAACTCCAGTCA

[Data]
Lane,Sample_ID,Sample_Name,Sample_Project,index,index2
1,MDX200001_L2000001,L2000001,CUP,ACGTACGT,TTGGCCAA
1,MDX200002_L2000002,L2000002,CUP,GGTTAACCNN,CCAAGGNN
2,MDX210003_L2100003,L2100003,CUP,ACGTACGT,TTGGCCAA
2,PTC_TsqN210101_L2100004,L2100004,,CATGCATG,GTACGTAC

";

pub fn record(library_id: &str, sample_id: &str, override_cycles: &str) -> MetadataRecord {
    MetadataRecord {
        library_id: library_id.to_string(),
        sample_id: sample_id.to_string(),
        override_cycles: override_cycles.to_string(),
        assay: "TsqNano".to_string(),
        sample_type: "WGS".to_string(),
        subject_id: "SBJ00001".to_string(),
    }
}

/// Parse and bind a sheet of `(Sample_ID, lane, index, index2, override cycles)` rows
pub fn bound_sheet(rows: &[(&str, u32, &str, Option<&str>, &str)]) -> SampleSheet<BoundSample> {
    let mut text = String::from("[Header]\nExperiment Name,Run1\nAssay,TruSeq\n\n[Data]\nLane,Sample_ID,Sample_Name,index,index2\n");
    let mut records = Vec::new();
    for (unique_id, lane, index, index2, oc) in rows {
        let (sample_id, library_id) = split_unique_id(unique_id).unwrap();
        text.push_str(&format!(
            "{},{},{},{},{}\n",
            lane,
            unique_id,
            library_id,
            index,
            index2.unwrap_or_default()
        ));
        records.push(record(&library_id, &sample_id, oc));
    }

    let source = move |_: &str, _: &[String]| -> Result<Vec<MetadataRecord>, FetchError> { Ok(records.clone()) };
    bind_metadata(parse(&text).unwrap(), &source).unwrap()
}

const XLSX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

const XLSX_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const XLSX_WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Libraries" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const XLSX_WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

/// Write a single-sheet workbook of string cells. Empty strings become blank cells.
pub fn write_xlsx(path: &Path, rows: &[&[&str]]) -> zip::result::ZipResult<()> {
    let mut strings: Vec<&str> = Vec::new();
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let idx = match strings.iter().position(|s| s == value) {
                Some(idx) => idx,
                None => {
                    strings.push(*value);
                    strings.len() - 1
                }
            };
            let col = (b'A' + c as u8) as char;
            sheet.push_str(&format!(r#"<c r="{}{}" t="s"><v>{}</v></c>"#, col, r + 1, idx));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let mut sst = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in &strings {
        sst.push_str(&format!("<si><t>{}</t></si>", s));
    }
    sst.push_str("</sst>");

    let mut zw = ZipWriter::new(File::create(path)?);
    let options = FileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", XLSX_CONTENT_TYPES),
        ("_rels/.rels", XLSX_RELS),
        ("xl/workbook.xml", XLSX_WORKBOOK),
        ("xl/_rels/workbook.xml.rels", XLSX_WORKBOOK_RELS),
        ("xl/worksheets/sheet1.xml", sheet.as_str()),
        ("xl/sharedStrings.xml", sst.as_str()),
    ]
    .iter()
    {
        zw.start_file(*name, options)?;
        zw.write_all(content.as_bytes())?;
    }
    zw.finish()?;
    Ok(())
}
