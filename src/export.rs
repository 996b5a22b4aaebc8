use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data_models::ResultRecord;
use crate::orchestrator::{ResultTable, RunResult};

/// Write records as CSV with a header row. Missing optional fields become empty cells.
pub fn write_records<W: Write>(writer: W, records: &[ResultRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)
            .with_context(|| format!("Failed to serialize record {}", record.link))?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<ResultRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);
    rdr.deserialize()
        .collect::<Result<Vec<ResultRecord>, csv::Error>>()
        .context("Failed to read CSV records")
}

pub fn to_csv_string(records: &[ResultRecord]) -> Result<String> {
    let mut buf = Vec::new();
    write_records(&mut buf, records)?;
    String::from_utf8(buf).context("CSV output is not valid UTF-8")
}

/// `nih.gov` becomes `nih_gov.csv`.
pub fn table_file_name(table: &ResultTable) -> String {
    let stem: String = table
        .name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{stem}.csv")
}

pub fn export_table(table: &ResultTable, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_records(file, &table.records)
}

/// Write one CSV per non-empty table into `dir`, returning the files written.
pub fn export_run(run: &RunResult, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for table in &run.tables {
        if table.records.is_empty() {
            log::info!("{}: nothing to export", table.name);
            continue;
        }
        let path = dir.join(table_file_name(table));
        export_table(table, &path)?;
        log::info!("wrote {} rows to {}", table.records.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
