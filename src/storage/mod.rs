//! Persists crawl results: one timestamped file per run.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::OutputFormat;
use crate::models::ContractRecord;

pub struct ResultWriter {
    dir: PathBuf,
    format: OutputFormat,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>, format: OutputFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    /// `contracts_2024-05-01T12-30-00.000Z.json` — colons are not portable in file names.
    pub fn file_name(&self, at: DateTime<Utc>) -> String {
        let stamp = at.to_rfc3339_opts(SecondsFormat::Millis, true).replace(':', "-");
        let ext = match self.format {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        format!("contracts_{}.{}", stamp, ext)
    }

    pub fn write(&self, records: &[ContractRecord]) -> Result<PathBuf> {
        self.write_at(records, Utc::now())
    }

    pub fn write_at(&self, records: &[ContractRecord], at: DateTime<Utc>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Could not create dir {:?}", self.dir))?;
        let path = self.dir.join(self.file_name(at));

        match self.format {
            OutputFormat::Json => write_json(&path, records),
            OutputFormat::Csv => write_csv(&path, records),
        }
        .with_context(|| format!("Failed to write results to {:?}", path))?;

        info!("Results saved to: {}", path.display());
        Ok(path)
    }
}

fn write_json(path: &Path, records: &[ContractRecord]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, records)?;
    out.flush()?;
    Ok(())
}

fn write_csv(path: &Path, records: &[ContractRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
