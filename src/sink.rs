//! Persistence of reconciled variants.
//!
//! The sinks upsert by variant identifier: a record whose `id` is already
//! stored replaces the stored one in place, new records are appended.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::common::io::{open_read_maybe_gz, open_write_maybe_gz};
use crate::err::Error;
use crate::reconcile::ds::ReconciledVariant;

/// Destination of reconciled variants.
pub trait VariantSink {
    /// Insert or replace `variants`, keyed by identifier.
    fn upsert(&mut self, variants: &[ReconciledVariant]) -> Result<(), Error>;
}

/// File format of a `FileSink`.
#[derive(
    clap::ValueEnum, Clone, Copy, Debug, Default, strum::Display, PartialEq, Eq, Hash,
)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Tab-separated values with header.
    #[default]
    Tsv,
    /// One JSON object per line.
    Jsonl,
}

/// Sink writing all variants to a (possibly gzip-compressed) file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    format: OutputFormat,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P, format: OutputFormat) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format,
        }
    }

    fn err<E: std::fmt::Display>(&self, e: E) -> Error {
        Error::Sink {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    /// Read the records currently stored, empty if the file does not exist.
    pub fn load(&self) -> Result<Vec<ReconciledVariant>, Error> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = open_read_maybe_gz(&self.path).map_err(|e| self.err(e))?;
        match self.format {
            OutputFormat::Tsv => {
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(true)
                    .delimiter(b'\t')
                    .from_reader(reader);
                reader
                    .deserialize()
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| self.err(e))
            }
            OutputFormat::Jsonl => {
                let mut result = Vec::new();
                for line in reader.lines() {
                    let line = line.map_err(|e| self.err(e))?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    result.push(serde_json::from_str(&line).map_err(|e| self.err(e))?);
                }
                Ok(result)
            }
        }
    }

    fn write(&self, path: &Path, variants: &[&ReconciledVariant]) -> Result<(), Error> {
        let writer = open_write_maybe_gz(path).map_err(|e| self.err(e))?;
        match self.format {
            OutputFormat::Tsv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(true)
                    .delimiter(b'\t')
                    .from_writer(writer);
                for variant in variants {
                    writer.serialize(variant).map_err(|e| self.err(e))?;
                }
                writer.flush().map_err(|e| self.err(e))?;
            }
            OutputFormat::Jsonl => {
                let mut writer = writer;
                for variant in variants {
                    serde_json::to_writer(&mut writer, variant).map_err(|e| self.err(e))?;
                    writer.write_all(b"\n").map_err(|e| self.err(e))?;
                }
                writer.flush().map_err(|e| self.err(e))?;
            }
        }
        Ok(())
    }

    /// Path of the scratch file, sharing the directory and extension.
    fn scratch_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        self.path.with_file_name(format!("tmp.{}", file_name))
    }
}

impl VariantSink for FileSink {
    fn upsert(&mut self, variants: &[ReconciledVariant]) -> Result<(), Error> {
        let existing = self.load()?;
        let num_existing = existing.len();

        let mut by_id = existing
            .into_iter()
            .map(|variant| (variant.id.clone(), variant))
            .collect::<IndexMap<_, _>>();
        for variant in variants {
            by_id.insert(variant.id.clone(), variant.clone());
        }

        let scratch_path = self.scratch_path();
        self.write(&scratch_path, &by_id.values().collect::<Vec<_>>())?;
        std::fs::rename(&scratch_path, &self.path).map_err(|e| self.err(e))?;

        tracing::debug!(
            "upserted {} variants into {:?}, {} before, {} after",
            variants.len(),
            &self.path,
            num_existing,
            by_id.len()
        );

        Ok(())
    }
}
