//! Code for supporting the run configuration file.
//!
//! The configuration is a TOML file with a `[gene]` and a `[sources]` table.
//! All values are optional; missing ones fall back to the built-in defaults
//! for RNU4-2 on GRCh38.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::GenomeRelease;
use crate::err::Error;

/// The gene whose region is reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneConf {
    /// Gene identifier, used as foreign key of the variants.
    pub id: String,
    /// Chromosome name, with or without `chr` prefix.
    pub chromosome: String,
    /// 1-based start position of the gene.
    pub start: i32,
    /// 1-based end position of the gene, inclusive.
    pub end: i32,
}

impl Default for GeneConf {
    fn default() -> Self {
        Self {
            id: String::from("RNU4-2"),
            chromosome: String::from("12"),
            start: 120291759,
            end: 120291903,
        }
    }
}

impl GeneConf {
    /// Check that the gene definition is usable as a query region.
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::InvalidGene(String::from("empty gene id")));
        }
        if self.chromosome.is_empty() {
            return Err(Error::InvalidGene(format!(
                "empty chromosome for gene {}",
                &self.id
            )));
        }
        if self.start < 1 || self.start > self.end {
            return Err(Error::InvalidGene(format!(
                "invalid region {}-{} for gene {}",
                self.start, self.end, &self.id
            )));
        }
        Ok(())
    }
}

/// Settings for the remote data sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConf {
    /// GraphQL endpoint of gnomAD.
    pub gnomad_url: String,
    /// gnomAD dataset to query.
    pub gnomad_dataset: String,
    /// Variant search endpoint of the All of Us data browser.
    pub aou_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of rows to request per All of Us page.
    pub page_size: usize,
    /// Pause between two All of Us pages in milliseconds.
    pub page_delay_ms: u64,
    /// Genome release for the gnomAD query.
    pub genome_release: GenomeRelease,
}

impl Default for SourcesConf {
    fn default() -> Self {
        Self {
            gnomad_url: String::from("https://gnomad.broadinstitute.org/api"),
            gnomad_dataset: String::from("gnomad_r4"),
            aou_url: String::from(
                "https://public.api.researchallofus.org/v1/genomics/search-variants",
            ),
            timeout_secs: 30,
            page_size: 200,
            page_delay_ms: 100,
            genome_release: GenomeRelease::Grch38,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conf {
    pub gene: GeneConf,
    pub sources: SourcesConf,
}

impl Conf {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Load configuration from a TOML file and validate it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let toml_str = std::fs::read_to_string(path.as_ref())?;
        let conf = Self::from_toml_str(&toml_str).map_err(|e| Error::Config {
            path: path.as_ref().to_path_buf(),
            message: e.to_string(),
        })?;
        conf.gene.validate()?;
        if conf.sources.page_size == 0 {
            return Err(Error::Config {
                path: path.as_ref().to_path_buf(),
                message: String::from("page_size must be positive"),
            });
        }
        Ok(conf)
    }
}
