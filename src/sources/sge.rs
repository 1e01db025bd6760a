//! Loading of saturation genome editing (SGE) scores from a TSV file.
//!
//! The table has a header row and one row per variant.  Only the columns
//! `ID`, `function_score`, `pvalues`, `qvalues`, `depletion_group`,
//! `CADD_score`, and `HGVS` are read; the `ID` column holds a compound
//! identifier `<chrom>-<pos>-<ref>-<alt>`.

use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::common::io::open_read_maybe_gz;
use crate::err::Error;

use super::parse_compound_id;

/// Cell values that are treated as missing.
const NA_VALUES: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "<NA>", "#N/A", "NULL", "null", "None",
];

/// One SGE row, normalized for reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// Raw compound identifier.
    pub id: String,
    pub position: Option<i32>,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub function_score: Option<f64>,
    pub pvalues: Option<f64>,
    pub qvalues: Option<f64>,
    pub depletion_group: Option<String>,
    pub cadd_score: Option<f64>,
    pub hgvs: Option<String>,
}

/// Result of loading an SGE table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SgeTable {
    /// All rows, including the ones without a usable identifier.
    pub records: Vec<Record>,
    /// Number of data rows read.
    pub rows_read: usize,
    /// Number of rows whose identifier could not be split into a key.
    pub rows_skipped: usize,
}

/// Deserialize a cell, mapping the NA spellings to `None`.
fn from_na_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let s = s.trim();
        if NA_VALUES.contains(&s) {
            None
        } else {
            Some(s.to_string())
        }
    }))
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default, deserialize_with = "from_na_text")]
    function_score: Option<String>,
    #[serde(default, deserialize_with = "from_na_text")]
    pvalues: Option<String>,
    #[serde(default, deserialize_with = "from_na_text")]
    qvalues: Option<String>,
    #[serde(default, deserialize_with = "from_na_text")]
    depletion_group: Option<String>,
    #[serde(rename = "CADD_score", default, deserialize_with = "from_na_text")]
    cadd_score: Option<String>,
    #[serde(rename = "HGVS", default, deserialize_with = "from_na_text")]
    hgvs: Option<String>,
}

/// Parse a numeric cell; values that are not numbers are nulled, never zeroed.
fn parse_score(id: &str, column: &str, value: Option<String>) -> Option<f64> {
    let value = value?;
    match value.parse::<f64>() {
        Ok(score) => Some(score),
        Err(_) => {
            tracing::warn!(
                "ignoring non-numeric {} value {:?} for SGE variant {}",
                column,
                &value,
                id
            );
            None
        }
    }
}

impl From<RawRow> for Record {
    fn from(raw: RawRow) -> Self {
        let id = raw.id.trim().to_string();
        let (position, ref_allele, alt_allele) = match parse_compound_id(&id) {
            Some((pos, ref_allele, alt_allele)) => (Some(pos), Some(ref_allele), Some(alt_allele)),
            None => (None, None, None),
        };

        Record {
            function_score: parse_score(&id, "function_score", raw.function_score),
            pvalues: parse_score(&id, "pvalues", raw.pvalues),
            qvalues: parse_score(&id, "qvalues", raw.qvalues),
            depletion_group: raw.depletion_group,
            cadd_score: parse_score(&id, "CADD_score", raw.cadd_score),
            hgvs: raw.hgvs,
            position,
            ref_allele,
            alt_allele,
            id,
        }
    }
}

/// Read the SGE rows from a reader.
pub fn read<R: std::io::Read>(reader: R) -> Result<SgeTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(reader);

    let mut table = SgeTable::default();
    for row in reader.deserialize() {
        let raw: RawRow = row?;
        let record = Record::from(raw);
        table.rows_read += 1;
        if record.position.is_none() {
            tracing::debug!("SGE row {:?} has no usable identifier", &record.id);
            table.rows_skipped += 1;
        }
        table.records.push(record);
    }

    Ok(table)
}

/// Load the SGE table at `path`, transparently decompressing `.gz` files.
///
/// A missing file is an error; the reconciliation cannot proceed without it.
pub fn load<P: AsRef<Path>>(path: P) -> Result<SgeTable, Error> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::MissingTable(path.to_path_buf()));
    }

    let reader = open_read_maybe_gz(path)?;
    let table = read(reader).map_err(|source| Error::Table {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        "read {} SGE rows from {:?}, {} without usable identifier",
        table.rows_read,
        path,
        table.rows_skipped
    );

    Ok(table)
}
