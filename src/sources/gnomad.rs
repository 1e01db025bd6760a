//! Region query against the gnomAD GraphQL API.
//!
//! Every variant carries at most one of three frequency groups that is used,
//! in order of precedence: `joint`, then `genome`, then `exome`.

use serde::Deserialize;

use crate::common::{strip_chr_prefix, GenomeRelease};
use crate::err::Error;

use super::Transport;

/// A gnomAD variant, normalized for reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// gnomAD variant identifier, e.g., `12-120291800-A-G`.
    pub variant_id: Option<String>,
    /// 1-based position.
    pub position: Option<i32>,
    /// Reference allele.
    pub ref_allele: Option<String>,
    /// Alternate allele.
    pub alt_allele: Option<String>,
    /// dbSNP identifiers.
    pub rsids: Vec<String>,
    /// Most severe consequence.
    pub consequence: Option<String>,
    /// Allele count.
    pub gnomad_ac: Option<u32>,
    /// Number of homozygous carriers.
    pub gnomad_hom: Option<u32>,
    /// Allele number.
    pub gnomad_an: Option<u32>,
    /// Allele frequency; not available from the joint group.
    pub gnomad_af: Option<f64>,
}

/// Counts from the `genome` or `exome` group.
#[derive(Debug, Clone, Deserialize)]
struct SeqTypeCounts {
    ac: Option<u32>,
    ac_hom: Option<u32>,
    an: Option<u32>,
    af: Option<f64>,
}

/// Counts from the `joint` group.
#[derive(Debug, Clone, Deserialize)]
struct JointCounts {
    ac: Option<u32>,
    homozygote_count: Option<u32>,
    an: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawVariant {
    variant_id: Option<String>,
    pos: Option<i32>,
    #[serde(rename = "ref")]
    ref_allele: Option<String>,
    #[serde(rename = "alt")]
    alt_allele: Option<String>,
    rsids: Option<Vec<String>>,
    consequence: Option<String>,
    genome: Option<SeqTypeCounts>,
    exome: Option<SeqTypeCounts>,
    joint: Option<JointCounts>,
}

#[derive(Debug, Deserialize)]
struct Region {
    #[serde(default)]
    variants: Option<Vec<RawVariant>>,
}

#[derive(Debug, Deserialize)]
struct Data {
    region: Option<Region>,
}

#[derive(Debug, Deserialize)]
struct Response {
    data: Option<Data>,
    #[serde(default)]
    errors: Option<Vec<serde_json::Value>>,
}

impl From<RawVariant> for Record {
    fn from(raw: RawVariant) -> Self {
        let mut record = Record {
            variant_id: raw.variant_id,
            position: raw.pos,
            ref_allele: raw.ref_allele,
            alt_allele: raw.alt_allele,
            rsids: raw.rsids.unwrap_or_default(),
            consequence: raw.consequence,
            ..Default::default()
        };

        match (raw.joint, raw.genome, raw.exome) {
            (Some(joint), _, _) => {
                record.gnomad_ac = joint.ac;
                record.gnomad_hom = joint.homozygote_count;
                record.gnomad_an = joint.an;
            }
            (None, Some(counts), _) | (None, None, Some(counts)) => {
                record.gnomad_ac = counts.ac;
                record.gnomad_hom = counts.ac_hom;
                record.gnomad_an = counts.an;
                record.gnomad_af = counts.af;
            }
            (None, None, None) => (),
        }

        record
    }
}

/// Build the GraphQL query for all variants in a closed region.
pub fn build_query(
    chromosome: &str,
    start: i32,
    end: i32,
    genome_release: GenomeRelease,
    dataset: &str,
) -> String {
    format!(
        r#"query VariantsInRegion {{
  region(chrom: "{chrom}", start: {start}, stop: {end}, reference_genome: {release}) {{
    variants(dataset: {dataset}) {{
      variant_id
      pos
      ref
      alt
      rsids
      consequence
      genome {{ ac ac_hom an af }}
      exome {{ ac ac_hom an af }}
      joint {{ ac homozygote_count an }}
    }}
  }}
}}"#,
        chrom = strip_chr_prefix(chromosome),
        release = genome_release.name(),
    )
}

/// Interpret a GraphQL response document.
pub fn process_response(url: &str, value: serde_json::Value) -> Result<Vec<Record>, Error> {
    let response: Response = serde_json::from_value(value).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        return Err(Error::Service {
            url: url.to_string(),
            message: serde_json::Value::Array(errors).to_string(),
        });
    }

    Ok(response
        .data
        .and_then(|data| data.region)
        .and_then(|region| region.variants)
        .unwrap_or_default()
        .into_iter()
        .map(Record::from)
        .collect())
}

/// Client for region queries against gnomAD.
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    url: String,
    dataset: String,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, url: &str, dataset: &str) -> Self {
        Self {
            transport,
            url: url.to_string(),
            dataset: dataset.to_string(),
        }
    }

    /// Query the variants in a region, propagating any failure.
    pub fn try_fetch_region(
        &self,
        chromosome: &str,
        start: i32,
        end: i32,
        genome_release: GenomeRelease,
    ) -> Result<Vec<Record>, Error> {
        let query = build_query(chromosome, start, end, genome_release, &self.dataset);
        let body = serde_json::json!({ "query": query });
        let value = self.transport.post_json(&self.url, &body)?;
        process_response(&self.url, value)
    }

    /// Query the variants in a region.
    ///
    /// Failures are logged and yield an empty result so that the other sources
    /// can still be reconciled.
    pub fn fetch_region(
        &self,
        chromosome: &str,
        start: i32,
        end: i32,
        genome_release: GenomeRelease,
    ) -> Vec<Record> {
        match self.try_fetch_region(chromosome, start, end, genome_release) {
            Ok(records) => {
                tracing::debug!(
                    "gnomAD returned {} variants for {}:{}-{}",
                    records.len(),
                    chromosome,
                    start,
                    end
                );
                records
            }
            Err(e) => {
                tracing::warn!("error querying gnomAD, no variants from this source: {}", e);
                Vec::new()
            }
        }
    }
}
