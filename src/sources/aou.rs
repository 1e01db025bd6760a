//! Paginated region search against the All of Us genomic data browser.

use std::time::Duration;

use serde::Deserialize;

use crate::common::strip_chr_prefix;
use crate::err::Error;

use super::{flatten_text, parse_compound_id, Transport};

/// `User-Agent` header for the search endpoint, which rejects unknown clients.
pub const USER_AGENT: &str = "curl/8.0.0";

/// An All of Us variant, normalized for reconciliation.
///
/// `position`, `ref_allele`, and `alt_allele` are only set when the variant
/// identifier has the form `<chrom>-<pos>-<ref>-<alt>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub variant_id: Option<String>,
    pub genes: Option<String>,
    pub position: Option<i32>,
    pub ref_allele: Option<String>,
    pub alt_allele: Option<String>,
    pub consequence: Option<String>,
    pub variant_type: Option<String>,
    pub clinical_significance: Option<String>,
    pub aou_ac: Option<u32>,
    pub aou_hom: Option<u32>,
    pub aou_an: Option<u32>,
    pub aou_af: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    variant_id: Option<String>,
    #[serde(default)]
    genes: serde_json::Value,
    #[serde(default)]
    consequence: serde_json::Value,
    #[serde(default)]
    variant_type: serde_json::Value,
    #[serde(default)]
    clinical_significance: serde_json::Value,
    allele_count: Option<u32>,
    homozygote_count: Option<u32>,
    allele_number: Option<u32>,
    allele_frequency: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    items: Option<Vec<RawItem>>,
}

impl From<RawItem> for Record {
    fn from(raw: RawItem) -> Self {
        let parsed = raw.variant_id.as_deref().and_then(parse_compound_id);
        let (position, ref_allele, alt_allele) = match parsed {
            Some((pos, ref_allele, alt_allele)) => (Some(pos), Some(ref_allele), Some(alt_allele)),
            None => (None, None, None),
        };

        Record {
            variant_id: raw.variant_id,
            genes: flatten_text(&raw.genes),
            position,
            ref_allele,
            alt_allele,
            consequence: flatten_text(&raw.consequence),
            variant_type: flatten_text(&raw.variant_type),
            clinical_significance: flatten_text(&raw.clinical_significance),
            aou_ac: raw.allele_count,
            aou_hom: raw.homozygote_count,
            aou_an: raw.allele_number,
            aou_af: raw.allele_frequency,
        }
    }
}

/// Region query string as understood by the search endpoint, `chr12:1-100`.
pub fn region_query(chromosome: &str, start: i32, end: i32) -> String {
    format!("chr{}:{}-{}", strip_chr_prefix(chromosome), start, end)
}

/// Request body for one page, sorted by variant identifier.
pub fn build_payload(query: &str, page_number: usize, page_size: usize) -> serde_json::Value {
    serde_json::json!({
        "query": query,
        "pageNumber": page_number,
        "rowCount": page_size,
        "sortMetadata": {
            "variantId": {
                "sortActive": true,
                "sortDirection": "asc",
                "sortOrder": 1
            }
        },
        "filterMetadata": null
    })
}

/// Interpret the response document for one page.
pub fn process_page(url: &str, value: serde_json::Value) -> Result<Vec<Record>, Error> {
    let page: Page = serde_json::from_value(value).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(page
        .items
        .unwrap_or_default()
        .into_iter()
        .map(Record::from)
        .collect())
}

/// Client for the All of Us variant search.
#[derive(Debug)]
pub struct Client<T: Transport> {
    transport: T,
    url: String,
    page_delay: Duration,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, url: &str, page_delay: Duration) -> Self {
        Self {
            transport,
            url: url.to_string(),
            page_delay,
        }
    }

    /// Fetch a single page, `page_number` is 1-based.
    pub fn fetch_page(
        &self,
        query: &str,
        page_number: usize,
        page_size: usize,
    ) -> Result<Vec<Record>, Error> {
        let body = build_payload(query, page_number, page_size);
        let value = self.transport.post_json(&self.url, &body)?;
        process_page(&self.url, value)
    }

    /// Fetch all variants in a region.
    ///
    /// Pages are requested until one comes back with fewer than `page_size`
    /// rows.  When a request fails, the variants of the pages completed so far
    /// are returned.
    pub fn fetch_region(
        &self,
        chromosome: &str,
        start: i32,
        end: i32,
        page_size: usize,
    ) -> Vec<Record> {
        let page_size = page_size.max(1);
        let query = region_query(chromosome, start, end);

        let mut result = Vec::new();
        let mut page_number = 1;
        loop {
            match self.fetch_page(&query, page_number, page_size) {
                Ok(records) => {
                    let num_records = records.len();
                    tracing::debug!(
                        "All of Us page {} of {} returned {} variants",
                        page_number,
                        &query,
                        num_records
                    );
                    result.extend(records);
                    if num_records < page_size {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "error querying All of Us page {}, keeping {} variants from earlier pages: {}",
                        page_number,
                        result.len(),
                        e
                    );
                    break;
                }
            }

            page_number += 1;
            std::thread::sleep(self.page_delay);
        }

        result
    }
}
