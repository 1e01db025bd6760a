//! Data structures for the reconciliation.

use serde::{Deserialize, Serialize};

/// Identity of a variant for merging: position, reference and alternate allele.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    pub position: i32,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl VariantKey {
    /// Build a key if all three components are present.
    pub fn from_parts(
        position: Option<i32>,
        ref_allele: Option<&str>,
        alt_allele: Option<&str>,
    ) -> Option<Self> {
        match (position, ref_allele, alt_allele) {
            (Some(position), Some(ref_allele), Some(alt_allele))
                if !ref_allele.is_empty() && !alt_allele.is_empty() =>
            {
                Some(Self {
                    position,
                    ref_allele: ref_allele.to_string(),
                    alt_allele: alt_allele.to_string(),
                })
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for VariantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.position, self.ref_allele, self.alt_allele)
    }
}

/// The reconciled variant as handed to the sink.
///
/// Serialized names follow the `variants` table of the RNUdb database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciledVariant {
    /// Natural identifier (gnomAD variant id or rsID) or `chr<chrom>_<pos>_<ref>_<alt>`.
    pub id: String,
    #[serde(rename = "geneId")]
    pub gene_id: String,
    pub position: i32,
    /// Position relative to the gene start, 1-based.
    #[serde(rename = "nucleotidePosition")]
    pub nucleotide_position: Option<i32>,
    #[serde(rename = "ref")]
    pub ref_allele: String,
    #[serde(rename = "alt")]
    pub alt_allele: String,
    pub hgvs: Option<String>,
    pub consequence: Option<String>,
    pub clinvar_significance: Option<String>,
    pub clinical_significance: Option<String>,
    pub pmid: Option<String>,
    pub function_score: Option<f64>,
    pub pvalues: Option<f64>,
    pub qvalues: Option<f64>,
    pub depletion_group: Option<String>,
    pub gnomad_ac: Option<u32>,
    pub gnomad_hom: Option<u32>,
    pub aou_ac: Option<u32>,
    pub aou_hom: Option<u32>,
    pub ukbb_ac: Option<u32>,
    pub ukbb_hom: Option<u32>,
    pub cadd_score: Option<f64>,
}

/// Counters for the records of one source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Records handed to the reconciliation.
    pub received: usize,
    /// Records without a usable key.
    pub dropped: usize,
    /// Records that created a new variant.
    pub seeded: usize,
    /// Records that updated an existing variant.
    pub updated: usize,
}

/// Counters for a complete run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub gnomad: SourceStats,
    pub aou: SourceStats,
    pub sge: SourceStats,
    /// Number of distinct variants emitted.
    pub emitted: usize,
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::VariantKey;

    #[rstest::rstest]
    #[case(Some(1), Some("A"), Some("G"), true)]
    #[case(None, Some("A"), Some("G"), false)]
    #[case(Some(1), None, Some("G"), false)]
    #[case(Some(1), Some("A"), None, false)]
    #[case(Some(1), Some(""), Some("G"), false)]
    fn key_from_parts(
        #[case] position: Option<i32>,
        #[case] ref_allele: Option<&str>,
        #[case] alt_allele: Option<&str>,
        #[case] expected: bool,
    ) {
        assert_eq!(
            expected,
            VariantKey::from_parts(position, ref_allele, alt_allele).is_some()
        );
    }

    #[test]
    fn key_display() {
        let key = VariantKey::from_parts(Some(120291800), Some("A"), Some("G"));
        assert_eq!(
            Some(String::from("120291800-A-G")),
            key.map(|k| k.to_string())
        );
    }
}
