//! Reconciliation of the gnomAD, All of Us, and SGE records into one variant
//! per `(position, ref, alt)`.
//!
//! The sources are merged in the fixed order gnomAD, All of Us, SGE.  Each
//! source owns a subset of the fields and only ever writes to its own subset:
//!
//! - gnomAD: natural identifiers, consequence, `gnomad_ac`, `gnomad_hom`
//! - All of Us: `aou_ac`, `aou_hom`, `clinical_significance` (never set to
//!   null once present), and consequence for variants it introduces
//! - SGE: `function_score`, `pvalues`, `qvalues`, `depletion_group`,
//!   `cadd_score`, `hgvs`
//!
//! Records without position, reference, or alternate allele are dropped.

pub mod cli;
pub mod ds;

use indexmap::IndexMap;

use crate::common::strip_chr_prefix;
use crate::conf::GeneConf;
use crate::sources::{aou, gnomad, sge};

use self::ds::{ReconcileStats, ReconciledVariant, SourceStats, VariantKey};

/// What to do with one source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// The record has no key and is discarded.
    Drop,
    /// The key is new; create a variant from the record.
    Seed,
    /// The key exists; overwrite the fields owned by the record's source.
    Update,
}

/// Decision table over (parsed key?, key already present?).
pub fn merge_action(key: Option<&VariantKey>, present: bool) -> MergeAction {
    match (key, present) {
        (None, _) => MergeAction::Drop,
        (Some(_), false) => MergeAction::Seed,
        (Some(_), true) => MergeAction::Update,
    }
}

/// Variant under construction.
#[derive(Debug, Clone, Default)]
struct Draft {
    /// gnomAD variant identifier.
    natural_id: Option<String>,
    /// dbSNP identifiers reported by gnomAD.
    rsids: Vec<String>,
    consequence: Option<String>,
    clinical_significance: Option<String>,
    gnomad_ac: Option<u32>,
    gnomad_hom: Option<u32>,
    aou_ac: Option<u32>,
    aou_hom: Option<u32>,
    function_score: Option<f64>,
    pvalues: Option<f64>,
    qvalues: Option<f64>,
    depletion_group: Option<String>,
    cadd_score: Option<f64>,
    hgvs: Option<String>,
}

impl Draft {
    fn apply_gnomad(&mut self, record: &gnomad::Record) {
        self.natural_id = record.variant_id.clone().filter(|id| !id.is_empty());
        self.rsids = record.rsids.clone();
        self.consequence = record.consequence.clone();
        self.gnomad_ac = record.gnomad_ac;
        self.gnomad_hom = record.gnomad_hom;
    }

    fn seed_aou(record: &aou::Record) -> Self {
        let mut draft = Draft {
            consequence: record.consequence.clone(),
            ..Default::default()
        };
        draft.apply_aou(record);
        draft
    }

    fn apply_aou(&mut self, record: &aou::Record) {
        self.aou_ac = record.aou_ac;
        self.aou_hom = record.aou_hom;
        if record.clinical_significance.is_some() {
            self.clinical_significance = record.clinical_significance.clone();
        }
    }

    fn apply_sge(&mut self, record: &sge::Record) {
        self.function_score = record.function_score;
        self.pvalues = record.pvalues;
        self.qvalues = record.qvalues;
        self.depletion_group = record.depletion_group.clone();
        self.cadd_score = record.cadd_score;
        self.hgvs = record.hgvs.clone();
    }

    /// Resolve the identifier: gnomAD id, then first rsID, then synthesized.
    fn identifier(&self, chromosome: &str, key: &VariantKey) -> String {
        if let Some(id) = &self.natural_id {
            return id.clone();
        }
        if let Some(rsid) = self.rsids.iter().find(|rsid| !rsid.is_empty()) {
            return rsid.clone();
        }
        format!(
            "chr{}_{}_{}_{}",
            strip_chr_prefix(chromosome),
            key.position,
            &key.ref_allele,
            &key.alt_allele
        )
    }

    fn finalize(self, gene: &GeneConf, key: VariantKey) -> ReconciledVariant {
        let id = self.identifier(&gene.chromosome, &key);
        let nucleotide_position = key
            .position
            .checked_sub(gene.start)
            .and_then(|offset| offset.checked_add(1));

        ReconciledVariant {
            id,
            gene_id: gene.id.clone(),
            position: key.position,
            nucleotide_position,
            ref_allele: key.ref_allele,
            alt_allele: key.alt_allele,
            hgvs: self.hgvs,
            consequence: self.consequence,
            clinvar_significance: None,
            clinical_significance: self.clinical_significance,
            pmid: None,
            function_score: self.function_score,
            pvalues: self.pvalues,
            qvalues: self.qvalues,
            depletion_group: self.depletion_group,
            gnomad_ac: self.gnomad_ac,
            gnomad_hom: self.gnomad_hom,
            aou_ac: self.aou_ac,
            aou_hom: self.aou_hom,
            ukbb_ac: None,
            ukbb_hom: None,
            cadd_score: self.cadd_score,
        }
    }
}

/// Insertion-ordered merge state of one run.
#[derive(Debug, Default)]
struct Reconciler {
    drafts: IndexMap<VariantKey, Draft>,
    stats: ReconcileStats,
}

impl Reconciler {
    /// Run the decision table for one record and apply the resulting action.
    fn merge<S, U>(
        &mut self,
        key: Option<VariantKey>,
        stats: fn(&mut ReconcileStats) -> &mut SourceStats,
        seed: S,
        update: U,
    ) where
        S: FnOnce() -> Draft,
        U: FnOnce(&mut Draft),
    {
        let present = key
            .as_ref()
            .map(|key| self.drafts.contains_key(key))
            .unwrap_or(false);
        let action = merge_action(key.as_ref(), present);

        let source_stats = stats(&mut self.stats);
        source_stats.received += 1;
        match (action, key) {
            (MergeAction::Seed, Some(key)) => {
                tracing::trace!("new variant {}", &key);
                source_stats.seeded += 1;
                self.drafts.insert(key, seed());
            }
            (MergeAction::Update, Some(key)) => {
                source_stats.updated += 1;
                if let Some(draft) = self.drafts.get_mut(&key) {
                    update(draft);
                }
            }
            _ => {
                source_stats.dropped += 1;
            }
        }
    }

    fn add_gnomad(&mut self, records: &[gnomad::Record]) {
        for record in records {
            let key = VariantKey::from_parts(
                record.position,
                record.ref_allele.as_deref(),
                record.alt_allele.as_deref(),
            );
            self.merge(
                key,
                |stats| &mut stats.gnomad,
                || {
                    let mut draft = Draft::default();
                    draft.apply_gnomad(record);
                    draft
                },
                |draft| draft.apply_gnomad(record),
            );
        }
    }

    fn add_aou(&mut self, records: &[aou::Record]) {
        for record in records {
            let key = VariantKey::from_parts(
                record.position,
                record.ref_allele.as_deref(),
                record.alt_allele.as_deref(),
            );
            if key.is_none() {
                tracing::trace!(
                    "dropping All of Us record {:?} without position/ref/alt",
                    &record.variant_id
                );
            }
            self.merge(
                key,
                |stats| &mut stats.aou,
                || Draft::seed_aou(record),
                |draft| draft.apply_aou(record),
            );
        }
    }

    fn add_sge(&mut self, records: &[sge::Record]) {
        for record in records {
            let key = VariantKey::from_parts(
                record.position,
                record.ref_allele.as_deref(),
                record.alt_allele.as_deref(),
            );
            self.merge(
                key,
                |stats| &mut stats.sge,
                || {
                    let mut draft = Draft::default();
                    draft.apply_sge(record);
                    draft
                },
                |draft| draft.apply_sge(record),
            );
        }
    }

    fn finish(self, gene: &GeneConf) -> (Vec<ReconciledVariant>, ReconcileStats) {
        let mut stats = self.stats;
        let variants = self
            .drafts
            .into_iter()
            .map(|(key, draft)| draft.finalize(gene, key))
            .collect::<Vec<_>>();
        stats.emitted = variants.len();
        (variants, stats)
    }
}

/// Merge the three sources into one record per `(position, ref, alt)`.
///
/// The result is in insertion order: gnomAD variants first, then variants
/// only known to All of Us, then variants only present in the SGE table.
pub fn reconcile(
    gene: &GeneConf,
    gnomad_records: &[gnomad::Record],
    aou_records: &[aou::Record],
    sge_records: &[sge::Record],
) -> (Vec<ReconciledVariant>, ReconcileStats) {
    let mut reconciler = Reconciler::default();
    reconciler.add_gnomad(gnomad_records);
    reconciler.add_aou(aou_records);
    reconciler.add_sge(sge_records);
    reconciler.finish(gene)
}
