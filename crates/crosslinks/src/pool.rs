// Standard Library Imports
use std::collections::BTreeSet;

// External Crate Imports
use ahash::HashSet;
use ambiguity::{AmbiguityString, ModificationSite};
use formula::{AtomicDatabase, ElementalFormula, MassType};
use itertools::Itertools;
use tracing::{debug, trace, warn};

// Local Crate Imports
use crate::{
    BridgeChemistry, DigestedFragment, FragmentBuildWarning, FragmentPool, LinkSite, PROTON_MASS,
    PotentialLinkFragment, bridge::decimal_to_f64,
};

// Public API ==========================================================================================================

impl DigestedFragment {
    /// A fragment of protein `entry` spanning residues `start..=end` (1-based). `formula` is the neutral formula,
    /// modifications included, and `modifications` places them as an unambiguous modification string
    pub fn new(
        sequence: impl Into<String>,
        entry: usize,
        start: usize,
        end: usize,
        formula: ElementalFormula,
        modifications: impl Into<String>,
    ) -> Self {
        Self {
            sequence: sequence.into(),
            entry,
            start,
            end,
            formula,
            modifications: modifications.into(),
        }
    }

    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }
}

impl PotentialLinkFragment {
    /// Weighs `fragment` and counts the residues each of the bridge's link sites could react with
    ///
    /// # Errors
    ///
    /// Returns a warning describing why the fragment can't take part in a search
    pub fn from_digested(
        fragment: DigestedFragment,
        bridge: &BridgeChemistry,
        db: &AtomicDatabase,
        mass_type: MassType,
    ) -> Result<Self, FragmentBuildWarning> {
        let DigestedFragment {
            sequence,
            entry,
            start,
            end,
            formula,
            modifications,
        } = fragment;

        let length = sequence.chars().count();
        if start == 0 || end < start || end - start + 1 != length {
            return Err(FragmentBuildWarning::Coordinates {
                sequence,
                start,
                end,
                length,
            });
        }

        let modifications = match AmbiguityString::new(&modifications) {
            Ok(modifications) => modifications,
            Err(source) => {
                return Err(FragmentBuildWarning::InvalidModifications {
                    sequence,
                    start,
                    source,
                });
            }
        };
        if modifications.is_ambiguous() {
            return Err(FragmentBuildWarning::AmbiguousModifications {
                modifications: modifications.ambiguous(),
                sequence,
                start,
            });
        }

        let mut n_term_modified = false;
        let mut modified_residues = BTreeSet::new();
        for (assignment, _) in modifications.unambiguous_assignments() {
            match assignment.site() {
                ModificationSite::NTerm => n_term_modified = true,
                ModificationSite::Residue(site) if site.get() > length => {
                    return Err(FragmentBuildWarning::SiteOutOfRange {
                        modification: assignment.modification().to_owned(),
                        site: site.get(),
                        sequence,
                        start,
                    });
                }
                ModificationSite::Residue(site) => {
                    if !modified_residues.insert(site.get()) {
                        return Err(FragmentBuildWarning::DuplicateModification {
                            site: site.get(),
                            sequence,
                            start,
                        });
                    }
                }
                _ => (),
            }
        }

        let mass = match db.mass(&formula, mass_type) {
            Ok(mass) => decimal_to_f64(mass) + PROTON_MASS,
            Err(source) => return Err(FragmentBuildWarning::UnknownElement { sequence, start, source }),
        };

        // NOTE: Modified residues (and a modified N-terminus) are no longer free to react with a bridge
        let site_counts = bridge
            .link_sites()
            .iter()
            .map(|&site| match site {
                LinkSite::Residue(residue) => sequence
                    .chars()
                    .enumerate()
                    .filter(|&(i, r)| r == residue && !modified_residues.contains(&(i + 1)))
                    .count(),
                LinkSite::PeptideNTerm => usize::from(!n_term_modified),
                LinkSite::ProteinNTerm => usize::from(start == 1 && !n_term_modified),
            })
            .collect();

        Ok(Self {
            sequence,
            entry,
            start,
            end,
            mass,
            formula,
            modifications,
            site_counts,
        })
    }

    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[must_use]
    pub const fn entry(&self) -> usize {
        self.entry
    }

    #[must_use]
    pub const fn start(&self) -> usize {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> usize {
        self.end
    }

    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    #[must_use]
    pub const fn formula(&self) -> &ElementalFormula {
        &self.formula
    }

    #[must_use]
    pub const fn modifications(&self) -> &AmbiguityString {
        &self.modifications
    }

    #[must_use]
    pub fn site_counts(&self) -> &[usize] {
        &self.site_counts
    }

    /// The total number of residues a bridge could react with
    #[must_use]
    pub fn linkable(&self) -> usize {
        self.site_counts.iter().sum()
    }

    /// Linkable residues usable by end A and end B of a bridge. Both ends see every site when `end_index` is `None`
    #[must_use]
    pub fn end_counts(&self, end_index: Option<usize>) -> (usize, usize) {
        match end_index {
            Some(index) => {
                let index = index.min(self.site_counts.len());
                let (a, b) = self.site_counts.split_at(index);
                (a.iter().sum(), b.iter().sum())
            }
            None => (self.linkable(), self.linkable()),
        }
    }
}

impl FragmentPool {
    /// Builds a pool from digested fragments, skipping duplicates, fragments heavier than `max_mass`, and any that
    /// can't be weighed or counted (those are kept as warnings)
    pub fn build(
        fragments: impl IntoIterator<Item = DigestedFragment>,
        bridge: &BridgeChemistry,
        db: &AtomicDatabase,
        mass_type: MassType,
        max_mass: f64,
    ) -> Self {
        let mut seen = HashSet::default();
        let mut warnings = Vec::new();
        let mut kept = Vec::new();

        for fragment in fragments {
            let fragment = match PotentialLinkFragment::from_digested(fragment, bridge, db, mass_type) {
                Ok(fragment) => fragment,
                Err(warning) => {
                    warn!("skipping fragment: {warning}");
                    warnings.push(warning);
                    continue;
                }
            };

            let key = (
                fragment.sequence.clone(),
                fragment.start,
                fragment.modifications.to_string(),
            );
            if !seen.insert(key) {
                trace!(sequence = %fragment.sequence, start = fragment.start, "skipping duplicate fragment");
                continue;
            }
            if fragment.mass > max_mass {
                trace!(sequence = %fragment.sequence, mass = fragment.mass, "skipping heavy fragment");
                continue;
            }
            kept.push(fragment);
        }

        Self::from_fragments(kept, warnings)
    }

    /// Buckets already-built fragments by their number of linkable residues
    #[must_use]
    pub fn from_fragments(
        fragments: impl IntoIterator<Item = PotentialLinkFragment>,
        warnings: Vec<FragmentBuildWarning>,
    ) -> Self {
        let mut buckets: Vec<Vec<PotentialLinkFragment>> = Vec::new();
        for fragment in fragments {
            let linkable = fragment.linkable();
            if buckets.len() <= linkable {
                buckets.resize_with(linkable + 1, Vec::new);
            }
            buckets[linkable].push(fragment);
        }

        // NOTE: The search stops scanning a bucket at the first fragment that's too heavy, so every bucket must stay
        // sorted by ascending mass
        for bucket in &mut buckets {
            bucket.sort_by(|a, b| a.mass.total_cmp(&b.mass));
        }

        let pool = Self { buckets, warnings };
        debug!(
            buckets = %pool.buckets.iter().map(Vec::len).format(","),
            warnings = pool.warnings.len(),
            "built fragment pool"
        );
        pool
    }

    /// Fragments with exactly `linkable` linkable residues, lightest first
    #[must_use]
    pub fn bucket(&self, linkable: usize) -> &[PotentialLinkFragment] {
        self.buckets.get(linkable).map_or(&[], Vec::as_slice)
    }

    /// The largest number of linkable residues held by any fragment
    #[must_use]
    pub fn max_linkable(&self) -> usize {
        self.buckets.len().saturating_sub(1)
    }

    #[must_use]
    pub fn warnings(&self) -> &[FragmentBuildWarning] {
        &self.warnings
    }

    pub fn fragments(&self) -> impl Iterator<Item = &PotentialLinkFragment> + '_ {
        self.buckets.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use insta::assert_snapshot;
    use once_cell::sync::Lazy;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);
    static DSS: Lazy<BridgeChemistry> = Lazy::new(|| {
        BridgeChemistry::new(
            &DB,
            MassType::Monoisotopic,
            "DSS",
            "C8H10O2",
            3,
            vec![LinkSite::Residue('K'), LinkSite::ProteinNTerm],
            Vec::new(),
        )
        .unwrap()
    });
    static SDA: Lazy<BridgeChemistry> = Lazy::new(|| {
        BridgeChemistry::new(
            &DB,
            MassType::Monoisotopic,
            "SDA",
            "C5H6O",
            2,
            vec![LinkSite::Residue('K'), LinkSite::PeptideNTerm],
            vec![LinkSite::Residue('D'), LinkSite::Residue('E')],
        )
        .unwrap()
    });

    fn digested(sequence: &str, start: usize, formula: &str, modifications: &str) -> DigestedFragment {
        let end = start + sequence.len() - 1;
        DigestedFragment::new(sequence, 0, start, end, ElementalFormula::new(formula).unwrap(), modifications)
    }

    fn build(
        fragment: DigestedFragment,
        bridge: &BridgeChemistry,
    ) -> Result<PotentialLinkFragment, FragmentBuildWarning> {
        PotentialLinkFragment::from_digested(fragment, bridge, &DB, MassType::Monoisotopic)
    }

    #[test]
    fn weighs_fragments_as_protonated() {
        // Gly-Gly
        let fragment = build(digested("GG", 3, "C4H8N2O3", ""), &DSS).unwrap();
        assert_float_absolute_eq!(fragment.mass(), 132.053_492_132 + PROTON_MASS, 1e-6);
        assert_eq!(fragment.linkable(), 0);
        assert_eq!((fragment.start(), fragment.end()), (3, 4));
    }

    #[test]
    fn counts_link_sites() {
        let fragment = build(digested("MKAKDE", 1, "C29H53N7O11S", ""), &DSS).unwrap();
        assert_eq!(fragment.site_counts(), [2, 1]);
        assert_eq!(fragment.linkable(), 3);
        assert_eq!(fragment.end_counts(None), (3, 3));

        // Not at the start of the protein
        let fragment = build(digested("MKAKDE", 2, "C29H53N7O11S", ""), &DSS).unwrap();
        assert_eq!(fragment.site_counts(), [2, 0]);

        // Modified residues and termini don't link
        let fragment = build(digested("MKAKDE", 1, "C31H55N7O12S", "Acetyl@2"), &DSS).unwrap();
        assert_eq!(fragment.site_counts(), [1, 1]);
        let fragment = build(digested("MKAKDE", 1, "C31H55N7O12S", "Acetyl@N-term"), &DSS).unwrap();
        assert_eq!(fragment.site_counts(), [2, 0]);
    }

    #[test]
    fn asymmetric_end_counts() {
        let fragment = build(digested("MKAKDE", 4, "C29H53N7O11S", ""), &SDA).unwrap();
        assert_eq!(fragment.site_counts(), [2, 1, 1, 1]);
        assert_eq!(fragment.end_counts(SDA.end_index()), (3, 2));
        assert_eq!(fragment.linkable(), 5);
    }

    #[test]
    fn malformed_fragments() {
        let warning = build(digested("PEPTIDE", 1, "C34H53N7O15", "Phospho@9"), &DSS).unwrap_err();
        assert_snapshot!(warning, @"PEPTIDE (starting at 1) has a Phospho modification on residue 9, past its end");

        let warning = build(digested("PEPTIDE", 1, "C34H53N7O15", "Phospho@4;Oxidation@4"), &DSS).unwrap_err();
        assert_snapshot!(warning, @"PEPTIDE (starting at 1) has more than one modification on residue 4");

        let warning = build(digested("PEPTIDE", 1, "C34H53N7O15", "Phospho@4|7"), &DSS).unwrap_err();
        assert_snapshot!(warning, @"PEPTIDE (starting at 1) has ambiguous modifications: Phospho@4|7");

        let warning = build(digested("PEPTIDE", 1, "C34H53N7O15", "Phospho@"), &DSS).unwrap_err();
        assert!(matches!(warning, FragmentBuildWarning::InvalidModifications { .. }));

        let warning = build(digested("PEPTIDE", 1, "C34H53N7O15Xx", ""), &DSS).unwrap_err();
        assert!(matches!(warning, FragmentBuildWarning::UnknownElement { .. }));

        let fragment = DigestedFragment::new("PEPTIDE", 0, 5, 9, ElementalFormula::default(), "");
        let warning = build(fragment, &DSS).unwrap_err();
        assert_snapshot!(warning, @"PEPTIDE (starting at 5) is 7 residues long, but its coordinates span 5-9");
    }

    #[test]
    fn pools_are_bucketed_and_sorted() {
        let fragments = [
            digested("KAK", 10, "C15H30N5O4", ""),
            digested("GK", 20, "C8H17N3O3", ""),
            digested("GG", 30, "C4H8N2O3", ""),
            digested("AK", 40, "C9H19N3O3", ""),
            // Duplicates and heavy fragments are dropped
            digested("GK", 20, "C8H17N3O3", ""),
            digested("KKKKKKKKKKKK", 50, "C72H146N24O13", ""),
            // Warnings are kept
            digested("GK", 60, "C8H17N3O3", "Oxidation@5"),
        ];
        let pool = FragmentPool::build(fragments, &DSS, &DB, MassType::Monoisotopic, 1000.0);

        let sequences = |n| pool.bucket(n).iter().map(PotentialLinkFragment::sequence).join(",");
        assert_eq!(sequences(0), "GG");
        assert_eq!(sequences(1), "GK,AK");
        assert_eq!(sequences(2), "KAK");
        assert_eq!(sequences(3), "");
        assert_eq!(pool.max_linkable(), 2);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.warnings().len(), 1);

        for n in 0..=pool.max_linkable() {
            assert!(pool.bucket(n).is_sorted_by(|a, b| a.mass() <= b.mass()));
        }
    }

    #[test]
    fn duplicates_need_matching_modifications() {
        let fragments = [
            digested("GKGK", 5, "C16H32N6O5", ""),
            digested("GKGK", 5, "C18H34N6O6", "Acetyl@1"),
            digested("GKGK", 5, "C18H34N6O6", "Acetyl@1"),
            digested("GKGK", 5, "C16H32N6O5", ""),
            digested("GKGK", 9, "C16H32N6O5", ""),
        ];
        let pool = FragmentPool::build(fragments, &DSS, &DB, MassType::Monoisotopic, 1000.0);

        let bucket: Vec<_> = pool
            .bucket(2)
            .iter()
            .map(|f| format!("{}@{}[{}]", f.sequence(), f.start(), f.modifications()))
            .collect();
        assert_eq!(bucket, ["GKGK@5[]", "GKGK@9[]", "GKGK@5[Acetyl@1]"]);
        assert_eq!(pool.len(), 3);
        assert!(pool.warnings().is_empty());
    }

    #[test]
    fn empty_pools() {
        let pool = FragmentPool::build([], &DSS, &DB, MassType::Monoisotopic, 1000.0);
        assert!(pool.is_empty());
        assert_eq!(pool.max_linkable(), 0);
        assert!(pool.bucket(0).is_empty());
    }
}
