// Standard Library Imports
use std::collections::btree_map::Entry;

// External Crate Imports
use tracing::debug;

// Local Crate Imports
use crate::{AmbiguityString, Result, Score, ScoredSite, SiteScore, SiteScores, SiteTarget};

// Public API ==========================================================================================================

impl SiteScores {
    /// Tracks the given (modification, amino acid) pairs, like `("Phospho", 'S')`
    pub fn new<M: Into<String>>(targets: impl IntoIterator<Item = (M, char)>) -> Self {
        let targets = targets
            .into_iter()
            .map(|(modification, residue)| SiteTarget {
                modification: modification.into(),
                residue,
            })
            .collect();
        Self {
            targets,
            ..Self::default()
        }
    }

    /// Records the unambiguous, targeted sites in `modifications`, keeping only the best score seen per position
    ///
    /// # Errors
    ///
    /// Fails if `modifications` isn't a valid modification string
    pub fn add(
        &mut self,
        peptide: &str,
        modifications: &str,
        start_offset: usize,
        source_index: usize,
    ) -> Result<()> {
        let modifications = AmbiguityString::new(modifications)?;
        self.add_parsed(peptide, &modifications, start_offset, source_index);
        Ok(())
    }

    pub fn add_parsed(
        &mut self,
        peptide: &str,
        modifications: &AmbiguityString,
        start_offset: usize,
        source_index: usize,
    ) {
        for (assignment, score) in modifications.unambiguous_assignments() {
            let Some(index) = assignment.site().residue_index() else {
                continue;
            };
            let Some(residue) = peptide.chars().nth(index - 1) else {
                continue;
            };
            if !self.is_target(assignment.modification(), residue) {
                continue;
            }

            let site = ScoredSite {
                modification: assignment.modification().to_owned(),
                residue,
                position: start_offset + index,
            };
            // NOTE: Unscored sites still count, just with the lowest possible confidence
            let candidate = SiteScore {
                score: score.map_or(0.0, Score::value),
                source_index,
            };

            match self.sites.entry(site) {
                Entry::Vacant(entry) => {
                    entry.insert(candidate);
                }
                Entry::Occupied(mut entry) if candidate.score > entry.get().score => {
                    debug!(
                        site = ?entry.key(),
                        old = entry.get().score,
                        new = candidate.score,
                        "replacing site score"
                    );
                    entry.insert(candidate);
                }
                Entry::Occupied(_) => (),
            }
        }
    }

    /// Only scans the sites recorded for `modification`, which sort together ahead of their residue and position
    #[must_use]
    pub fn get(&self, modification: &str, position: usize) -> Option<SiteScore> {
        let bound = |residue, position| ScoredSite {
            modification: modification.to_owned(),
            residue,
            position,
        };
        self.sites
            .range(bound('\0', 0)..=bound(char::MAX, usize::MAX))
            .find(|(site, _)| site.position == position)
            .map(|(_, &score)| score)
    }

    /// Every recorded site, best score first; ties keep (modification, residue, position) order
    #[must_use]
    pub fn ranked(&self) -> Vec<(&ScoredSite, SiteScore)> {
        let mut ranked: Vec<_> = self.sites.iter().map(|(site, &score)| (site, score)).collect();
        ranked.sort_by(|(_, a), (_, b)| b.score.total_cmp(&a.score));
        ranked
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    fn is_target(&self, modification: &str, residue: char) -> bool {
        self.targets
            .iter()
            .any(|t| t.modification == modification && t.residue == residue)
    }
}

impl ScoredSite {
    #[must_use]
    pub fn modification(&self) -> &str {
        &self.modification
    }

    #[must_use]
    pub const fn residue(&self) -> char {
        self.residue
    }

    /// The absolute residue position, within the protein rather than the peptide
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

impl SiteScore {
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub const fn source_index(&self) -> usize {
        self.source_index
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn phospho_scores() -> SiteScores {
        SiteScores::new([("Phospho", 'S'), ("Phospho", 'T'), ("Oxidation", 'M')])
    }

    fn summary(scores: &SiteScores) -> Vec<(String, usize, f64, usize)> {
        scores
            .ranked()
            .into_iter()
            .map(|(site, score)| {
                (
                    format!("{}{}", site.modification(), site.residue()),
                    site.position(),
                    score.score(),
                    score.source_index(),
                )
            })
            .collect()
    }

    #[test]
    fn records_targeted_unambiguous_sites() {
        let mut scores = phospho_scores();
        scores
            .add("PEPSTMIDE", "Phospho@4=12.5;Oxidation@6;Phospho@1|5", 100, 0)
            .unwrap();
        assert_eq!(
            summary(&scores),
            [
                ("PhosphoS".to_owned(), 104, 12.5, 0),
                ("OxidationM".to_owned(), 106, 0.0, 0)
            ]
        );
    }

    #[test]
    fn ignores_untargeted_residues_and_modifications() {
        let mut scores = phospho_scores();
        // Phospho on Y isn't tracked, Acetyl isn't tracked at all, and termini aren't residues
        scores
            .add("PEPYSTIDE", "Phospho@4=5;Acetyl@5=9;Phospho@N-term=3", 0, 0)
            .unwrap();
        assert!(scores.is_empty());
    }

    #[test]
    fn keeps_only_strictly_higher_scores() {
        let mut scores = phospho_scores();
        scores.add("PEPSTIDE", "Phospho@4=10", 20, 0).unwrap();
        scores.add("EPSTIDE", "Phospho@3=8", 21, 1).unwrap();
        assert_eq!(scores.get("Phospho", 24).map(|s| s.source_index()), Some(0));

        // A tie doesn't replace the original record
        scores.add("SPEPSTIDE", "Phospho@5=10", 19, 2).unwrap();
        assert_eq!(scores.get("Phospho", 24).map(|s| s.source_index()), Some(0));

        scores.add("PSTIDE", "Phospho@2=11.5", 22, 3).unwrap();
        let best = scores.get("Phospho", 24).unwrap();
        assert_eq!((best.score(), best.source_index()), (11.5, 3));
        assert_eq!(scores.len(), 1);
    }

    #[test]
    fn adding_is_idempotent() {
        let mut scores = phospho_scores();
        scores.add("PEPSTIDE", "Phospho@4=10;Phospho@5=2", 0, 7).unwrap();
        let once = scores.clone();
        scores.add("PEPSTIDE", "Phospho@4=10;Phospho@5=2", 0, 7).unwrap();
        assert_eq!(scores, once);
    }

    #[test]
    fn ranking() {
        let mut scores = phospho_scores();
        scores.add("STSTM", "Phospho@1=1;Phospho@2=30;Phospho@3=1;Oxidation@5=4", 0, 0).unwrap();
        let positions: Vec<_> = scores.ranked().iter().map(|(site, _)| site.position()).collect();
        // Equal scores fall back to (modification, residue, position) order
        assert_eq!(positions, [2, 5, 1, 3]);
    }

    #[test]
    fn lookups_stay_within_a_modification() {
        let mut scores = SiteScores::new([("Oxidation", 'M'), ("Phospho", 'S'), ("Phospho", 'T'), ("Sulfo", 'S')]);
        scores.add("MSTM", "Oxidation@1=3;Phospho@2=7;Phospho@3=8;Oxidation@4=5", 10, 0).unwrap();
        scores.add("MSTM", "Sulfo@2=9", 10, 1).unwrap();

        let score_at = |modification: &str, position: usize| scores.get(modification, position).map(|s| s.score());
        assert_eq!(score_at("Oxidation", 11), Some(3.0));
        assert_eq!(score_at("Oxidation", 14), Some(5.0));
        assert_eq!(score_at("Phospho", 12), Some(7.0));
        assert_eq!(score_at("Phospho", 13), Some(8.0));
        assert_eq!(score_at("Sulfo", 12), Some(9.0));

        // Sites recorded under other modifications, or under a modification's prefix, never leak through
        assert_eq!(score_at("Phospho", 11), None);
        assert_eq!(score_at("Sulfo", 13), None);
        assert_eq!(score_at("Phos", 12), None);
        assert_eq!(score_at("Acetyl", 11), None);
    }

    #[test]
    fn invalid_modification_strings() {
        let mut scores = phospho_scores();
        assert!(scores.add("PEPSTIDE", "Phospho@(4", 0, 0).is_err());
        assert!(scores.is_empty());
    }
}
