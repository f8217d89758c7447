// Standard Library Imports
use std::ops::RangeInclusive;

// Local Crate Imports
use crate::{FragmentFilter, ModificationRequirement, PotentialLinkFragment, ProteinWindow};

// Public API ==========================================================================================================

impl FragmentFilter {
    /// A filter that accepts every fragment
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_peptide(mut self, peptide: impl Into<String>) -> Self {
        self.peptide = Some(peptide.into());
        self
    }

    #[must_use]
    pub fn requiring(mut self, modification: impl Into<String>) -> Self {
        self.modification = Some(ModificationRequirement::Required(modification.into()));
        self
    }

    #[must_use]
    pub fn forbidding(mut self, modification: impl Into<String>) -> Self {
        self.modification = Some(ModificationRequirement::Forbidden(modification.into()));
        self
    }

    /// Only accept fragments lying entirely within `residues` of protein `entry`
    #[must_use]
    pub fn within(mut self, entry: usize, residues: RangeInclusive<usize>) -> Self {
        self.window = Some(ProteinWindow { entry, residues });
        self
    }

    #[must_use]
    pub fn peptide(&self) -> Option<&str> {
        self.peptide.as_deref()
    }

    #[must_use]
    pub const fn modification(&self) -> Option<&ModificationRequirement> {
        self.modification.as_ref()
    }

    #[must_use]
    pub const fn window(&self) -> Option<&ProteinWindow> {
        self.window.as_ref()
    }

    #[must_use]
    pub fn matches(&self, fragment: &PotentialLinkFragment) -> bool {
        let peptide_matches = self
            .peptide
            .as_ref()
            .is_none_or(|peptide| fragment.sequence() == peptide);

        let modification_matches = self.modification.as_ref().is_none_or(|requirement| {
            let mut modifications = fragment.modifications().unambiguous_assignments();
            match requirement {
                ModificationRequirement::Required(name) => {
                    modifications.any(|(assignment, _)| assignment.modification() == name)
                }
                ModificationRequirement::Forbidden(name) => {
                    modifications.all(|(assignment, _)| assignment.modification() != name)
                }
            }
        });

        let window_matches = self.window.as_ref().is_none_or(|window| {
            fragment.entry() == window.entry
                && window.residues.contains(&fragment.start())
                && window.residues.contains(&fragment.end())
        });

        peptide_matches && modification_matches && window_matches
    }
}

impl ProteinWindow {
    #[must_use]
    pub const fn entry(&self) -> usize {
        self.entry
    }

    #[must_use]
    pub const fn residues(&self) -> &RangeInclusive<usize> {
        &self.residues
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use ambiguity::AmbiguityString;
    use formula::ElementalFormula;

    use super::*;

    fn fragment(sequence: &str, entry: usize, start: usize, modifications: &str) -> PotentialLinkFragment {
        PotentialLinkFragment {
            sequence: sequence.to_owned(),
            entry,
            start,
            end: start + sequence.len() - 1,
            mass: 1000.0,
            formula: ElementalFormula::default(),
            modifications: AmbiguityString::new(modifications).unwrap(),
            site_counts: vec![1],
        }
    }

    #[test]
    fn empty_filters_accept_everything() {
        let filter = FragmentFilter::new();
        assert!(filter.matches(&fragment("PEPTIDE", 0, 1, "")));
        assert!(filter.matches(&fragment("KAK", 3, 40, "Oxidation@1")));
    }

    #[test]
    fn peptide_filters() {
        let filter = FragmentFilter::new().with_peptide("PEPTIDE");
        assert_eq!(filter.peptide(), Some("PEPTIDE"));
        assert!(filter.matches(&fragment("PEPTIDE", 0, 1, "")));
        assert!(!filter.matches(&fragment("PEPTIDES", 0, 1, "")));
    }

    #[test]
    fn modification_filters() {
        let oxidised = fragment("MKM", 0, 1, "Oxidation@1");
        let plain = fragment("MKM", 0, 1, "");

        let required = FragmentFilter::new().requiring("Oxidation");
        assert!(required.matches(&oxidised));
        assert!(!required.matches(&plain));

        let forbidden = FragmentFilter::new().forbidding("Oxidation");
        assert!(!forbidden.matches(&oxidised));
        assert!(forbidden.matches(&plain));

        // The last requirement wins
        let filter = FragmentFilter::new().requiring("Oxidation").forbidding("Oxidation");
        assert_eq!(
            filter.modification(),
            Some(&ModificationRequirement::Forbidden("Oxidation".to_owned()))
        );
    }

    #[test]
    fn window_filters() {
        let filter = FragmentFilter::new().within(2, 10..=20);
        assert!(filter.matches(&fragment("KAK", 2, 10, "")));
        assert!(filter.matches(&fragment("KAK", 2, 18, "")));
        assert!(!filter.matches(&fragment("KAK", 2, 19, "")));
        assert!(!filter.matches(&fragment("KAK", 2, 9, "")));
        assert!(!filter.matches(&fragment("KAK", 1, 12, "")));
    }

    #[test]
    fn combined_filters() {
        let filter = FragmentFilter::new()
            .with_peptide("KAK")
            .forbidding("Acetyl")
            .within(0, 1..=100);
        assert!(filter.matches(&fragment("KAK", 0, 5, "")));
        assert!(!filter.matches(&fragment("KAK", 0, 5, "Acetyl@1")));
        assert!(!filter.matches(&fragment("KAK", 0, 99, "")));
    }
}
