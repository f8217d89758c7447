// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use itertools::Itertools;
use tracing::trace;

// Local Crate Imports
use crate::{
    AmbiguityError, AmbiguityGroup, AmbiguityString, ModificationAssignment, ModificationSite, PeptideVariant,
    Result, VariantEnumerator,
};

type Alternatives = Vec<Vec<ModificationAssignment>>;

// Public API ==========================================================================================================

impl VariantEnumerator {
    /// Enumerates the variants of `sequence` described by every group of `modifications`
    ///
    /// # Errors
    ///
    /// Fails if any residue site lies beyond the end of `sequence`
    pub fn new(sequence: impl Into<String>, modifications: &AmbiguityString) -> Result<Self> {
        let groups = modifications
            .groups()
            .iter()
            .map(AmbiguityGroup::alternatives)
            .collect();
        Self::from_alternatives(sequence, groups)
    }

    /// Enumerates variants from pre-resolved groups, each a list of mutually exclusive assignment sets
    ///
    /// # Errors
    ///
    /// Fails if any residue site lies beyond the end of `sequence`
    pub fn from_alternatives(sequence: impl Into<String>, groups: Vec<Alternatives>) -> Result<Self> {
        let sequence = sequence.into();
        let length = sequence.chars().count();

        let out_of_range = groups
            .iter()
            .flatten()
            .flatten()
            .find(|assignment| assignment.site.residue_index().is_some_and(|i| i > length));
        if let Some(assignment) = out_of_range {
            return Err(Box::new(AmbiguityError::site_out_of_range(assignment, length)));
        }

        // NOTE: A group with no alternatives at all rules out every variant
        let odometer = groups
            .iter()
            .all(|alternatives| !alternatives.is_empty())
            .then(|| vec![0; groups.len()]);

        let enumerator = Self {
            sequence,
            groups,
            odometer,
        };
        trace!(
            sequence = %enumerator.sequence,
            variants = enumerator.total(),
            "enumerating peptide variants"
        );
        Ok(enumerator)
    }

    /// The number of variants described, including any that have already been yielded
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.iter().map(Vec::len).product()
    }
}

impl Iterator for VariantEnumerator {
    type Item = PeptideVariant;

    fn next(&mut self) -> Option<Self::Item> {
        let odometer = self.odometer.as_mut()?;

        let chosen = self
            .groups
            .iter()
            .zip(odometer.iter())
            .flat_map(|(alternatives, &index)| &alternatives[index]);
        let variant = PeptideVariant::new(&self.sequence, chosen);

        if !advance(odometer, &self.groups) {
            self.odometer = None;
        }
        Some(variant)
    }
}

impl PeptideVariant {
    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    #[must_use]
    pub fn n_term(&self) -> Option<&str> {
        self.n_term.as_deref()
    }

    #[must_use]
    pub fn c_term(&self) -> Option<&str> {
        self.c_term.as_deref()
    }

    #[must_use]
    pub fn neutral_loss(&self) -> Option<&str> {
        self.neutral_loss.as_deref()
    }

    /// Residue modifications, in ascending residue order
    #[must_use]
    pub fn residues(&self) -> &[ModificationAssignment] {
        &self.residues
    }

    /// Every placed modification, in site order
    pub fn assignments(&self) -> impl Iterator<Item = ModificationAssignment> + '_ {
        let special = [
            (&self.n_term, ModificationSite::NTerm),
            (&self.c_term, ModificationSite::CTerm),
            (&self.neutral_loss, ModificationSite::NeutralLoss),
        ];
        special
            .into_iter()
            .filter_map(|(modification, site)| {
                modification
                    .as_deref()
                    .map(|m| ModificationAssignment::new(m, site))
            })
            .chain(self.residues.iter().cloned())
    }
}

// Variant Construction ================================================================================================

impl PeptideVariant {
    // NOTE: Assignments sharing a site are merged into a single `+`-joined modification, keeping their input order
    fn new<'a>(sequence: &str, assignments: impl IntoIterator<Item = &'a ModificationAssignment>) -> Self {
        let mut placed: Vec<_> = assignments
            .into_iter()
            .filter(|assignment| assignment.site != ModificationSite::None)
            .collect();
        placed.sort_by_key(|assignment| assignment.site);

        let mut variant = Self {
            sequence: sequence.to_owned(),
            n_term: None,
            c_term: None,
            neutral_loss: None,
            residues: Vec::new(),
        };

        let chunks = placed.into_iter().chunk_by(|assignment| assignment.site);
        for (site, chunk) in &chunks {
            let modification = chunk.map(|a| a.modification.as_str()).join("+");
            match site {
                ModificationSite::NTerm => variant.n_term = Some(modification),
                ModificationSite::CTerm => variant.c_term = Some(modification),
                ModificationSite::NeutralLoss => variant.neutral_loss = Some(modification),
                ModificationSite::Residue(_) => variant
                    .residues
                    .push(ModificationAssignment::new(modification, site)),
                ModificationSite::None => (),
            }
        }

        variant
    }
}

// NOTE: The last group turns fastest, like the digits of an odometer. Returns `false` once every digit rolls over
fn advance(odometer: &mut [usize], groups: &[Alternatives]) -> bool {
    for (digit, alternatives) in odometer.iter_mut().zip(groups).rev() {
        *digit += 1;
        if *digit < alternatives.len() {
            return true;
        }
        *digit = 0;
    }
    false
}

// Display =============================================================================================================

impl Display for PeptideVariant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(modification) = &self.n_term {
            write!(f, "({modification})-")?;
        }

        let mut residues = self.residues.iter().peekable();
        for (index, residue) in self.sequence.chars().enumerate() {
            write!(f, "{residue}")?;
            if let Some(assignment) =
                residues.next_if(|a| a.site.residue_index() == Some(index + 1))
            {
                write!(f, "({})", assignment.modification)?;
            }
        }

        if let Some(modification) = &self.c_term {
            write!(f, "-({modification})")?;
        }
        if let Some(modification) = &self.neutral_loss {
            write!(f, "[{modification}]")?;
        }
        Ok(())
    }
}

// Module Tests ========================================================================================================
