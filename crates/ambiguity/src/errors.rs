use miette::Diagnostic;
use nom_miette::LabeledError;
use thiserror::Error;

use crate::{ModificationAssignment, parser::AmbiguityErrorKind};

pub type Result<T, E = Box<AmbiguityError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum AmbiguityError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] LabeledError<AmbiguityErrorKind>),

    #[diagnostic(help("check that the modification string was written for this peptide"))]
    #[error("{modification} is placed on residue {site}, but the peptide only has {length} residues")]
    SiteOutOfRange {
        modification: String,
        site: usize,
        length: usize,
    },
}

impl AmbiguityError {
    pub(crate) fn site_out_of_range(assignment: &ModificationAssignment, length: usize) -> Self {
        Self::SiteOutOfRange {
            modification: assignment.modification().to_owned(),
            site: assignment.site().residue_index().unwrap_or_default(),
            length,
        }
    }
}
