use miette::Diagnostic;
use nom_miette::LabeledError;
use thiserror::Error;

use crate::{MassNumber, parser::FormulaErrorKind};

pub type Result<T, E = Box<FormulaError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum FormulaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] LabeledError<FormulaErrorKind>),

    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error("the element {0:?} could not be found in the supplied atomic database")]
    Element(String),

    #[diagnostic(help("double-check for typos, or add a new entry to the atomic database"))]
    #[error("the isotope \"{1}{0}\" could not be found in the supplied atomic database")]
    Isotope(String, MassNumber),
}

impl FormulaError {
    pub(crate) fn element(symbol: &str) -> Self {
        Self::Element(symbol.to_owned())
    }

    pub(crate) fn isotope(symbol: &str, mass_number: MassNumber) -> Self {
        Self::Isotope(symbol.to_owned(), mass_number)
    }
}
