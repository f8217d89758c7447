//! Modification-ambiguity strings: parsing them, enumerating the peptide variants they describe, and ranking the
//! modification sites they pin down

pub mod ambiguity_string;
pub mod errors;
mod parser;
pub mod site_scores;
pub mod variants;

// Standard Library Imports
use std::{collections::BTreeMap, num::NonZeroUsize};

pub use errors::{AmbiguityError, Result};
pub use parser::AmbiguityErrorKind;

// ---------------------------------------------------------------------------------------------------------------------

/// Where a modification sits on a peptide
///
/// Variants are declared in placement order: the termini and neutral losses always sort before residues
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum ModificationSite {
    /// A placeholder for "no modification", never placed on a variant
    None,
    NTerm,
    CTerm,
    NeutralLoss,
    /// A 1-based residue index
    Residue(NonZeroUsize),
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ModificationAssignment {
    modification: String,
    site: ModificationSite,
}

/// A confidence score attached to an unambiguous assignment, like the `12.5` in `Phospho@3=12.5`
#[derive(Clone, PartialEq, Debug)]
pub struct Score {
    value: f64,
    // NOTE: Kept so that formatting reproduces the input exactly (`=1.50` stays `=1.50`)
    text: String,
}

/// A parsed modification string: `;`-separated groups, in input order
#[derive(Clone, PartialEq, Debug, Default)]
pub struct AmbiguityString {
    groups: Vec<AmbiguityGroup>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum AmbiguityGroup {
    /// `Phospho@3` or `Phospho@3=12.5`
    Unambiguous {
        assignment: ModificationAssignment,
        score: Option<Score>,
    },
    /// `Phospho@1|2|3`, `Phospho@11&15|11&17`, or `Oxidation@6&Phospho@1|Oxidation@7&Phospho@1`
    Simple(Vec<Vec<Term>>),
    /// `Acetyl&Phospho@(1&(3|4))|(2&5)`: one site per modification along every path through `sites`
    Complex {
        modifications: Vec<String>,
        sites: SiteExpr,
    },
}

/// One `&`-joined term of a simple group. Terms without a modification inherit the most recently named one
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Term {
    modification: Option<String>,
    site: ModificationSite,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SiteExpr {
    Site(ModificationSite),
    /// `&`: every member contributes sites, in order
    All(Vec<SiteExpr>),
    /// `|`: exactly one member contributes sites
    Any(Vec<SiteExpr>),
    /// A parenthesised sub-expression
    Nested(Box<SiteExpr>),
}

/// A peptide with every modification pinned to a single site
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PeptideVariant {
    sequence: String,
    n_term: Option<String>,
    c_term: Option<String>,
    neutral_loss: Option<String>,
    residues: Vec<ModificationAssignment>,
}

/// Yields every [`PeptideVariant`] described by a set of alternative groups, varying the last group fastest
#[derive(Clone, Debug)]
pub struct VariantEnumerator {
    sequence: String,
    groups: Vec<Vec<Vec<ModificationAssignment>>>,
    odometer: Option<Vec<usize>>,
}

/// The best score seen for each registered (modification, residue) site, across many modification strings
#[derive(Clone, PartialEq, Debug, Default)]
pub struct SiteScores {
    targets: Vec<SiteTarget>,
    sites: BTreeMap<ScoredSite, SiteScore>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SiteTarget {
    modification: String,
    residue: char,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ScoredSite {
    modification: String,
    residue: char,
    position: usize,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SiteScore {
    score: f64,
    source_index: usize,
}
