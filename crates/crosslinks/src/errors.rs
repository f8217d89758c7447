use ambiguity::AmbiguityError;
use formula::FormulaError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum ChemistryConfigError {
    #[error("the formula of the {0} bridge could not be parsed")]
    InvalidFormula(String, #[source] Box<FormulaError>),

    #[diagnostic(help("double-check for typos, or add the missing element to the atomic database"))]
    #[error("the formula of the {0} bridge could not be weighed")]
    UnknownElement(String, #[source] Box<FormulaError>),

    #[diagnostic(help("a bridge can only join a single molecule if it's a loop-link, so this must be at least 1"))]
    #[error("the {0} bridge must be allowed to join at least one molecule")]
    ZeroMolecules(String),

    #[diagnostic(help("list at least one residue, N-term, or Protein N-term for end A"))]
    #[error("the {0} bridge has no link sites")]
    NoLinkSites(String),

    #[diagnostic(help("symmetric bridges only need end A; asymmetric bridges can't share sites between ends"))]
    #[error("the {0} bridge lists {1} as a site for both of its ends")]
    OverlappingEnds(String, String),

    #[diagnostic(help("link sites are single amino acid letters, N-term, or Protein N-term"))]
    #[error("{0:?} is not a valid link site")]
    UnknownLinkSite(String),
}

/// A digested fragment that couldn't be added to the pool. The fragment is skipped and the search continues
#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum FragmentBuildWarning {
    #[error("{sequence} (starting at {start}) is {length} residues long, but its coordinates span {start}-{end}")]
    Coordinates {
        sequence: String,
        start: usize,
        end: usize,
        length: usize,
    },

    #[error("{sequence} (starting at {start}) has an invalid modification string")]
    InvalidModifications {
        sequence: String,
        start: usize,
        #[source]
        source: Box<AmbiguityError>,
    },

    #[diagnostic(help("expand ambiguous modifications into separate fragments before building the pool"))]
    #[error("{sequence} (starting at {start}) has ambiguous modifications: {modifications}")]
    AmbiguousModifications {
        sequence: String,
        start: usize,
        modifications: String,
    },

    #[error("{sequence} (starting at {start}) has a {modification} modification on residue {site}, past its end")]
    SiteOutOfRange {
        sequence: String,
        start: usize,
        modification: String,
        site: usize,
    },

    #[error("{sequence} (starting at {start}) has more than one modification on residue {site}")]
    DuplicateModification {
        sequence: String,
        start: usize,
        site: usize,
    },

    #[error("{sequence} (starting at {start}) could not be weighed")]
    UnknownElement {
        sequence: String,
        start: usize,
        #[source]
        source: Box<FormulaError>,
    },
}
