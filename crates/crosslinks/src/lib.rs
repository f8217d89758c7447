//! Crosslinked-peptide mass matching: bucketing digested fragments by how many residues a bridge can react with, then
//! searching every combination of fragments and bridges for one that explains an observed peak

pub mod bridge;
pub mod coverage;
pub mod errors;
pub mod filter;
pub mod orchestrator;
pub mod peak;
pub mod pool;
pub mod search;
pub mod shapes;

// Standard Library Imports
use std::{collections::BTreeMap, ops::RangeInclusive};

// External Crate Imports
use ambiguity::AmbiguityString;
use formula::ElementalFormula;

pub use errors::{ChemistryConfigError, FragmentBuildWarning};
pub use orchestrator::{SearchMode, SearchSettings, default_ordering, search, search_by};
pub use peak::{ObservedPeak, Peak, Tolerance};
pub use search::{LinkQuery, find_links};
pub use shapes::{combination_shapes, delimited_shapes};

/// The mass of a proton, in Daltons
pub const PROTON_MASS: f64 = 1.007_276_466_621;

// ---------------------------------------------------------------------------------------------------------------------

/// A crosslinking reagent: what it adds to a molecule, and which sites each of its ends can react with
#[derive(Clone, PartialEq, Debug)]
pub struct BridgeChemistry {
    name: String,
    formula: ElementalFormula,
    mass: f64,
    max_molecules: usize,
    link_sites: Vec<LinkSite>,
    // NOTE: Sites before this index belong to end A, the rest to end B. `None` means both ends are equivalent
    end_index: Option<usize>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum LinkSite {
    Residue(char),
    PeptideNTerm,
    ProteinNTerm,
}

/// A peptide produced by digestion, before it's been weighed or checked for linkable residues
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DigestedFragment {
    sequence: String,
    entry: usize,
    start: usize,
    end: usize,
    formula: ElementalFormula,
    modifications: String,
}

#[derive(Clone, PartialEq, Debug)]
pub struct PotentialLinkFragment {
    sequence: String,
    entry: usize,
    start: usize,
    end: usize,
    /// MH+
    mass: f64,
    /// Neutral, including modifications
    formula: ElementalFormula,
    modifications: AmbiguityString,
    /// Unmodified residues matching each of the bridge's link sites, in the same order
    site_counts: Vec<usize>,
}

/// Fragments bucketed by their number of linkable residues, each bucket sorted by ascending mass
#[derive(Clone, PartialEq, Debug, Default)]
pub struct FragmentPool {
    buckets: Vec<Vec<PotentialLinkFragment>>,
    warnings: Vec<FragmentBuildWarning>,
}

/// How many linkable residues each fragment of a candidate contributes, in non-increasing order
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct CombinationShape(Vec<usize>);

/// Restricts the first fragment of every candidate, for when one crosslinking partner is already known
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct FragmentFilter {
    peptide: Option<String>,
    modification: Option<ModificationRequirement>,
    window: Option<ProteinWindow>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ModificationRequirement {
    Required(String),
    Forbidden(String),
}

/// An inclusive range of residues within a single protein entry
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct ProteinWindow {
    entry: usize,
    residues: RangeInclusive<usize>,
}

/// A set of fragments and bridges whose combined mass matches a peak
#[derive(Clone, PartialEq, Debug)]
pub struct LinkHit<'p> {
    fragments: Vec<&'p PotentialLinkFragment>,
    bridges: usize,
    mass: f64,
    formula: ElementalFormula,
    error: f64,
    peak_index: usize,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SearchResult<'p> {
    hits: Vec<LinkHit<'p>>,
    unique_hits: usize,
    matched_peaks: Vec<usize>,
    coverage: Coverage,
    explained_intensity: f64,
    total_intensity: f64,
    warnings: Vec<FragmentBuildWarning>,
}

/// The residues of each protein entry covered by at least one hit, as merged, sorted ranges
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Coverage(BTreeMap<usize, Vec<RangeInclusive<usize>>>);
