// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use formula::{Count, ElementalFormula};
use itertools::Itertools;
use tracing::trace;

// Local Crate Imports
use crate::{
    BridgeChemistry, CombinationShape, FragmentFilter, FragmentPool, LinkHit, PROTON_MASS, Peak,
    PotentialLinkFragment,
};

/// Everything needed to search a single shape against a single peak
#[derive(Copy, Clone)]
pub struct LinkQuery<'a, 'p> {
    pub shape: &'a CombinationShape,
    pub pool: &'p FragmentPool,
    pub peak: &'a dyn Peak,
    pub peak_index: usize,
    pub bridge_mass: f64,
    pub bridge_formula: &'a ElementalFormula,
    /// Splits each fragment's link sites between the two ends of an asymmetric bridge
    pub end_index: Option<usize>,
    /// Restricts the first fragment of the shape. See [`crate::shapes::delimited_shapes`]
    pub filter: Option<&'a FragmentFilter>,
}

// Public API ==========================================================================================================

impl<'a, 'p> LinkQuery<'a, 'p> {
    #[must_use]
    pub fn new(
        shape: &'a CombinationShape,
        pool: &'p FragmentPool,
        peak: &'a dyn Peak,
        bridge: &'a BridgeChemistry,
    ) -> Self {
        Self {
            shape,
            pool,
            peak,
            peak_index: 0,
            bridge_mass: bridge.mass(),
            bridge_formula: bridge.formula(),
            end_index: bridge.end_index(),
            filter: None,
        }
    }

    #[must_use]
    pub const fn with_peak_index(mut self, peak_index: usize) -> Self {
        self.peak_index = peak_index;
        self
    }

    #[must_use]
    pub const fn with_filter(mut self, filter: Option<&'a FragmentFilter>) -> Self {
        self.filter = filter;
        self
    }
}

/// Finds every combination of fragments (laid out like `query.shape`) and bridges whose mass matches `query.peak`
///
/// Each bridge joins two linkable residues, so a shape of `n` fragments needs at least `n - 1` bridges to hold together
/// and can take at most half of its linkable residues' worth. Every unordered combination of fragments is reported
/// once, in the order fragments appear in the pool
#[must_use]
pub fn find_links<'p>(query: &LinkQuery<'_, 'p>) -> Vec<LinkHit<'p>> {
    let molecules = query.shape.molecules();
    let mut hits = Vec::new();
    if molecules == 0 {
        return hits;
    }

    for bridges in molecules - 1..=query.shape.linkable() / 2 {
        let start_mass = query
            .bridge_mass
            .mul_add(count_f64(bridges), -count_f64(molecules - 1) * PROTON_MASS);
        let mut search = Search {
            query,
            bridges,
            chosen: Vec::with_capacity(molecules),
            hits: &mut hits,
        };
        search.extend(start_mass);
    }

    trace!(
        shape = %query.shape,
        peak = query.peak_index,
        hits = hits.len(),
        "searched shape"
    );
    hits
}

impl<'p> LinkHit<'p> {
    #[must_use]
    pub fn fragments(&self) -> &[&'p PotentialLinkFragment] {
        &self.fragments
    }

    #[must_use]
    pub const fn bridges(&self) -> usize {
        self.bridges
    }

    /// MH+
    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// The neutral formula of the whole crosslinked molecule
    #[must_use]
    pub const fn formula(&self) -> &ElementalFormula {
        &self.formula
    }

    /// The observed mass minus the mass of this hit
    #[must_use]
    pub const fn error(&self) -> f64 {
        self.error
    }

    #[must_use]
    pub const fn peak_index(&self) -> usize {
        self.peak_index
    }
}

impl Display for LinkHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let fragments = self.fragments.iter().format_with("--", |fragment, f| {
            let modifications = fragment.modifications().to_string();
            if modifications.is_empty() {
                f(&format_args!("{}", fragment.sequence()))
            } else {
                f(&format_args!("{}[{modifications}]", fragment.sequence()))
            }
        });
        let plural = if self.bridges == 1 { "" } else { "s" };
        write!(f, "{fragments} ({} bridge{plural})", self.bridges)
    }
}

// Recursive Search ====================================================================================================

struct Search<'s, 'a, 'p> {
    query: &'s LinkQuery<'a, 'p>,
    bridges: usize,
    // NOTE: Each chosen fragment along with its (bucket, index) position in the pool
    chosen: Vec<(usize, usize, &'p PotentialLinkFragment)>,
    hits: &'s mut Vec<LinkHit<'p>>,
}

impl<'p> Search<'_, '_, 'p> {
    fn extend(&mut self, mass: f64) {
        let depth = self.chosen.len();
        let digits = self.query.shape.digits();
        let Some(&digit) = digits.get(depth) else {
            self.check(mass);
            return;
        };

        let limit = self.query.peak.mass() + self.query.peak.tolerance();
        let bucket = self.query.pool.bucket(digit);
        for (index, fragment) in bucket.iter().enumerate().skip(self.first_index(depth, digit)) {
            let total = mass + fragment.mass();
            // NOTE: Buckets are sorted by mass, so nothing after this fragment can fit either
            if total > limit {
                break;
            }
            if !self.admits(depth, digit, index, fragment) {
                continue;
            }

            self.chosen.push((digit, index, fragment));
            self.extend(total);
            self.chosen.pop();
        }
    }

    // NOTE: Repeating a digit restarts the scan at the previous fragment, so that `{A, B}` is never also found as
    // `{B, A}`. When filtering, the first fragment stands apart from the rest of the shape
    fn first_index(&self, depth: usize, digit: usize) -> usize {
        let independent_from = if self.query.filter.is_some() { 2 } else { 1 };
        if depth < independent_from {
            return 0;
        }
        match self.chosen[depth - 1] {
            (previous, index, _) if previous == digit => index,
            _ => 0,
        }
    }

    fn admits(&self, depth: usize, digit: usize, index: usize, fragment: &PotentialLinkFragment) -> bool {
        let Some(filter) = self.query.filter else {
            return true;
        };
        if depth == 0 {
            return filter.matches(fragment);
        }
        // NOTE: A later fragment that could also have been first is only taken if it sorts after the first fragment,
        // otherwise the same combination would turn up again with the two swapped
        let (first_digit, first_index, _) = self.chosen[0];
        !filter.matches(fragment) || (digit, index) >= (first_digit, first_index)
    }

    fn check(&mut self, mass: f64) {
        let peak = self.query.peak;
        if !peak.is_match(mass) {
            return;
        }

        let (end_a, end_b) = self
            .chosen
            .iter()
            .map(|(_, _, fragment)| fragment.end_counts(self.query.end_index))
            .fold((0, 0), |(a, b), (fa, fb)| (a + fa, b + fb));
        if end_a < self.bridges || end_b < self.bridges {
            trace!(bridges = self.bridges, end_a, end_b, "rejected unbalanced hit");
            return;
        }

        let mut formula = self.query.bridge_formula * count(self.bridges);
        for (_, _, fragment) in &self.chosen {
            formula += fragment.formula();
        }

        self.hits.push(LinkHit {
            fragments: self.chosen.iter().map(|&(_, _, fragment)| fragment).collect(),
            bridges: self.bridges,
            mass,
            formula,
            error: peak.mass() - mass,
            peak_index: self.query.peak_index,
        });
    }
}

// NOTE: Shapes and bridge counts are tiny, so these conversions are always exact
#[allow(clippy::cast_precision_loss)]
fn count_f64(n: usize) -> f64 {
    n as f64
}

#[allow(clippy::cast_possible_wrap)]
fn count(n: usize) -> Count {
    n as Count
}

// Module Tests ========================================================================================================
