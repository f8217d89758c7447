// Standard Library Imports
use std::cmp::Ordering;

// External Crate Imports
use itertools::Itertools;
use tracing::{debug, info};

// Local Crate Imports
use crate::{
    BridgeChemistry, CombinationShape, Coverage, FragmentBuildWarning, FragmentFilter, FragmentPool, LinkHit, Peak,
    SearchResult,
    search::{LinkQuery, find_links},
    shapes::{combination_shapes, delimited_shapes},
};

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum SearchMode {
    /// Match single fragments directly, without any bridges
    Unlinked,
    #[default]
    Crosslinked,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SearchSettings {
    mode: SearchMode,
    bridge: BridgeChemistry,
    filter: Option<FragmentFilter>,
}

// Public API ==========================================================================================================

impl SearchSettings {
    #[must_use]
    pub const fn new(bridge: BridgeChemistry) -> Self {
        Self {
            mode: SearchMode::Crosslinked,
            bridge,
            filter: None,
        }
    }

    #[must_use]
    pub const fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FragmentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub const fn mode(&self) -> SearchMode {
        self.mode
    }

    #[must_use]
    pub const fn bridge(&self) -> &BridgeChemistry {
        &self.bridge
    }

    #[must_use]
    pub const fn filter(&self) -> Option<&FragmentFilter> {
        self.filter.as_ref()
    }

    /// The shapes searched against every peak, starting with the unlinked shape
    #[must_use]
    pub fn shapes(&self, pool: &FragmentPool) -> Vec<CombinationShape> {
        let max_molecules = self.bridge.max_molecules();
        let max_link_aa = pool.max_linkable();
        let shapes = if self.filter.is_some() {
            delimited_shapes(max_molecules, max_link_aa)
        } else {
            combination_shapes(max_molecules, max_link_aa)
        };
        let mut all = Vec::with_capacity(shapes.len() + 1);
        all.push(CombinationShape::unlinked());
        all.extend(shapes);
        all
    }
}

/// Searches every peak, then sorts the hits with [`default_ordering`]
#[must_use]
pub fn search<'p, P: Peak>(pool: &'p FragmentPool, peaks: &[P], settings: &SearchSettings) -> SearchResult<'p> {
    search_by(pool, peaks, settings, default_ordering(peaks))
}

/// Searches every peak, then stable-sorts the hits with `compare`
pub fn search_by<'p, P: Peak>(
    pool: &'p FragmentPool,
    peaks: &[P],
    settings: &SearchSettings,
    compare: impl FnMut(&LinkHit<'p>, &LinkHit<'p>) -> Ordering,
) -> SearchResult<'p> {
    let shapes = match settings.mode {
        SearchMode::Unlinked => Vec::new(),
        SearchMode::Crosslinked => settings.shapes(pool),
    };
    info!(
        mode = ?settings.mode,
        bridge = settings.bridge.name(),
        fragments = pool.len(),
        peaks = peaks.len(),
        shapes = %shapes.iter().join(","),
        "starting search"
    );

    let mut hits = Vec::new();
    let mut matched_peaks = Vec::new();
    for (peak_index, peak) in peaks.iter().enumerate() {
        let found = match settings.mode {
            SearchMode::Unlinked => unlinked_hits(pool, peak, peak_index, settings.filter()),
            SearchMode::Crosslinked => shapes
                .iter()
                .flat_map(|shape| {
                    let query = LinkQuery::new(shape, pool, peak, &settings.bridge)
                        .with_peak_index(peak_index)
                        .with_filter(settings.filter());
                    find_links(&query)
                })
                .collect(),
        };

        debug!(peak = peak_index, mass = peak.mass(), hits = found.len(), "searched peak");
        if !found.is_empty() {
            matched_peaks.push(peak_index);
            hits.extend(found);
        }
    }

    hits.sort_by(compare);
    let result = SearchResult::summarise(hits, matched_peaks, peaks, pool.warnings());
    info!(
        hits = result.hits.len(),
        unique = result.unique_hits,
        matched = result.matched_peaks.len(),
        explained = result.explained_fraction(),
        "finished search"
    );
    result
}

/// Smallest absolute error first, then the most intense peak, then the earliest peak
pub fn default_ordering<P: Peak>(peaks: &[P]) -> impl Fn(&LinkHit, &LinkHit) -> Ordering + '_ {
    let intensity = |peak_index: usize| peaks.get(peak_index).map_or(0.0, Peak::intensity);
    move |a, b| {
        a.error()
            .abs()
            .total_cmp(&b.error().abs())
            .then_with(|| intensity(b.peak_index()).total_cmp(&intensity(a.peak_index())))
            .then_with(|| a.peak_index().cmp(&b.peak_index()))
    }
}

impl<'p> SearchResult<'p> {
    /// Every hit, in sorted order
    #[must_use]
    pub fn hits(&self) -> &[LinkHit<'p>] {
        &self.hits
    }

    /// Hits left after collapsing neighbours with the same error and the same first fragment
    #[must_use]
    pub const fn unique_hits(&self) -> usize {
        self.unique_hits
    }

    /// Indices of the peaks explained by at least one hit, in ascending order
    #[must_use]
    pub fn matched_peaks(&self) -> &[usize] {
        &self.matched_peaks
    }

    #[must_use]
    pub const fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    #[must_use]
    pub const fn explained_intensity(&self) -> f64 {
        self.explained_intensity
    }

    #[must_use]
    pub const fn total_intensity(&self) -> f64 {
        self.total_intensity
    }

    /// The share of the total ion current explained by matched peaks
    #[must_use]
    pub fn explained_fraction(&self) -> f64 {
        if self.total_intensity > 0.0 {
            self.explained_intensity / self.total_intensity
        } else {
            0.0
        }
    }

    /// Fragments that were skipped while building the pool
    #[must_use]
    pub fn warnings(&self) -> &[FragmentBuildWarning] {
        &self.warnings
    }
}

// Search Helpers ======================================================================================================

fn unlinked_hits<'p>(
    pool: &'p FragmentPool,
    peak: &impl Peak,
    peak_index: usize,
    filter: Option<&FragmentFilter>,
) -> Vec<LinkHit<'p>> {
    pool.fragments()
        .filter(|fragment| peak.is_match(fragment.mass()))
        .filter(|fragment| filter.is_none_or(|filter| filter.matches(fragment)))
        .map(|fragment| LinkHit {
            fragments: vec![fragment],
            bridges: 0,
            mass: fragment.mass(),
            formula: fragment.formula().clone(),
            error: peak.mass() - fragment.mass(),
            peak_index,
        })
        .collect()
}

impl<'p> SearchResult<'p> {
    fn summarise<P: Peak>(
        hits: Vec<LinkHit<'p>>,
        matched_peaks: Vec<usize>,
        peaks: &[P],
        warnings: &[FragmentBuildWarning],
    ) -> Self {
        let unique_hits = hits
            .iter()
            .dedup_by(|a, b| {
                a.error.total_cmp(&b.error).is_eq()
                    && a.fragments.first().map(|f| f.sequence()) == b.fragments.first().map(|f| f.sequence())
            })
            .count();

        let coverage = Coverage::from_ranges(
            hits.iter()
                .flat_map(|hit| &hit.fragments)
                .map(|fragment| (fragment.entry(), fragment.start()..=fragment.end())),
        );

        let explained_intensity = matched_peaks.iter().map(|&i| peaks[i].intensity()).sum();
        let total_intensity = peaks.iter().map(Peak::intensity).sum();

        Self {
            hits,
            unique_hits,
            matched_peaks,
            coverage,
            explained_intensity,
            total_intensity,
            warnings: warnings.to_vec(),
        }
    }
}

// Module Tests ========================================================================================================
