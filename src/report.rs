// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use ambiguity::SiteScores;
use crosslinks::{Peak, SearchResult, SearchSettings};

/// A tab-separated summary of a finished search: one line per hit, then totals, coverage, and site scores
pub struct SearchReport<'r, 'p, P> {
    result: &'r SearchResult<'p>,
    peaks: &'r [P],
    settings: &'r SearchSettings,
    site_scores: SiteScores,
}

// Public API ==========================================================================================================

impl<'r, 'p, P: Peak> SearchReport<'r, 'p, P> {
    pub fn new(
        result: &'r SearchResult<'p>,
        peaks: &'r [P],
        settings: &'r SearchSettings,
        site_targets: &[(String, char)],
    ) -> Self {
        let mut site_scores = SiteScores::new(site_targets.iter().cloned());
        for hit in result.hits() {
            for fragment in hit.fragments() {
                site_scores.add_parsed(
                    fragment.sequence(),
                    fragment.modifications(),
                    fragment.start() - 1,
                    hit.peak_index(),
                );
            }
        }

        Self {
            result,
            peaks,
            settings,
            site_scores,
        }
    }

    #[must_use]
    pub const fn site_scores(&self) -> &SiteScores {
        &self.site_scores
    }
}

// Report Formatting ===================================================================================================

impl<P: Peak> Display for SearchReport<'_, '_, P> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let bridge = self.settings.bridge();
        writeln!(
            f,
            "# {} ({:.6} Da), up to {} molecules, {:?} search",
            bridge.name(),
            bridge.mass(),
            bridge.max_molecules(),
            self.settings.mode()
        )?;

        writeln!(f, "peak\tobserved\ttheoretical\terror (ppm)\tbridges\tcandidate\tformula")?;
        for hit in self.result.hits() {
            let observed = self.peaks.get(hit.peak_index()).map_or(f64::NAN, Peak::mass);
            writeln!(
                f,
                "{}\t{observed:.6}\t{:.6}\t{:.2}\t{}\t{hit}\t{}",
                hit.peak_index(),
                hit.mass(),
                hit.error() / observed * 1e6,
                hit.bridges(),
                hit.formula()
            )?;
        }

        writeln!(f)?;
        writeln!(f, "hits\t{}", self.result.hits().len())?;
        writeln!(f, "unique hits\t{}", self.result.unique_hits())?;
        writeln!(
            f,
            "matched peaks\t{}/{}",
            self.result.matched_peaks().len(),
            self.peaks.len()
        )?;
        writeln!(f, "explained intensity\t{:.2}%", self.result.explained_fraction() * 100.0)?;
        writeln!(f, "skipped fragments\t{}", self.result.warnings().len())?;

        let coverage = self.result.coverage();
        if !coverage.is_empty() {
            writeln!(f)?;
            writeln!(f, "entry\tcovered residues\tranges")?;
            for entry in coverage.entries() {
                let ranges: Vec<_> = coverage
                    .ranges(entry)
                    .iter()
                    .map(|range| format!("{}-{}", range.start(), range.end()))
                    .collect();
                writeln!(f, "{entry}\t{}\t{}", coverage.covered(entry), ranges.join(","))?;
            }
        }

        if !self.site_scores.is_empty() {
            writeln!(f)?;
            writeln!(f, "modification\tresidue\tposition\tscore\tpeak")?;
            for (site, score) in self.site_scores.ranked() {
                writeln!(
                    f,
                    "{}\t{}\t{}\t{}\t{}",
                    site.modification(),
                    site.residue(),
                    site.position(),
                    score.score(),
                    score.source_index()
                )?;
            }
        }

        Ok(())
    }
}

// Module Tests ========================================================================================================
