// Standard Library Imports
use std::{iter, ops::RangeInclusive, str::FromStr};

// External Crate Imports
use crosslinks::{
    BridgeChemistry, ChemistryConfigError, DigestedFragment, FragmentFilter, LinkSite, ObservedPeak, SearchMode,
    SearchSettings, Tolerance,
};
use formula::{AtomicDatabase, ElementalFormula, FormulaError, MassType};
use knuffel::{
    Decode,
    span::{Span, Spanned},
};
use miette::{Diagnostic, LabeledSpan, NamedSource};
use thiserror::Error;

/// Everything needed to run a single search, read from a KDL job file
#[derive(Clone, PartialEq, Debug)]
pub struct Job {
    pub settings: SearchSettings,
    pub mass_type: MassType,
    pub max_fragment_mass: f64,
    pub fragments: Vec<DigestedFragment>,
    pub peaks: Vec<ObservedPeak>,
    /// (modification, residue) pairs to rank site scores for
    pub site_targets: Vec<(String, char)>,
}

// Public API ==========================================================================================================

impl Job {
    pub fn from_kdl(
        db: &AtomicDatabase,
        file_name: impl AsRef<str>,
        kdl_text: impl AsRef<str>,
    ) -> miette::Result<Self> {
        let parsed_job: JobKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed_job
            .validate(db)
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct JobKdl {
    #[knuffel(child)]
    search: SearchKdl,
    #[knuffel(child)]
    bridge: BridgeKdl,
    #[knuffel(child)]
    filter: Option<FilterKdl>,
    #[knuffel(child)]
    fragments: FragmentsKdl,
    #[knuffel(child)]
    peaks: PeaksKdl,
    #[knuffel(child)]
    site_scores: Option<SiteScoresKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct SearchKdl {
    #[knuffel(property, default)]
    mode: Option<Spanned<String, Span>>,
    #[knuffel(property(name = "mass-type"), default)]
    mass_type: Option<Spanned<String, Span>>,
    #[knuffel(property(name = "max-fragment-mass"))]
    max_fragment_mass: Spanned<String, Span>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct BridgeKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(argument)]
    name: String,
    #[knuffel(property)]
    formula: String,
    #[knuffel(property(name = "max-molecules"))]
    max_molecules: usize,
    #[knuffel(child, unwrap(arguments))]
    end_a: Vec<Spanned<String, Span>>,
    #[knuffel(child, unwrap(arguments), default)]
    end_b: Vec<Spanned<String, Span>>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct FilterKdl {
    #[knuffel(property, default)]
    peptide: Option<String>,
    #[knuffel(property, default)]
    requires: Option<String>,
    #[knuffel(property, default)]
    forbids: Option<String>,
    #[knuffel(child)]
    window: Option<WindowKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct WindowKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(property)]
    entry: usize,
    #[knuffel(property)]
    from: usize,
    #[knuffel(property)]
    to: usize,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct FragmentsKdl {
    #[knuffel(children(name = "fragment"))]
    fragments: Vec<FragmentKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct FragmentKdl {
    #[knuffel(argument)]
    sequence: String,
    #[knuffel(property, default)]
    entry: usize,
    #[knuffel(property)]
    start: usize,
    #[knuffel(property)]
    end: usize,
    #[knuffel(property)]
    formula: Spanned<String, Span>,
    #[knuffel(property, default)]
    modifications: String,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct PeaksKdl {
    #[knuffel(property)]
    tolerance: Spanned<String, Span>,
    #[knuffel(property, default)]
    unit: Option<Spanned<String, Span>>,
    #[knuffel(children(name = "peak"))]
    peaks: Vec<PeakKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct PeakKdl {
    #[knuffel(argument)]
    mz: Spanned<String, Span>,
    #[knuffel(property, default = 1)]
    charge: u32,
    #[knuffel(property, default)]
    intensity: Option<Spanned<String, Span>>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct SiteScoresKdl {
    #[knuffel(children(name = "target"))]
    targets: Vec<SiteTargetKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct SiteTargetKdl {
    #[knuffel(argument)]
    modification: String,
    #[knuffel(property)]
    residue: Spanned<String, Span>,
}

// Job Validation ======================================================================================================

type ConfigResult<T> = Result<T, ConfigErrorKind>;

impl JobKdl {
    fn validate(self, db: &AtomicDatabase) -> ConfigResult<Job> {
        let mass_type = self.search.mass_type.map_or(Ok(MassType::default()), |mass_type| {
            match mass_type.as_str() {
                "monoisotopic" => Ok(MassType::Monoisotopic),
                "average" => Ok(MassType::Average),
                _ => Err(ConfigErrorKind::UnknownMassType(mass_type.span().clone(), (*mass_type).clone())),
            }
        })?;
        let mode = self.search.mode.map_or(Ok(SearchMode::default()), |mode| match mode.as_str() {
            "crosslinked" => Ok(SearchMode::Crosslinked),
            "unlinked" => Ok(SearchMode::Unlinked),
            _ => Err(ConfigErrorKind::UnknownMode(mode.span().clone(), (*mode).clone())),
        })?;
        let max_fragment_mass = parse_number(&self.search.max_fragment_mass)?;

        let bridge = self.bridge.validate(db, mass_type)?;
        let mut settings = SearchSettings::new(bridge).with_mode(mode);
        if let Some(filter) = self.filter {
            settings = settings.with_filter(filter.validate()?);
        }

        let fragments = self
            .fragments
            .fragments
            .into_iter()
            .map(FragmentKdl::validate)
            .collect::<ConfigResult<_>>()?;
        let peaks = self.peaks.validate()?;
        let site_targets = self
            .site_scores
            .into_iter()
            .flat_map(|scores| scores.targets)
            .map(SiteTargetKdl::validate)
            .collect::<ConfigResult<_>>()?;

        Ok(Job {
            settings,
            mass_type,
            max_fragment_mass,
            fragments,
            peaks,
            site_targets,
        })
    }
}

impl BridgeKdl {
    fn validate(self, db: &AtomicDatabase, mass_type: MassType) -> ConfigResult<BridgeChemistry> {
        let link_sites = |sites: Vec<Spanned<String, Span>>| -> ConfigResult<Vec<LinkSite>> {
            sites
                .into_iter()
                .map(|site| site.parse().map_err(|e| ConfigErrorKind::LinkSite(site.span().clone(), e)))
                .collect()
        };
        let end_a = link_sites(self.end_a)?;
        let end_b = link_sites(self.end_b)?;

        BridgeChemistry::new(
            db,
            mass_type,
            self.name,
            &self.formula,
            self.max_molecules,
            end_a,
            end_b,
        )
        .map_err(|e| ConfigErrorKind::Bridge(self.span, e))
    }
}

impl FilterKdl {
    fn validate(self) -> ConfigResult<FragmentFilter> {
        let mut filter = FragmentFilter::new();
        if let Some(peptide) = self.peptide {
            filter = filter.with_peptide(peptide);
        }
        // NOTE: `forbids` is applied last, so it wins if both are given
        if let Some(modification) = self.requires {
            filter = filter.requiring(modification);
        }
        if let Some(modification) = self.forbids {
            filter = filter.forbidding(modification);
        }
        if let Some(WindowKdl { span, entry, from, to }) = self.window {
            if from > to {
                return Err(ConfigErrorKind::EmptyWindow(span, from..=to));
            }
            filter = filter.within(entry, from..=to);
        }
        Ok(filter)
    }
}

impl FragmentKdl {
    fn validate(self) -> ConfigResult<DigestedFragment> {
        let formula = ElementalFormula::new(&*self.formula)
            .map_err(|e| ConfigErrorKind::Formula(self.formula.span().clone(), *e))?;
        Ok(DigestedFragment::new(
            self.sequence,
            self.entry,
            self.start,
            self.end,
            formula,
            self.modifications,
        ))
    }
}

impl PeaksKdl {
    fn validate(self) -> ConfigResult<Vec<ObservedPeak>> {
        let width = parse_number(&self.tolerance)?;
        let tolerance = match self.unit {
            None => Tolerance::Ppm(width),
            Some(unit) => match unit.as_str() {
                "ppm" => Tolerance::Ppm(width),
                "da" | "Da" => Tolerance::Da(width),
                _ => return Err(ConfigErrorKind::UnknownUnit(unit.span().clone(), (*unit).clone())),
            },
        };

        self.peaks
            .into_iter()
            .map(|peak| {
                let mz = parse_number(&peak.mz)?;
                let intensity = peak.intensity.as_ref().map_or(Ok(0.0), parse_number)?;
                Ok(ObservedPeak::from_mz(mz, peak.charge, tolerance, intensity))
            })
            .collect()
    }
}

impl SiteTargetKdl {
    fn validate(self) -> ConfigResult<(String, char)> {
        let mut chars = self.residue.chars();
        match (chars.next(), chars.next()) {
            (Some(residue), None) if residue.is_ascii_uppercase() => Ok((self.modification, residue)),
            _ => Err(ConfigErrorKind::InvalidResidue(self.residue.span().clone(), (*self.residue).clone())),
        }
    }
}

fn parse_number(text: &Spanned<String, Span>) -> ConfigResult<f64> {
    f64::from_str(text).map_err(|_| ConfigErrorKind::InvalidNumber(text.span().clone(), (**text).clone()))
}

// Validation Error Types and Trait Implementations  ===================================================================

#[derive(Debug, Error)]
#[error("failed to validate search job file")]
pub struct ConfigError {
    kdl: NamedSource,
    #[source]
    kind: ConfigErrorKind,
}

// NOTE: This is manually implemented because the label is extracted from `self.kind`
impl Diagnostic for ConfigError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (span, label) = self.kind.label();
        Some(Box::new(iter::once(LabeledSpan::new_with_span(
            Some(label.to_owned()),
            span.clone(),
        ))))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, Diagnostic, Error)]
enum ConfigErrorKind {
    #[error("{1:?} is not a number")]
    InvalidNumber(Span, String),

    #[diagnostic(help("the search mode must be either \"crosslinked\" or \"unlinked\""))]
    #[error("unknown search mode {1:?}")]
    UnknownMode(Span, String),

    #[diagnostic(help("the mass type must be either \"monoisotopic\" or \"average\""))]
    #[error("unknown mass type {1:?}")]
    UnknownMassType(Span, String),

    #[diagnostic(help("tolerances are given in either \"ppm\" or \"da\""))]
    #[error("unknown tolerance unit {1:?}")]
    UnknownUnit(Span, String),

    #[error("the protein window {1:?} contains no residues")]
    EmptyWindow(Span, RangeInclusive<usize>),

    #[diagnostic(help("site scores are tracked for single, uppercase amino acid letters"))]
    #[error("{1:?} is not an amino acid residue")]
    InvalidResidue(Span, String),

    #[error("job file contained an invalid link site")]
    LinkSite(
        Span,
        #[source]
        #[diagnostic_source]
        ChemistryConfigError,
    ),

    #[error("job file contained an invalid bridge")]
    Bridge(
        Span,
        #[source]
        #[diagnostic_source]
        ChemistryConfigError,
    ),

    #[error("job file contained an invalid fragment formula")]
    Formula(
        Span,
        #[source]
        #[diagnostic_source]
        FormulaError,
    ),
}

impl ConfigErrorKind {
    const fn label(&self) -> (&Span, &'static str) {
        match self {
            Self::InvalidNumber(s, _) => (s, "expected a number"),
            Self::UnknownMode(s, _) => (s, "unknown mode"),
            Self::UnknownMassType(s, _) => (s, "unknown mass type"),
            Self::UnknownUnit(s, _) => (s, "unknown unit"),
            Self::EmptyWindow(s, _) => (s, "empty window"),
            Self::InvalidResidue(s, _) => (s, "not a residue"),
            Self::LinkSite(s, _) => (s, "invalid link site"),
            Self::Bridge(s, _) => (s, "invalid bridge"),
            Self::Formula(s, _) => (s, "invalid formula"),
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> ConfigError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        ConfigError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================
