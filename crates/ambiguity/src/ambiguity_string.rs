// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroUsize,
};

// External Crate Imports
use itertools::Itertools;
use nom_miette::final_parser;

// Local Crate Imports
use crate::{
    AmbiguityGroup, AmbiguityString, ModificationAssignment, ModificationSite, Result, Score, SiteExpr, Term,
    parser::ambiguity_string,
};

// Public API ==========================================================================================================

impl AmbiguityString {
    pub fn new(text: impl AsRef<str>) -> Result<Self> {
        final_parser(ambiguity_string)(text.as_ref()).map_err(|e| Box::new(e.into()))
    }

    #[must_use]
    pub fn groups(&self) -> &[AmbiguityGroup] {
        &self.groups
    }

    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.groups.iter().any(AmbiguityGroup::is_ambiguous)
    }

    /// The unambiguous groups, optionally with their `=score` suffixes removed
    #[must_use]
    pub fn unambiguous(&self, chop_scores: bool) -> String {
        self.groups
            .iter()
            .filter_map(|group| match group {
                AmbiguityGroup::Unambiguous { assignment, .. } if chop_scores => {
                    Some(assignment.to_string())
                }
                AmbiguityGroup::Unambiguous { .. } => Some(group.to_string()),
                _ => None,
            })
            .join(";")
    }

    #[must_use]
    pub fn ambiguous(&self) -> String {
        self.groups.iter().filter(|g| g.is_ambiguous()).join(";")
    }

    pub fn unambiguous_assignments(
        &self,
    ) -> impl Iterator<Item = (&ModificationAssignment, Option<&Score>)> + '_ {
        self.groups.iter().filter_map(|group| match group {
            AmbiguityGroup::Unambiguous { assignment, score } => Some((assignment, score.as_ref())),
            _ => None,
        })
    }
}

impl AmbiguityGroup {
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        !matches!(self, Self::Unambiguous { .. })
    }

    /// Every mutually exclusive set of assignments this group allows
    #[must_use]
    pub fn alternatives(&self) -> Vec<Vec<ModificationAssignment>> {
        match self {
            Self::Unambiguous { assignment, .. } => vec![vec![assignment.clone()]],
            Self::Simple(alternatives) => {
                let mut current = "";
                let mut resolved = Vec::with_capacity(alternatives.len());
                for terms in alternatives {
                    let mut assignments = Vec::with_capacity(terms.len());
                    for Term { modification, site } in terms {
                        if let Some(modification) = modification {
                            current = modification.as_str();
                        }
                        assignments.push(ModificationAssignment::new(current, *site));
                    }
                    resolved.push(assignments);
                }
                resolved
            }
            Self::Complex {
                modifications,
                sites,
            } => sites
                .paths()
                .into_iter()
                .map(|path| {
                    modifications
                        .iter()
                        .zip(path)
                        .map(|(modification, site)| ModificationAssignment::new(modification.as_str(), site))
                        .collect()
                })
                .collect(),
        }
    }
}

impl SiteExpr {
    /// Every sequence of sites this expression can produce, in order
    #[must_use]
    pub fn paths(&self) -> Vec<Vec<ModificationSite>> {
        match self {
            Self::Site(site) => vec![vec![*site]],
            Self::Nested(expr) => expr.paths(),
            Self::Any(exprs) => exprs.iter().flat_map(Self::paths).collect(),
            Self::All(exprs) => exprs.iter().fold(vec![Vec::new()], |prefixes, expr| {
                let suffixes = expr.paths();
                prefixes
                    .iter()
                    .cartesian_product(&suffixes)
                    .map(|(prefix, suffix)| prefix.iter().chain(suffix).copied().collect())
                    .collect()
            }),
        }
    }
}

impl ModificationAssignment {
    pub fn new(modification: impl Into<String>, site: ModificationSite) -> Self {
        Self {
            modification: modification.into(),
            site,
        }
    }

    #[must_use]
    pub fn modification(&self) -> &str {
        &self.modification
    }

    #[must_use]
    pub const fn site(&self) -> ModificationSite {
        self.site
    }
}

impl ModificationSite {
    /// A residue site from a 1-based index, or `None` for an index of zero
    #[must_use]
    pub fn residue(index: usize) -> Option<Self> {
        NonZeroUsize::new(index).map(Self::Residue)
    }

    #[must_use]
    pub const fn residue_index(self) -> Option<usize> {
        match self {
            Self::Residue(index) => Some(index.get()),
            _ => None,
        }
    }
}

impl Score {
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            value,
            text: value.to_string(),
        }
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

// Display =============================================================================================================

impl Display for AmbiguityString {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.groups.iter().join(";"))
    }
}

impl Display for AmbiguityGroup {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Unambiguous {
                assignment,
                score: Some(score),
            } => write!(f, "{assignment}={}", score.text),
            Self::Unambiguous { assignment, .. } => write!(f, "{assignment}"),
            Self::Simple(alternatives) => {
                let alternatives = alternatives.iter().map(|terms| terms.iter().join("&"));
                write!(f, "{}", alternatives.format("|"))
            }
            Self::Complex {
                modifications,
                sites,
            } => write!(f, "{}@{sites}", modifications.iter().format("&")),
        }
    }
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if let Some(modification) = &self.modification {
            write!(f, "{modification}@")?;
        }
        write!(f, "{}", self.site)
    }
}

impl Display for SiteExpr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Site(site) => write!(f, "{site}"),
            Self::All(exprs) => write!(f, "{}", exprs.iter().format("&")),
            Self::Any(exprs) => write!(f, "{}", exprs.iter().format("|")),
            Self::Nested(expr) => write!(f, "({expr})"),
        }
    }
}

impl Display for ModificationAssignment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}@{}", self.modification, self.site)
    }
}

impl Display for ModificationSite {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::NTerm => write!(f, "N-term"),
            Self::CTerm => write!(f, "C-term"),
            Self::NeutralLoss => write!(f, "Neutral loss"),
            Self::Residue(index) => write!(f, "{index}"),
        }
    }
}

// Module Tests ========================================================================================================
