// Standard Library Imports
use std::{iter, num::NonZeroUsize};

// External Crate Imports
use miette::Diagnostic;
use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_till1},
    character::complete::{char, space0, u32},
    combinator::{consumed, cut, map, map_opt, not, opt, value},
    multi::{many0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use nom_miette::{FromExternalError, LabeledErrorKind, LabeledParseError, expect, map_res, wrap_err};
use thiserror::Error;

// Local Crate Imports
use crate::{
    AmbiguityGroup, AmbiguityString, ModificationAssignment, ModificationSite, Score, SiteExpr, Term,
};

pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, AmbiguityErrorKind>>;

// Public API ==========================================================================================================

/// Ambiguity String = Group Slot , { ";" , Group Slot } ;
pub fn ambiguity_string(i: &str) -> ParseResult<AmbiguityString> {
    let parser = separated_list1(char(';'), group_slot);
    map(parser, |slots| AmbiguityString {
        groups: slots.into_iter().flatten().collect(),
    })(i)
}

// Groups ==============================================================================================================

// NOTE: Whitespace around a group is ignored and blank groups are skipped, so `Phospho@3; ` is a single group
/// Group Slot = { " " } , [ Group ] , { " " } ;
fn group_slot(i: &str) -> ParseResult<Option<AmbiguityGroup>> {
    let (i, _) = space0(i)?;
    if i.is_empty() || i.starts_with(';') {
        return Ok((i, None));
    }
    let (i, group) = cut(group)(i)?;
    let (i, _) = space0(i)?;
    Ok((i, Some(group)))
}

/// Group = Combinator Group | Alternation Group | Unambiguous Group ;
fn group(i: &str) -> ParseResult<AmbiguityGroup> {
    let text = i.split(';').next().unwrap_or_default();
    if is_combinator(text) {
        combinator_group(i)
    } else if text.contains(['|', '&']) {
        alternation_group(i)
    } else {
        unambiguous_group(i)
    }
}

// NOTE: The combinator form is the only one with a '(' directly after the first '@'
fn is_combinator(group: &str) -> bool {
    group
        .split_once('@')
        .is_some_and(|(_, sites)| sites.starts_with('('))
}

/// Unambiguous Group = Modification Prefix , Site , [ Score ] ;
fn unambiguous_group(i: &str) -> ParseResult<AmbiguityGroup> {
    let parser = tuple((modification_prefix, site, opt(score)));
    map(parser, |(modification, site, score)| {
        AmbiguityGroup::Unambiguous {
            assignment: ModificationAssignment::new(modification, site),
            score,
        }
    })(i)
}

/// Alternation Group = Alternative , { "|" , Alternative } ;
fn alternation_group(i: &str) -> ParseResult<AmbiguityGroup> {
    let (rest, (head, tail)) =
        pair(alternative, many0(preceded(char('|'), cut(alternative))))(i)?;

    // NOTE: Later terms can inherit a modification name, but the very first term has nothing to inherit from
    if head.first().is_some_and(|term| term.modification.is_none()) {
        let error = LabeledParseError::new(i, AmbiguityErrorKind::ExpectedModificationName);
        return Err(nom::Err::Failure(error));
    }

    let alternatives = iter::once(head).chain(tail).collect();
    Ok((rest, AmbiguityGroup::Simple(alternatives)))
}

/// Alternative = Term , { "&" , Term } ;
fn alternative(i: &str) -> ParseResult<Vec<Term>> {
    let parser = pair(term, many0(preceded(char('&'), cut(term))));
    let parser = map(parser, |(head, tail)| iter::once(head).chain(tail).collect());
    wrap_err(parser, AmbiguityErrorKind::ExpectedAlternative)(i)
}

/// Term = [ Modification Prefix ] , Site ;
fn term(i: &str) -> ParseResult<Term> {
    let no_empty_name = expect(
        cut(not(char('@'))),
        AmbiguityErrorKind::ExpectedModificationName,
    );
    let parser = preceded(no_empty_name, pair(opt(modification_prefix), site));
    map(parser, |(modification, site)| Term {
        modification: modification.map(str::to_owned),
        site,
    })(i)
}

/// Combinator Group = Modification Name , { "&" , Modification Name } , "@" , Site Expression ;
fn combinator_group(i: &str) -> ParseResult<AmbiguityGroup> {
    let names = separated_list1(char('&'), modification_name);
    let at_sign = expect(char('@'), AmbiguityErrorKind::ExpectedAtSign);
    let (sites_start, modifications) = terminated(names, at_sign)(i)?;
    let (rest, (sites_text, sites)) = consumed(site_expression)(sites_start)?;

    let arity = modifications.len();
    if let Some(path) = sites.paths().into_iter().find(|path| path.len() != arity) {
        let kind = AmbiguityErrorKind::ArityMismatch {
            expected: arity,
            found: path.len(),
        };
        let error = LabeledParseError::new(sites_start, kind).with_length(sites_text.len());
        return Err(nom::Err::Failure(error));
    }

    let modifications = modifications.into_iter().map(str::to_owned).collect();
    Ok((
        rest,
        AmbiguityGroup::Complex {
            modifications,
            sites,
        },
    ))
}

// Site Expressions ====================================================================================================

/// Site Expression = Site Conjunction , { "|" , Site Conjunction } ;
fn site_expression(i: &str) -> ParseResult<SiteExpr> {
    let parser = pair(
        site_conjunction,
        many0(preceded(char('|'), cut(site_conjunction))),
    );
    map(parser, |(head, tail)| collapse(head, tail, SiteExpr::Any))(i)
}

/// Site Conjunction = Site Atom , { "&" , Site Atom } ;
fn site_conjunction(i: &str) -> ParseResult<SiteExpr> {
    let parser = pair(site_atom, many0(preceded(char('&'), cut(site_atom))));
    let parser = map(parser, |(head, tail)| collapse(head, tail, SiteExpr::All));
    wrap_err(parser, AmbiguityErrorKind::ExpectedAlternative)(i)
}

/// Site Atom = Site | "(" , Site Expression , ")" ;
fn site_atom(i: &str) -> ParseResult<SiteExpr> {
    if i.starts_with('(') {
        let closing = expect(cut(char(')')), AmbiguityErrorKind::ExpectedClosingParen);
        let parser = delimited(char('('), cut(site_expression), closing);
        map(parser, |expr| SiteExpr::Nested(Box::new(expr)))(i)
    } else {
        map(site, SiteExpr::Site)(i)
    }
}

fn collapse(head: SiteExpr, tail: Vec<SiteExpr>, wrap: fn(Vec<SiteExpr>) -> SiteExpr) -> SiteExpr {
    if tail.is_empty() {
        head
    } else {
        wrap(iter::once(head).chain(tail).collect())
    }
}

// Terminals ===========================================================================================================

/// Modification Prefix = Modification Name , "@" ;
fn modification_prefix(i: &str) -> ParseResult<&str> {
    let at_sign = expect(char('@'), AmbiguityErrorKind::ExpectedAtSign);
    terminated(modification_name, at_sign)(i)
}

/// Modification Name = { character - ( "@" | "&" | ";" | "|" ) }- ;
fn modification_name(i: &str) -> ParseResult<&str> {
    let parser = take_till1(|c| matches!(c, '@' | '&' | ';' | '|'));
    expect(parser, AmbiguityErrorKind::ExpectedModificationName)(i)
}

/// Site = "N-term" | "C-term" | "Neutral loss" | Residue Index ;
fn site(i: &str) -> ParseResult<ModificationSite> {
    let parser = alt((
        value(ModificationSite::NTerm, tag("N-term")),
        value(ModificationSite::CTerm, tag("C-term")),
        value(ModificationSite::NeutralLoss, tag("Neutral loss")),
        map(residue_index, ModificationSite::Residue),
    ));
    expect(parser, AmbiguityErrorKind::ExpectedSite)(i)
}

/// Residue Index = digit - "0" , { digit } ;
fn residue_index(i: &str) -> ParseResult<NonZeroUsize> {
    let parser = preceded(not(char('0')), u32);
    map_opt(parser, |n| usize::try_from(n).ok().and_then(NonZeroUsize::new))(i)
}

/// Score = "=" , Number ;
fn score(i: &str) -> ParseResult<Score> {
    let number = expect(consumed(double), AmbiguityErrorKind::ExpectedScore);
    let finite_number = map_res(number, |(text, value): (&str, f64)| {
        if value.is_finite() {
            Ok(Score {
                value,
                text: text.to_owned(),
            })
        } else {
            Err(NonFiniteScore)
        }
    });
    preceded(char('='), cut(finite_number))(i)
}

// NOTE: `double` happily parses `nan`, `inf`, and overflowing exponents, but none of those rank sensibly
struct NonFiniteScore;

impl<'a> FromExternalError<'a, NonFiniteScore> for AmbiguityErrorKind {
    const FATAL: bool = true;

    fn from_external_error(input: &'a str, _: NonFiniteScore) -> LabeledParseError<'a, Self> {
        LabeledParseError::new(input, Self::NonFiniteScore)
    }
}

// Parse Errors ========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum AmbiguityErrorKind {
    #[error("expected a modification name")]
    ExpectedModificationName,

    #[diagnostic(help("modifications are attached to their sites with '@', like Phospho@3"))]
    #[error("expected '@' after the modification name")]
    ExpectedAtSign,

    #[diagnostic(help(
        "sites are positive residue numbers (without leading zeros), N-term, C-term, or Neutral loss"
    ))]
    #[error("expected a modification site")]
    ExpectedSite,

    #[error("expected a number after '='")]
    ExpectedScore,

    #[diagnostic(help("scores must be finite numbers, so NaN and infinities aren't allowed"))]
    #[error("expected a finite score")]
    NonFiniteScore,

    #[diagnostic(help("remove the stray '|' or '&', or fill in the missing alternative"))]
    #[error("expected a non-empty alternative")]
    ExpectedAlternative,

    #[diagnostic(help("you've probably forgotten to close an earlier '(' bracket"))]
    #[error("expected ')' to close the site group")]
    ExpectedClosingParen,

    #[diagnostic(help(
        "every path through a site expression must assign exactly one site to each modification, in order"
    ))]
    #[error("expected {expected} site(s) along every path, but found a path with {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(nom::error::ErrorKind),

    #[diagnostic(help(
        "check the unparsed region for errors, like an unmatched ')' or whitespace inside of a group"
    ))]
    #[error("could not interpret the full input as a valid modification string")]
    Incomplete,
}

impl LabeledErrorKind for AmbiguityErrorKind {
    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::ExpectedModificationName => "expected a name",
            Self::ExpectedAtSign => "expected '@'",
            Self::ExpectedSite => "expected a site",
            Self::ExpectedScore => "expected a number",
            Self::NonFiniteScore => "not a finite number",
            Self::ExpectedAlternative => "empty alternative",
            Self::ExpectedClosingParen => "expected ')'",
            Self::ArityMismatch { .. } => "wrong number of sites",
            Self::Incomplete => "input was valid up until this point",
            Self::NomError(_) => "the region that triggered this bug!",
        })
    }
}

impl From<nom::error::ErrorKind> for AmbiguityErrorKind {
    fn from(value: nom::error::ErrorKind) -> Self {
        match value {
            nom::error::ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// Module Tests ========================================================================================================
