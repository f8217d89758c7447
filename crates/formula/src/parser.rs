// Standard Library Imports
use std::num::NonZeroU32;

// External Crate Imports
use miette::Diagnostic;
use nom::{
    IResult,
    branch::alt,
    character::complete::{char, satisfy, space0, u32},
    combinator::{cut, map, map_opt, not, opt, recognize},
    multi::many1,
    sequence::{delimited, pair, preceded, terminated},
};
use nom_miette::{LabeledErrorKind, LabeledParseError, expect, wrap_err};
use thiserror::Error;

// Local Crate Imports
use crate::{Atom, Count, ElementalFormula, MassNumber};

pub type ParseResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, FormulaErrorKind>>;

// Public API ==========================================================================================================

/// Elemental Formula = { " " } , { Atomic Offset , { " " } }- ;
pub fn elemental_formula(i: &str) -> ParseResult<ElementalFormula> {
    let parser = preceded(space0, many1(terminated(atomic_offset, space0)));
    let parser = map(parser, |offsets| offsets.into_iter().collect());
    wrap_err(parser, FormulaErrorKind::ExpectedElementalFormula)(i)
}

// Private Sub-Parsers =================================================================================================

/// Atomic Offset = ( Element | Isotope ) , [ Count ] ;
fn atomic_offset(i: &str) -> ParseResult<(Atom, Count)> {
    let element = map(element_symbol, |symbol| Atom::new(symbol, None));
    let isotope = map(isotope, |(mass_number, symbol)| {
        Atom::new(symbol, Some(mass_number))
    });
    let optional_count = map(opt(count), |c| c.unwrap_or(1));
    let parser = pair(alt((element, isotope)), optional_count);
    wrap_err(parser, FormulaErrorKind::ExpectedAtomicOffset)(i)
}

/// Element = uppercase , [ lowercase ] ;
fn element_symbol(i: &str) -> ParseResult<&str> {
    let uppercase = satisfy(|c| c.is_ascii_uppercase());
    let lowercase = satisfy(|c| c.is_ascii_lowercase());
    let parser = recognize(pair(uppercase, opt(lowercase)));
    expect(parser, FormulaErrorKind::ExpectedElementSymbol)(i)
}

// NOTE: These are not meant to be links, it's just EBNF
#[allow(clippy::doc_link_with_quotes)]
/// Isotope = "[" , Mass Number , Element , "]" ;
fn isotope(i: &str) -> ParseResult<(MassNumber, &str)> {
    let opening_bracket = expect(char('['), FormulaErrorKind::ExpectedIsotopeStart);
    let mass_number = map(
        wrap_err(positive_integer, FormulaErrorKind::ExpectedMassNumber),
        MassNumber::from_nonzero,
    );
    let closing_bracket = expect(cut(char(']')), FormulaErrorKind::ExpectedIsotopeEnd);
    delimited(
        opening_bracket,
        cut(pair(mass_number, element_symbol)),
        closing_bracket,
    )(i)
}

/// Count = [ "-" ] , Positive Integer ;
fn count(i: &str) -> ParseResult<Count> {
    let sign = map(opt(char('-')), |s| if s.is_some() { -1 } else { 1 });
    let parser = pair(sign, positive_integer);
    map(parser, |(sign, n)| sign * Count::from(n.get()))(i)
}

/// Positive Integer = digit - "0" , { digit } ;
fn positive_integer(i: &str) -> ParseResult<NonZeroU32> {
    let not_zero = expect(cut(not(char('0'))), FormulaErrorKind::ExpectedNoLeadingZero);
    let digits = expect(map_opt(u32, NonZeroU32::new), FormulaErrorKind::ExpectedDigit);
    preceded(not_zero, digits)(i)
}

// Parse Errors ========================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum FormulaErrorKind {
    #[error("expected an elemental formula, like C8H10O2 or C8 H10 O2")]
    ExpectedElementalFormula,

    #[error(
        "expected an element (like Au) or an isotope (like [15N]) optionally followed by a (possibly negative) count"
    )]
    ExpectedAtomicOffset,

    #[error("expected an element symbol")]
    ExpectedElementSymbol,

    #[error("expected '[' to open isotope brackets")]
    ExpectedIsotopeStart,

    #[error("expected an isotopic mass number")]
    ExpectedMassNumber,

    #[diagnostic(help("you've probably forgotten to close an earlier '[' bracket"))]
    #[error("expected ']' to close isotope brackets")]
    ExpectedIsotopeEnd,

    #[diagnostic(help(
        "a 0 value doesn't make sense here, if you've mistakenly included a leading zero, like \
        NH02, try just NH2 instead"
    ))]
    #[error("counts cannot start with 0")]
    ExpectedNoLeadingZero,

    #[error("expected an ASCII digit 1-9")]
    ExpectedDigit,

    #[diagnostic(help(
        "this is an internal error that you shouldn't ever see! If you have gotten this error, \
        then please report it as a bug!"
    ))]
    #[error("internal `nom` error: {0:?}")]
    NomError(nom::error::ErrorKind),

    #[diagnostic(help(
        "check the unparsed region for errors, or remove it from the rest of the formula"
    ))]
    #[error("could not interpret the full input as a valid elemental formula")]
    Incomplete,
}

impl LabeledErrorKind for FormulaErrorKind {
    fn label(&self) -> Option<&'static str> {
        Some(match self {
            Self::ExpectedElementSymbol => "expected uppercase",
            Self::ExpectedIsotopeStart => "'['",
            Self::ExpectedIsotopeEnd => "expected ']'",
            Self::ExpectedMassNumber => "expected a mass number",
            Self::ExpectedNoLeadingZero => "expected non-zero",
            Self::ExpectedDigit => "expected digit",
            Self::Incomplete => "input was valid up until this point",
            Self::NomError(_) => "the region that triggered this bug!",
            _ => return None,
        })
    }
}

impl From<nom::error::ErrorKind> for FormulaErrorKind {
    fn from(value: nom::error::ErrorKind) -> Self {
        match value {
            nom::error::ErrorKind::Eof => Self::Incomplete,
            kind => Self::NomError(kind),
        }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(symbol: &str, mass_number: Option<u32>) -> Atom {
        let mass_number =
            mass_number.map(|n| MassNumber::from_nonzero(n.try_into().unwrap()));
        Atom::new(symbol, mass_number)
    }

    #[test]
    fn test_element_symbol() {
        assert_eq!(element_symbol("C"), Ok(("", "C")));
        assert_eq!(element_symbol("Se"), Ok(("", "Se")));
        assert_eq!(element_symbol("CH4"), Ok(("H4", "C")));
        assert!(element_symbol("c").is_err());
        assert!(element_symbol("4C").is_err());
        assert!(element_symbol("[13C]").is_err());
    }

    #[test]
    fn test_count() {
        assert_eq!(count("1"), Ok(("", 1)));
        assert_eq!(count("42H"), Ok(("H", 42)));
        assert_eq!(count("-2"), Ok(("", -2)));
        assert_eq!(count("-10O"), Ok(("O", -10)));
        assert!(count("0").is_err());
        assert!(count("-0").is_err());
        assert!(count("01").is_err());
        assert!(count("H").is_err());
        assert!(count("--1").is_err());
    }

    #[test]
    fn test_isotope() {
        let carbon_13 = isotope("[13C]").unwrap().1;
        assert_eq!(carbon_13.1, "C");
        assert_eq!(carbon_13.0.to_string(), "13");
        assert!(isotope("[C]").is_err());
        assert!(isotope("[13C").is_err());
        assert!(isotope("[013C]").is_err());
        assert!(isotope("13C").is_err());
    }

    #[test]
    fn test_atomic_offset() {
        assert_eq!(atomic_offset("C8"), Ok(("", (atom("C", None), 8))));
        assert_eq!(atomic_offset("H-2O"), Ok(("O", (atom("H", None), -2))));
        assert_eq!(atomic_offset("[15N]"), Ok(("", (atom("N", Some(15)), 1))));
        assert_eq!(atomic_offset("Na"), Ok(("", (atom("Na", None), 1))));
        assert!(atomic_offset(" C").is_err());
        assert!(atomic_offset("8C").is_err());
    }

    #[test]
    fn test_elemental_formula() {
        let parse = |i| elemental_formula(i).map(|(rest, f)| (rest, f.to_string()));
        assert_eq!(parse("C8H10O2"), Ok(("", "C8 H10 O2".to_owned())));
        assert_eq!(parse("C8 H10 O2"), Ok(("", "C8 H10 O2".to_owned())));
        assert_eq!(parse("  O2 H10 C8 "), Ok(("", "C8 H10 O2".to_owned())));
        assert_eq!(parse("H-2 O-1"), Ok(("", "H-2 O-1".to_owned())));
        assert_eq!(parse("CHCH"), Ok(("", "C2 H2".to_owned())));
        assert_eq!(parse("C2H4+H"), Ok(("+H", "C2 H4".to_owned())));
        assert!(parse("").is_err());
        assert!(parse("+H").is_err());
        assert!(parse("h2o").is_err());
    }

    #[test]
    fn isotopic_formulas() {
        let expected: ElementalFormula = [(atom("C", Some(13)), 2), (atom("H", None), 6)]
            .into_iter()
            .collect();
        assert_eq!(elemental_formula("[13C]2 H6"), Ok(("", expected)));

        let Err(nom::Err::Failure(_)) = elemental_formula("[0C]") else {
            panic!("a zero mass number should be a hard failure");
        };
        assert!(ElementalFormula::new("[0C]").is_err());
        assert!(ElementalFormula::new("[13C]0").is_err());
    }
}
