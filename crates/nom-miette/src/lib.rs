//! Labelled `nom` parse errors that can be rendered as `miette` diagnostics

// Standard Library Imports
use std::{fmt, ops::Range};

// External Crate Imports
use miette::{Diagnostic, LabeledSpan, SourceCode};
use nom::{
    Err, Finish, IResult, Parser,
    combinator::{all_consuming, complete, consumed},
    error::{ErrorKind, ParseError},
};
use thiserror::Error;

// Public API ==========================================================================================================

/// The final, owned form of a parse error. Carries a copy of the full input so that labels can be rendered
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("{error}")]
pub struct LabeledError<E: LabeledErrorKind> {
    full_input: String,
    labels: Vec<Label>,
    error: ErrorTree<E>,
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ErrorTree<E: LabeledErrorKind> {
    #[error("{kind}")]
    Node {
        kind: E,
        #[source]
        source: Option<Box<LabeledError<E>>>,
    },
    #[error("attempted {} parse branches unsuccessfully", .0.len())]
    Branch(Vec<LabeledError<E>>),
}

/// The borrowed error type threaded through parsers while they are still running
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabeledParseError<'a, E> {
    input: &'a str,
    length: usize,
    kind: E,
    alternatives: Vec<LabeledParseError<'a, E>>,
    source: Option<Box<LabeledParseError<'a, E>>>,
}

pub trait LabeledErrorKind: Diagnostic + Clone + Eq + From<ErrorKind> {
    fn label(&self) -> Option<&'static str> {
        None
    }
}

/// Turns errors from the closures passed to [`map_res`] into parse errors. Set `FATAL` to stop backtracking
pub trait FromExternalError<'a, E>: Sized {
    const FATAL: bool = false;
    fn from_external_error(input: &'a str, error: E) -> LabeledParseError<'a, Self>;
}

impl<E: LabeledErrorKind> LabeledError<E> {
    /// The kind of this error, or `None` if several parse branches failed
    pub const fn kind(&self) -> Option<&E> {
        match &self.error {
            ErrorTree::Node { kind, .. } => Some(kind),
            ErrorTree::Branch(_) => None,
        }
    }

    /// Every error kind in this tree, outermost first
    pub fn kinds(&self) -> Vec<&E> {
        match &self.error {
            ErrorTree::Node { kind, source } => {
                let mut kinds = vec![kind];
                if let Some(source) = source {
                    kinds.extend(source.kinds());
                }
                kinds
            }
            ErrorTree::Branch(alternatives) => alternatives.iter().flat_map(Self::kinds).collect(),
        }
    }

    /// The byte ranges of the input that this error points at
    pub fn spans(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.labels.iter().map(|label| label.span.clone())
    }
}

pub fn final_parser<'a, O, P, E>(parser: P) -> impl FnMut(&'a str) -> Result<O, LabeledError<E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    let mut parser = all_consuming(complete(parser));
    move |input| {
        parser.parse(input).finish().map(|(_, o)| o).map_err(|e| {
            let mut error = e.into_final_error(input);
            error.bubble_labels();
            error
        })
    }
}

/// Like `nom`'s `map_res`, but the resulting error covers everything `parser` consumed
pub fn map_res<'a, O1, O2, E1, E2, F, G>(
    parser: F,
    mut f: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, O2, LabeledParseError<'a, E1>>
where
    E1: LabeledErrorKind + FromExternalError<'a, E2>,
    F: Parser<&'a str, O1, LabeledParseError<'a, E1>>,
    G: FnMut(O1) -> Result<O2, E2>,
{
    let mut parser = consumed(parser);
    move |i| {
        let (rest, (consumed, o1)) = parser.parse(i)?;
        f(o1).map(|o2| (rest, o2)).map_err(|e| {
            let e = LabeledParseError {
                length: consumed.len(),
                ..E1::from_external_error(i, e)
            };
            if <E1 as FromExternalError<'a, E2>>::FATAL {
                Err::Failure(e)
            } else {
                Err::Error(e)
            }
        })
    }
}

/// Wraps any error from `parser` in a new `kind`, keeping the original error as its source
pub fn wrap_err<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|e| LabeledParseError::new_with_source(i, kind.clone(), Some(e))))
    }
}

/// Replaces any error from `parser` with `kind`, discarding the original error
pub fn expect<'a, O, P, E>(
    mut parser: P,
    kind: E,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, LabeledParseError<'a, E>>
where
    E: LabeledErrorKind,
    P: Parser<&'a str, O, LabeledParseError<'a, E>>,
{
    move |i| {
        parser
            .parse(i)
            .map_err(|e| e.map(|_| LabeledParseError::new(i, kind.clone())))
    }
}

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    pub const fn new(input: &'a str, kind: E) -> Self {
        Self {
            input,
            length: 0,
            kind,
            alternatives: Vec::new(),
            source: None,
        }
    }

    pub fn new_with_source(input: &'a str, kind: E, source: Option<Self>) -> Self {
        Self {
            source: source.map(Box::new),
            ..Self::new(input, kind)
        }
    }

    /// Widens the label of this error to cover the first `length` bytes of its input
    #[must_use]
    pub fn with_length(self, length: usize) -> Self {
        let length = length.min(self.input.len());
        Self { length, ..self }
    }
}

// Diagnostic Trait Implementation =====================================================================================

impl<E: LabeledErrorKind> Diagnostic for LabeledError<E> {
    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.full_input)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.kind().and_then(Diagnostic::help)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.labels.iter().map(|Label { text, span }| {
            LabeledSpan::new_with_span(Some(text.clone()), span.clone())
        })))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        if let ErrorTree::Branch(related) = &self.error {
            Some(Box::new(related.iter().map(|e| e as &dyn Diagnostic)))
        } else {
            None
        }
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        if let ErrorTree::Node {
            source: Some(source),
            ..
        } = &self.error
        {
            Some(&**source)
        } else {
            None
        }
    }
}

// `nom` Error Trait Implementation ====================================================================================

impl<'a, E: LabeledErrorKind> ParseError<&'a str> for LabeledParseError<'a, E> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self::new(input, kind.into())
    }

    fn append(_input: &str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn or(mut self, other: Self) -> Self {
        self.alternatives.push(other);
        self
    }
}

// Private Types and Methods ===========================================================================================

#[derive(Debug, Clone, Eq, PartialEq)]
struct Label {
    text: String,
    span: Range<usize>,
}

impl<E: LabeledErrorKind> LabeledError<E> {
    // NOTE: Only the outermost error with labels should display them, so labels of children are moved up until they
    // reach a node that already has some
    fn bubble_labels(&mut self) {
        if !self.labels.is_empty() {
            return;
        }
        match &mut self.error {
            ErrorTree::Node {
                source: Some(child),
                ..
            } => {
                child.bubble_labels();
                self.labels.append(&mut child.labels);
            }
            ErrorTree::Branch(alternatives) => {
                let labels = alternatives.iter_mut().flat_map(|child| {
                    child.bubble_labels();
                    child.labels.drain(..).collect::<Vec<_>>()
                });
                self.labels = merge_labels(labels);
            }
            ErrorTree::Node { source: None, .. } => (),
        }
    }
}

// NOTE: Labels pointing at the same span are joined with "or". Labels with different spans are never merged
fn merge_labels(labels: impl Iterator<Item = Label>) -> Vec<Label> {
    let mut merged: Vec<(Range<usize>, Vec<String>)> = Vec::new();
    for Label { text, span } in labels {
        match merged.iter_mut().find(|(s, _)| *s == span) {
            Some((_, texts)) if !texts.contains(&text) => texts.push(text),
            Some(_) => (),
            None => merged.push((span, vec![text])),
        }
    }
    merged
        .into_iter()
        .map(|(span, texts)| Label {
            text: texts.join(" or "),
            span,
        })
        .collect()
}

impl<'a, E: LabeledErrorKind> LabeledParseError<'a, E> {
    fn into_final_error(self, full_input: &str) -> LabeledError<E> {
        // NOTE: The additional space lets labels point at the very end of the input
        let padded_input = format!("{full_input} ");
        let span = self.span_in(full_input);
        let Self {
            kind,
            alternatives,
            source,
            ..
        } = self;

        if alternatives.is_empty() {
            let labels = kind
                .label()
                .map(|text| Label {
                    text: text.to_owned(),
                    span,
                })
                .into_iter()
                .collect();
            let source = source.map(|s| Box::new(s.into_final_error(full_input)));
            LabeledError {
                full_input: padded_input,
                labels,
                error: ErrorTree::Node { kind, source },
            }
        } else {
            let head = LabeledParseError {
                input: self.input,
                length: self.length,
                kind,
                alternatives: Vec::new(),
                source,
            };
            let branches = std::iter::once(head)
                .chain(alternatives)
                .map(|e| e.into_final_error(full_input))
                .collect();
            LabeledError {
                full_input: padded_input,
                labels: Vec::new(),
                error: ErrorTree::Branch(branches),
            }
        }
    }

    fn span_in(&self, full_input: &str) -> Range<usize> {
        let base_addr = full_input.as_ptr() as usize;
        let substr_addr = self.input.as_ptr() as usize;
        assert!(
            substr_addr >= base_addr && substr_addr <= base_addr + full_input.len(),
            "tried to get the span of a non-substring!"
        );
        let start = substr_addr - base_addr;
        start..start + self.length
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use nom::{bytes::complete::tag, character::complete::digit1, sequence::preceded};

    use super::*;

    #[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
    enum TestErrorKind {
        #[error("expected a number")]
        ExpectedNumber,
        #[diagnostic(help("start the input with '#'"))]
        #[error("expected a '#'")]
        ExpectedHash,
        #[error("internal `nom` error: {0:?}")]
        NomError(ErrorKind),
        #[error("could not interpret the full input")]
        Incomplete,
    }

    impl LabeledErrorKind for TestErrorKind {
        fn label(&self) -> Option<&'static str> {
            Some(match self {
                Self::ExpectedNumber => "expected a number",
                Self::ExpectedHash => "expected '#'",
                Self::Incomplete => "input was valid up until this point",
                Self::NomError(_) => return None,
            })
        }
    }

    impl From<ErrorKind> for TestErrorKind {
        fn from(value: ErrorKind) -> Self {
            match value {
                ErrorKind::Eof => Self::Incomplete,
                kind => Self::NomError(kind),
            }
        }
    }

    type TestResult<'a, O> = IResult<&'a str, O, LabeledParseError<'a, TestErrorKind>>;

    fn hash_number(i: &str) -> TestResult<&str> {
        let hash = expect(tag("#"), TestErrorKind::ExpectedHash);
        let number = expect(digit1, TestErrorKind::ExpectedNumber);
        preceded(hash, number)(i)
    }

    #[test]
    fn final_parser_success() {
        let mut parser = final_parser(hash_number);
        assert_eq!(parser("#42"), Ok("42"));
    }

    #[test]
    fn final_parser_labels() {
        let mut parser = final_parser(hash_number);

        let error = parser("#x").unwrap_err();
        assert_eq!(error.kind(), Some(&TestErrorKind::ExpectedNumber));
        assert_eq!(error.spans().collect::<Vec<_>>(), vec![1..1]);

        let error = parser("42").unwrap_err();
        assert_eq!(error.kind(), Some(&TestErrorKind::ExpectedHash));
        assert!(error.help().is_some());

        let error = parser("#42!").unwrap_err();
        assert_eq!(error.kind(), Some(&TestErrorKind::Incomplete));
        assert_eq!(error.spans().collect::<Vec<_>>(), vec![3..3]);
    }

    #[test]
    fn wrapped_errors_keep_their_source() {
        let mut parser = final_parser(wrap_err(hash_number, TestErrorKind::ExpectedNumber));
        let error = parser("x").unwrap_err();
        assert_eq!(
            error.kinds(),
            vec![&TestErrorKind::ExpectedNumber, &TestErrorKind::ExpectedHash]
        );
        // The outermost error has its own label, so the inner label stays put
        assert_eq!(error.spans().collect::<Vec<_>>(), vec![0..0]);
    }

    #[test]
    fn external_errors_cover_consumed_input() {
        impl<'a> FromExternalError<'a, std::num::ParseIntError> for TestErrorKind {
            const FATAL: bool = true;

            fn from_external_error(
                input: &'a str,
                _e: std::num::ParseIntError,
            ) -> LabeledParseError<'a, Self> {
                LabeledParseError::new(input, Self::ExpectedNumber)
            }
        }

        fn small_number(i: &str) -> TestResult<u8> {
            map_res(digit1, str::parse::<u8>)(i)
        }

        let mut parser = final_parser(small_number);
        assert_eq!(parser("255"), Ok(255));
        let error = parser("256").unwrap_err();
        assert_eq!(error.spans().collect::<Vec<_>>(), vec![0..3]);
    }

    #[test]
    fn merging_labels() {
        let label = |text: &str, span| Label {
            text: text.to_owned(),
            span,
        };
        let merged = merge_labels(
            [
                label("a", 0..1),
                label("b", 0..1),
                label("a", 0..1),
                label("c", 2..3),
            ]
            .into_iter(),
        );
        assert_eq!(merged, vec![label("a or b", 0..1), label("c", 2..3)]);
    }
}
