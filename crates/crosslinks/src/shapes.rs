// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use itertools::Itertools;

// Local Crate Imports
use crate::CombinationShape;

// Public API ==========================================================================================================

/// Every non-increasing shape of 1 to `max_molecules` fragments, each with 1 to `max_link_aa` linkable residues
///
/// Shapes come in a fixed order: leading digit ascending, then each shape is followed by its extensions, so `(3, 2)`
/// yields `1, 11, 111, 2, 21, 211, 22, 221, 222`
#[must_use]
pub fn combination_shapes(max_molecules: usize, max_link_aa: usize) -> Vec<CombinationShape> {
    let mut shapes = Vec::new();
    if max_molecules == 0 {
        return shapes;
    }
    for leading in 1..=max_link_aa {
        extend_shape(&mut vec![leading], max_molecules, &mut shapes);
    }
    shapes
}

/// Shapes for searches where the first fragment is already known: its digit may be anything, and only the fragments
/// after it need to be non-increasing
#[must_use]
pub fn delimited_shapes(max_molecules: usize, max_link_aa: usize) -> Vec<CombinationShape> {
    let tails = combination_shapes(max_molecules.saturating_sub(1), max_link_aa);
    (1..=max_link_aa)
        .flat_map(|leading| {
            let alone = CombinationShape(vec![leading]);
            let joined = tails.iter().map(move |CombinationShape(tail)| {
                CombinationShape([leading].into_iter().chain(tail.iter().copied()).collect())
            });
            std::iter::once(alone).chain(joined)
        })
        .collect()
}

impl CombinationShape {
    /// # Panics
    ///
    /// Panics if `digits` is empty
    #[must_use]
    pub fn new(digits: Vec<usize>) -> Self {
        assert!(!digits.is_empty(), "a combination shape needs at least one fragment");
        Self(digits)
    }

    /// A single fragment with no linkable residues
    #[must_use]
    pub fn unlinked() -> Self {
        Self(vec![0])
    }

    #[must_use]
    pub fn digits(&self) -> &[usize] {
        &self.0
    }

    /// The number of fragments in the shape
    #[must_use]
    pub fn molecules(&self) -> usize {
        self.0.len()
    }

    /// The total number of linkable residues across every fragment
    #[must_use]
    pub fn linkable(&self) -> usize {
        self.0.iter().sum()
    }
}

impl Display for CombinationShape {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.0.iter().any(|&digit| digit > 9) {
            write!(f, "{}", self.0.iter().format(","))
        } else {
            write!(f, "{}", self.0.iter().format(""))
        }
    }
}

// Shape Generation ====================================================================================================

fn extend_shape(prefix: &mut Vec<usize>, max_molecules: usize, shapes: &mut Vec<CombinationShape>) {
    shapes.push(CombinationShape(prefix.clone()));
    if prefix.len() == max_molecules {
        return;
    }
    let Some(&last) = prefix.last() else {
        return;
    };
    for next in 1..=last {
        prefix.push(next);
        extend_shape(prefix, max_molecules, shapes);
        prefix.pop();
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    fn shapes(shapes: &[CombinationShape]) -> String {
        shapes.iter().join(" ")
    }

    #[test]
    fn generation_order() {
        assert_snapshot!(shapes(&combination_shapes(3, 2)), @"1 11 111 2 21 211 22 221 222");
        assert_snapshot!(shapes(&combination_shapes(2, 3)), @"1 11 2 21 22 3 31 32 33");
        assert_snapshot!(shapes(&combination_shapes(1, 4)), @"1 2 3 4");
    }

    #[test]
    fn shapes_are_non_increasing() {
        for shape in combination_shapes(4, 5) {
            assert!(shape.molecules() <= 4);
            assert!(shape.digits().iter().all(|&d| (1..=5).contains(&d)));
            assert!(shape.digits().is_sorted_by(|a, b| a >= b), "{shape}");
        }
        // Multisets of 1 to 4 digits from 5 values
        assert_eq!(combination_shapes(4, 5).len(), 5 + 15 + 35 + 70);
    }

    #[test]
    fn degenerate_limits() {
        assert!(combination_shapes(0, 3).is_empty());
        assert!(combination_shapes(3, 0).is_empty());
        assert!(delimited_shapes(3, 0).is_empty());
    }

    #[test]
    fn delimited_generation() {
        assert_snapshot!(shapes(&delimited_shapes(2, 2)), @"1 11 12 2 21 22");
        assert_snapshot!(shapes(&delimited_shapes(3, 2)), @"1 11 111 12 121 122 2 21 211 22 221 222");
        assert_snapshot!(shapes(&delimited_shapes(1, 3)), @"1 2 3");
    }

    #[test]
    fn display() {
        assert_snapshot!(CombinationShape::unlinked(), @"0");
        assert_snapshot!(CombinationShape::new(vec![12, 3]), @"12,3");
        assert_eq!(CombinationShape::new(vec![3, 2, 2]).linkable(), 7);
    }
}
