// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    num::NonZeroU32,
    ops::{Add, AddAssign, Mul, Neg, Sub},
};

// External Crate Imports
use itertools::Itertools;
use nom_miette::final_parser;

// Local Crate Imports
use crate::{Atom, Count, ElementalFormula, MassNumber, Result, parser::elemental_formula};

// Public API ==========================================================================================================

impl ElementalFormula {
    pub fn new(formula: impl AsRef<str>) -> Result<Self> {
        final_parser(elemental_formula)(formula.as_ref()).map_err(|e| Box::new(e.into()))
    }

    /// Every atom with a non-zero count, in symbol order
    pub fn atoms(&self) -> impl Iterator<Item = (&Atom, Count)> + '_ {
        self.0.iter().map(|(atom, &count)| (atom, count))
    }

    #[must_use]
    pub fn count(&self, atom: &Atom) -> Count {
        self.0.get(atom).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn offset(&mut self, atom: Atom, count: Count) {
        let total = self.0.entry(atom).or_default();
        *total += count;
        if *total == 0 {
            self.0.retain(|_, &mut c| c != 0);
        }
    }
}

impl Atom {
    pub fn new(symbol: impl Into<String>, mass_number: Option<MassNumber>) -> Self {
        Self {
            symbol: symbol.into(),
            mass_number,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[must_use]
    pub const fn mass_number(&self) -> Option<MassNumber> {
        self.mass_number
    }
}

impl MassNumber {
    #[must_use]
    pub const fn from_nonzero(n: NonZeroU32) -> Self {
        Self(n)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

// Arithmetic ==========================================================================================================

impl FromIterator<(Atom, Count)> for ElementalFormula {
    fn from_iter<T: IntoIterator<Item = (Atom, Count)>>(iter: T) -> Self {
        let mut formula = Self::default();
        for (atom, count) in iter {
            formula.offset(atom, count);
        }
        formula
    }
}

impl AddAssign<&Self> for ElementalFormula {
    fn add_assign(&mut self, rhs: &Self) {
        for (atom, &count) in &rhs.0 {
            self.offset(atom.clone(), count);
        }
    }
}

impl Add for &ElementalFormula {
    type Output = ElementalFormula;

    fn add(self, rhs: Self) -> Self::Output {
        let mut sum = self.clone();
        sum += rhs;
        sum
    }
}

impl Neg for &ElementalFormula {
    type Output = ElementalFormula;

    fn neg(self) -> Self::Output {
        ElementalFormula(self.0.iter().map(|(a, &c)| (a.clone(), -c)).collect())
    }
}

impl Sub for &ElementalFormula {
    type Output = ElementalFormula;

    fn sub(self, rhs: Self) -> Self::Output {
        self + &-rhs
    }
}

impl Mul<Count> for &ElementalFormula {
    type Output = ElementalFormula;

    fn mul(self, rhs: Count) -> Self::Output {
        if rhs == 0 {
            return ElementalFormula::default();
        }
        ElementalFormula(self.0.iter().map(|(a, &c)| (a.clone(), c * rhs)).collect())
    }
}

// Display =============================================================================================================

// NOTE: Formulas are written in Hill order: carbon first, then hydrogen, then everything else alphabetically. Without
// any carbon, everything is alphabetical
impl Display for ElementalFormula {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let has_carbon = self.0.keys().any(|a| a.symbol == "C");
        let hill_rank = |atom: &Atom| match atom.symbol.as_str() {
            "C" if has_carbon => 0,
            "H" if has_carbon => 1,
            _ => 2,
        };
        let offsets = self
            .0
            .iter()
            .sorted_by_key(|(atom, _)| hill_rank(atom))
            .map(|(atom, &count)| {
                if count == 1 {
                    atom.to_string()
                } else {
                    format!("{atom}{count}")
                }
            })
            .join(" ");
        write!(f, "{offsets}")
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.mass_number {
            Some(mass_number) => write!(f, "[{mass_number}{}]", self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}

impl Display for MassNumber {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;
    use crate::FormulaError;

    fn formula(text: &str) -> ElementalFormula {
        ElementalFormula::new(text).unwrap()
    }

    #[test]
    fn hill_order() {
        assert_snapshot!(formula("O2H10C8"), @"C8 H10 O2");
        assert_snapshot!(formula("NaCl"), @"Cl Na");
        assert_snapshot!(formula("H2O"), @"H2 O");
        assert_snapshot!(formula("SC[13C]2H"), @"C [13C]2 H S");
        assert_snapshot!(formula("H-2O-1"), @"H-2 O-1");
    }

    #[test]
    fn parse_errors() {
        let error = ElementalFormula::new("C2H4 + H").unwrap_err();
        assert!(matches!(*error, FormulaError::Parse(_)));
        assert!(ElementalFormula::new("").is_err());
        assert!(ElementalFormula::new("C0").is_err());
        assert!(ElementalFormula::new("[13C").is_err());
    }

    #[test]
    fn zero_counts_vanish() {
        let formula = formula("C2H4O-1C-2");
        assert_eq!(formula.to_string(), "H4 O-1");
        assert_eq!(formula.count(&Atom::new("C", None)), 0);
        assert_eq!(formula.count(&Atom::new("H", None)), 4);
        assert!(self::formula("H2H-2").is_empty());
    }

    #[test]
    fn arithmetic() {
        let glycine = formula("C2H5NO2");
        let water = formula("H2O");

        assert_eq!((&glycine + &water).to_string(), "C2 H7 N O3");
        assert_eq!((&glycine - &water).to_string(), "C2 H3 N O");
        assert_eq!((&water - &water), ElementalFormula::default());
        assert_eq!((-&water).to_string(), "H-2 O-1");
        assert_eq!((&glycine * 3).to_string(), "C6 H15 N3 O6");
        assert!((&glycine * 0).is_empty());

        let mut total = ElementalFormula::default();
        total += &glycine;
        total += &glycine;
        assert_eq!(total, &glycine * 2);
    }
}
