//! Elemental formulas and the atomic masses needed to weigh them

pub mod atomic_database;
pub mod elemental_formula;
pub mod errors;
mod parser;

// Standard Library Imports
use std::{collections::BTreeMap, num::NonZeroU32};

// External Crate Imports
use ahash::HashMap;
use rust_decimal::Decimal;

pub use errors::{FormulaError, Result};
pub use parser::FormulaErrorKind;

// ---------------------------------------------------------------------------------------------------------------------

/// A table of elements and their isotopes, usually loaded from KDL
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AtomicDatabase {
    elements: HashMap<String, Element>,
}

/// Signed atom counts. Negative counts describe losses (like `H-2 O-1`)
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ElementalFormula(BTreeMap<Atom, Count>);

/// An element, optionally pinned to a specific isotope (like `[13C]`)
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Atom {
    symbol: String,
    mass_number: Option<MassNumber>,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct MassNumber(NonZeroU32);

pub type Count = i64;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum MassType {
    #[default]
    Monoisotopic,
    Average,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Clone, Eq, PartialEq, Debug)]
struct Element {
    name: String,
    isotopes: BTreeMap<MassNumber, Isotope>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
struct Isotope {
    relative_mass: Decimal,
    abundance: Decimal,
}
