// Standard Library Imports
use std::num::NonZeroU32;

// External Crate Imports
use knuffel::Decode;
use miette::{Diagnostic, Result};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use thiserror::Error;

// Local Crate Imports
use crate::{
    Atom, AtomicDatabase, ElementalFormula, Element, FormulaError, Isotope, MassNumber, MassType,
};

pub const DEFAULT_KDL: &str = include_str!("../data/atomic_database.kdl");

static DEFAULT_DB: Lazy<AtomicDatabase> = Lazy::new(|| {
    // SAFETY: The default database is embedded at compile time and checked by the tests below
    AtomicDatabase::from_kdl("atomic_database.kdl", DEFAULT_KDL).unwrap()
});

// Public API ==========================================================================================================

impl AtomicDatabase {
    pub fn from_kdl(file_name: impl AsRef<str>, text: impl AsRef<str>) -> Result<Self> {
        let parsed_db: AtomicDatabaseKdl = knuffel::parse(file_name.as_ref(), text.as_ref())?;
        let elements = parsed_db
            .elements
            .into_iter()
            .map(ElementKdl::try_into_entry)
            .collect::<Result<_, _>>()?;
        Ok(Self { elements })
    }

    /// The mass of `formula`, using either the most abundant isotope of each element, or the abundance-weighted mean
    pub fn mass(&self, formula: &ElementalFormula, mass_type: MassType) -> crate::Result<Decimal> {
        formula
            .atoms()
            .map(|(atom, count)| -> crate::Result<Decimal> {
                Ok(Decimal::from(count) * self.atomic_mass(atom, mass_type)?)
            })
            .sum()
    }

    pub fn monoisotopic_mass(&self, formula: &ElementalFormula) -> crate::Result<Decimal> {
        self.mass(formula, MassType::Monoisotopic)
    }

    pub fn average_mass(&self, formula: &ElementalFormula) -> crate::Result<Decimal> {
        self.mass(formula, MassType::Average)
    }

    #[must_use]
    pub fn element_name(&self, symbol: &str) -> Option<&str> {
        self.elements.get(symbol).map(|e| e.name.as_str())
    }
}

impl Default for AtomicDatabase {
    fn default() -> Self {
        DEFAULT_DB.clone()
    }
}

// Mass Lookups ========================================================================================================

impl AtomicDatabase {
    fn atomic_mass(&self, atom: &Atom, mass_type: MassType) -> crate::Result<Decimal> {
        let element = self
            .elements
            .get(&atom.symbol)
            .ok_or_else(|| FormulaError::element(&atom.symbol))?;

        // NOTE: Explicit isotopes always weigh the same, regardless of the mass type requested
        if let Some(mass_number) = atom.mass_number {
            return element
                .isotopes
                .get(&mass_number)
                .map(|i| i.relative_mass)
                .ok_or_else(|| FormulaError::isotope(&atom.symbol, mass_number).into());
        }

        Ok(match mass_type {
            MassType::Monoisotopic => element.monoisotopic_mass(),
            MassType::Average => element.average_mass(),
        })
    }
}

impl Element {
    // NOTE: Validation in `try_into_entry` ensures there is always at least one isotope, so these folds never see an
    // empty map
    fn monoisotopic_mass(&self) -> Decimal {
        self.isotopes
            .values()
            .max_by_key(|i| i.abundance)
            .map(|i| i.relative_mass)
            .unwrap_or_default()
    }

    fn average_mass(&self) -> Decimal {
        let total_abundance: Decimal = self.isotopes.values().map(|i| i.abundance).sum();
        let weighted_sum: Decimal = self
            .isotopes
            .values()
            .map(|i| i.relative_mass * i.abundance)
            .sum();
        weighted_sum / total_abundance
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
struct AtomicDatabaseKdl {
    #[knuffel(child, unwrap(children))]
    elements: Vec<ElementKdl>,
}

#[derive(Debug, Decode)]
struct ElementKdl {
    #[knuffel(node_name)]
    symbol: String,
    #[knuffel(argument)]
    name: String,
    #[knuffel(children(name = "isotope"))]
    isotopes: Vec<IsotopeKdl>,
}

#[derive(Debug, Decode)]
struct IsotopeKdl {
    #[knuffel(argument)]
    mass_number: u32,
    #[knuffel(argument, str)]
    relative_mass: Decimal,
    #[knuffel(argument, str)]
    abundance: Decimal,
}

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
enum AtomicDatabaseError {
    #[diagnostic(help("every element needs at least one `isotope` child"))]
    #[error("the element {0} ({1}) has no isotopes")]
    NoIsotopes(String, String),

    #[diagnostic(help("mass numbers count protons and neutrons, so they are always positive"))]
    #[error("the element {0} has an isotope with a mass number of zero")]
    ZeroMassNumber(String),

    #[diagnostic(help("abundances must sum to a positive value"))]
    #[error("the element {0} has no natural abundance")]
    NoAbundance(String),
}

impl ElementKdl {
    fn try_into_entry(self) -> Result<(String, Element), AtomicDatabaseError> {
        let Self {
            symbol,
            name,
            isotopes,
        } = self;

        if isotopes.is_empty() {
            return Err(AtomicDatabaseError::NoIsotopes(symbol, name));
        }

        let isotopes = isotopes
            .into_iter()
            .map(|isotope| -> Result<_, AtomicDatabaseError> {
                let mass_number = NonZeroU32::new(isotope.mass_number)
                    .map(MassNumber)
                    .ok_or_else(|| AtomicDatabaseError::ZeroMassNumber(symbol.clone()))?;
                let isotope = Isotope {
                    relative_mass: isotope.relative_mass,
                    abundance: isotope.abundance,
                };
                Ok((mass_number, isotope))
            })
            .collect::<Result<_, _>>()?;
        let element = Element { name, isotopes };

        if element.isotopes.values().all(|i| i.abundance.is_zero()) {
            return Err(AtomicDatabaseError::NoAbundance(symbol));
        }

        Ok((symbol, element))
    }
}

// Module Tests ========================================================================================================
