// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

// External Crate Imports
use formula::{AtomicDatabase, ElementalFormula, MassType};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use tracing::debug;

// Local Crate Imports
use crate::{BridgeChemistry, ChemistryConfigError, LinkSite};

// Public API ==========================================================================================================

impl BridgeChemistry {
    /// Validates and weighs a bridge. Leave `end_b` empty for bridges whose ends react with the same sites
    ///
    /// # Errors
    ///
    /// Fails if the formula can't be parsed or weighed, if `max_molecules` is zero, if `end_a` is empty, or if the ends
    /// share a site
    pub fn new(
        db: &AtomicDatabase,
        mass_type: MassType,
        name: impl Into<String>,
        formula: &str,
        max_molecules: usize,
        end_a: Vec<LinkSite>,
        end_b: Vec<LinkSite>,
    ) -> Result<Self, ChemistryConfigError> {
        let name = name.into();

        let formula = ElementalFormula::new(formula)
            .map_err(|e| ChemistryConfigError::InvalidFormula(name.clone(), e))?;
        let mass = db
            .mass(&formula, mass_type)
            .map_err(|e| ChemistryConfigError::UnknownElement(name.clone(), e))?;

        if max_molecules == 0 {
            return Err(ChemistryConfigError::ZeroMolecules(name));
        }
        if end_a.is_empty() {
            return Err(ChemistryConfigError::NoLinkSites(name));
        }
        if let Some(shared) = end_b.iter().find(|site| end_a.contains(site)) {
            return Err(ChemistryConfigError::OverlappingEnds(name, shared.to_string()));
        }

        let end_index = (!end_b.is_empty()).then_some(end_a.len());
        let mut link_sites = end_a;
        link_sites.extend(end_b);

        let bridge = Self {
            name,
            formula,
            mass: decimal_to_f64(mass),
            max_molecules,
            link_sites,
            end_index,
        };
        debug!(
            name = %bridge.name,
            formula = %bridge.formula,
            mass = bridge.mass,
            "configured bridge"
        );
        Ok(bridge)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn formula(&self) -> &ElementalFormula {
        &self.formula
    }

    #[must_use]
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    #[must_use]
    pub const fn max_molecules(&self) -> usize {
        self.max_molecules
    }

    #[must_use]
    pub fn link_sites(&self) -> &[LinkSite] {
        &self.link_sites
    }

    #[must_use]
    pub const fn end_index(&self) -> Option<usize> {
        self.end_index
    }
}

// NOTE: Every `Decimal` is within the range of an `f64`, so the conversion only ever loses precision
pub(crate) fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

impl FromStr for LinkSite {
    type Err = ChemistryConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N-term" => Ok(Self::PeptideNTerm),
            "Protein N-term" => Ok(Self::ProteinNTerm),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(residue), None) if residue.is_ascii_uppercase() => Ok(Self::Residue(residue)),
                    _ => Err(ChemistryConfigError::UnknownLinkSite(s.to_owned())),
                }
            }
        }
    }
}

impl Display for LinkSite {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Residue(residue) => write!(f, "{residue}"),
            Self::PeptideNTerm => write!(f, "N-term"),
            Self::ProteinNTerm => write!(f, "Protein N-term"),
        }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use once_cell::sync::Lazy;

    use super::*;

    static DB: Lazy<AtomicDatabase> = Lazy::new(AtomicDatabase::default);

    fn sites(sites: &[&str]) -> Vec<LinkSite> {
        sites.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn bridge(
        formula: &str,
        max_molecules: usize,
        end_a: &[&str],
        end_b: &[&str],
    ) -> Result<BridgeChemistry, ChemistryConfigError> {
        BridgeChemistry::new(
            &DB,
            MassType::Monoisotopic,
            "test",
            formula,
            max_molecules,
            sites(end_a),
            sites(end_b),
        )
    }

    #[test]
    fn symmetric_bridges() {
        let dss = bridge("C8H10O2", 3, &["K", "Protein N-term"], &[]).unwrap();
        assert_float_absolute_eq!(dss.mass(), 138.068_079_561_44);
        assert_eq!(dss.formula().to_string(), "C8 H10 O2");
        assert_eq!(dss.max_molecules(), 3);
        assert_eq!(dss.end_index(), None);
        assert_eq!(dss.link_sites(), [LinkSite::Residue('K'), LinkSite::ProteinNTerm]);
    }

    #[test]
    fn asymmetric_bridges() {
        let sda = bridge("C5H6O", 2, &["K", "N-term"], &["D", "E"]).unwrap();
        assert_eq!(sda.end_index(), Some(2));
        assert_eq!(sda.link_sites().len(), 4);
        assert_eq!(sda.link_sites()[2], LinkSite::Residue('D'));
    }

    #[test]
    fn average_masses() {
        let dss = BridgeChemistry::new(
            &DB,
            MassType::Average,
            "DSS",
            "C8H10O2",
            2,
            vec![LinkSite::Residue('K')],
            Vec::new(),
        )
        .unwrap();
        assert_float_absolute_eq!(dss.mass(), 138.164, 0.001);
    }

    #[test]
    fn invalid_bridges() {
        assert!(matches!(
            bridge("C8H10O2+", 2, &["K"], &[]),
            Err(ChemistryConfigError::InvalidFormula(..))
        ));
        assert!(matches!(
            bridge("C8Xx2", 2, &["K"], &[]),
            Err(ChemistryConfigError::UnknownElement(..))
        ));
        assert!(matches!(
            bridge("C8H10O2", 0, &["K"], &[]),
            Err(ChemistryConfigError::ZeroMolecules(_))
        ));
        assert!(matches!(
            bridge("C8H10O2", 2, &[], &[]),
            Err(ChemistryConfigError::NoLinkSites(_))
        ));
        assert_eq!(
            bridge("C8H10O2", 2, &["K", "S"], &["S"]),
            Err(ChemistryConfigError::OverlappingEnds("test".to_owned(), "S".to_owned()))
        );
    }

    #[test]
    fn parse_link_sites() {
        assert_eq!("K".parse(), Ok(LinkSite::Residue('K')));
        assert_eq!("N-term".parse(), Ok(LinkSite::PeptideNTerm));
        assert_eq!("Protein N-term".parse(), Ok(LinkSite::ProteinNTerm));
        assert!("k".parse::<LinkSite>().is_err());
        assert!("KR".parse::<LinkSite>().is_err());
        assert!("".parse::<LinkSite>().is_err());
        assert_eq!(LinkSite::ProteinNTerm.to_string(), "Protein N-term");
    }
}
