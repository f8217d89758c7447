// Standard Library Imports
use std::ops::RangeInclusive;

// Local Crate Imports
use crate::PROTON_MASS;

// Public API ==========================================================================================================

/// An observed mass that candidate crosslinks are matched against. Masses are singly protonated (MH+)
pub trait Peak {
    fn mass(&self) -> f64;

    /// The largest accepted difference between `mass()` and a candidate, in Daltons
    fn tolerance(&self) -> f64;

    fn charge(&self) -> u32 {
        1
    }

    fn intensity(&self) -> f64 {
        0.0
    }

    fn window(&self) -> RangeInclusive<f64> {
        self.mass() - self.tolerance()..=self.mass() + self.tolerance()
    }

    fn is_match(&self, mass: f64) -> bool {
        (mass - self.mass()).abs() <= self.tolerance()
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Tolerance {
    Da(f64),
    Ppm(f64),
}

impl Tolerance {
    /// The width of this tolerance on either side of `mass`, in Daltons
    #[must_use]
    pub fn at(self, mass: f64) -> f64 {
        match self {
            Self::Da(da) => da,
            Self::Ppm(ppm) => mass * ppm / 1_000_000.0,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ObservedPeak {
    mass: f64,
    tolerance: f64,
    charge: u32,
    intensity: f64,
}

impl ObservedPeak {
    #[must_use]
    pub fn new(mass: f64, tolerance: Tolerance, charge: u32, intensity: f64) -> Self {
        Self {
            mass,
            tolerance: tolerance.at(mass),
            charge,
            intensity,
        }
    }

    /// Converts a measured m/z to MH+ before applying `tolerance`
    #[must_use]
    pub fn from_mz(mz: f64, charge: u32, tolerance: Tolerance, intensity: f64) -> Self {
        let z = f64::from(charge.max(1));
        let mass = mz.mul_add(z, -(z - 1.0) * PROTON_MASS);
        Self::new(mass, tolerance, charge, intensity)
    }
}

impl Peak for ObservedPeak {
    fn mass(&self) -> f64 {
        self.mass
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn charge(&self) -> u32 {
        self.charge
    }

    fn intensity(&self) -> f64 {
        self.intensity
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use super::*;

    #[test]
    fn dalton_tolerances() {
        let peak = ObservedPeak::new(1736.0, Tolerance::Da(0.5), 1, 1e6);
        assert_float_absolute_eq!(peak.tolerance(), 0.5);
        assert!(peak.is_match(1736.5));
        assert!(peak.is_match(1735.5));
        assert!(!peak.is_match(1736.51));
        assert_eq!(peak.window(), 1735.5..=1736.5);
    }

    #[test]
    fn ppm_tolerances() {
        let peak = ObservedPeak::new(941.407_703, Tolerance::Ppm(7.5), 1, 0.0);
        assert_float_absolute_eq!(peak.tolerance(), 0.007_061, 1e-6);
        assert!(peak.is_match(941.414_7));
        assert!(!peak.is_match(941.414_8));
    }

    #[test]
    fn from_mz() {
        let singly = ObservedPeak::from_mz(800.0, 1, Tolerance::Da(0.1), 0.0);
        assert_float_absolute_eq!(singly.mass(), 800.0);

        let doubly = ObservedPeak::from_mz(400.5, 2, Tolerance::Da(0.1), 0.0);
        assert_float_absolute_eq!(doubly.mass(), 801.0 - PROTON_MASS);
        assert_eq!(doubly.charge(), 2);

        // Charge zero is treated as singly charged
        let unknown = ObservedPeak::from_mz(800.0, 0, Tolerance::Da(0.1), 0.0);
        assert_float_absolute_eq!(unknown.mass(), 800.0);
    }

    #[test]
    fn default_peak_methods() {
        struct Bare(f64);
        impl Peak for Bare {
            fn mass(&self) -> f64 {
                self.0
            }

            fn tolerance(&self) -> f64 {
                0.01
            }
        }

        let peak = Bare(500.0);
        assert_eq!(peak.charge(), 1);
        assert_float_absolute_eq!(peak.intensity(), 0.0);
        assert!(peak.is_match(500.01));
    }
}
