//! Build-time shape contract (UMAX, NLU, N)
//!
//! Everything derives from two degrees: the limb-darkening degree `udeg`
//! and the map degree `ydeg`. Multiplying a degree-`ydeg` map by a
//! degree-`udeg` intensity profile yields a map of degree `ydeg + udeg`, so
//!
//! - `UMAX = udeg` (the input holds `UMAX + 1` coefficients)
//! - `N = (ydeg + 1)^2` (design-matrix columns)
//! - `NLU = (ydeg + udeg + 1)^2` (design-matrix rows)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed (UMAX, NLU, N) triple of one operator build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeContract {
    udeg: usize,
    ydeg: usize,
}

impl ShapeContract {
    /// Contract for limb-darkening degree `udeg` and map degree `ydeg`
    pub const fn from_degrees(udeg: usize, ydeg: usize) -> Self {
        Self { udeg, ydeg }
    }

    pub const fn udeg(&self) -> usize {
        self.udeg
    }

    pub const fn ydeg(&self) -> usize {
        self.ydeg
    }

    /// Degree of the limb-darkened map
    pub const fn output_degree(&self) -> usize {
        self.udeg + self.ydeg
    }

    /// Highest limb-darkening order
    pub const fn umax(&self) -> usize {
        self.udeg
    }

    /// Required input length, `UMAX + 1`
    pub const fn coefficients(&self) -> usize {
        self.udeg + 1
    }

    /// Design-matrix columns
    pub const fn n(&self) -> usize {
        (self.ydeg + 1) * (self.ydeg + 1)
    }

    /// Design-matrix rows
    pub const fn nlu(&self) -> usize {
        (self.output_degree() + 1) * (self.output_degree() + 1)
    }

    /// `[NLU, N]`
    pub const fn output_shape(&self) -> [usize; 2] {
        [self.nlu(), self.n()]
    }

    /// Number of elements in the design matrix
    pub const fn output_len(&self) -> usize {
        self.nlu() * self.n()
    }
}

impl fmt::Display for ShapeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(UMAX={}, NLU={}, N={})", self.umax(), self.nlu(), self.n())
    }
}
