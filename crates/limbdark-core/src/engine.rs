//! Design-matrix engines
//!
//! [`DesignMatrixEngine`] is the seam between the operator binding and the
//! numerics. The binding only needs three things from an engine: its shape
//! contract (known before construction), a no-argument constructor, and a
//! pure `compute_design_matrix`. Views are passed by value with a call-scoped
//! lifetime, so an engine cannot keep hold of host memory.
//!
//! [`LimbDark`] is the shipped engine. It multiplies each basis term of a
//! degree-`YDEG` map by the limb-darkening profile
//!
//! ```text
//! I(z) = -Σ_k u_k (1 - z)^k = Σ_p c_p z^p,   c_p = -(-1)^p Σ_{k>=p} C(k, p) u_k
//! ```
//!
//! and rescales the result so the disk-integrated flux of a uniform map is
//! unchanged: `∫_disk I dA = 2π Σ_p c_p / (p + 2)`, hence
//! `norm = 1 / (2 Σ_p c_p / (p + 2))`.

use crate::basis::{self, Binomials, Term};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::shape::ShapeContract;
use ndarray::{Array2, ArrayView1, ArrayViewMut2};
use std::marker::PhantomData;

/// Computation engine consumed by the operator binding
pub trait DesignMatrixEngine: Send {
    /// Element type of both input and output
    type Elem: Element;

    /// Shape contract, fixed for the engine type
    const SHAPE: ShapeContract;

    /// Default construction. Only resource exhaustion may fail.
    fn construct() -> Result<Self>
    where
        Self: Sized;

    /// Write the design matrix for `u` into `out`
    ///
    /// Must be a pure function of `u`: equal inputs give bit-identical
    /// outputs regardless of earlier calls.
    fn compute_design_matrix(&self, u: ArrayView1<'_, Self::Elem>, out: ArrayViewMut2<'_, Self::Elem>) -> Result<()>;
}

/// Limb-darkening design matrix for degree-`UDEG` coefficients on a degree-`YDEG` map
///
/// Construction precomputes the sparse expansion of `z^p · p̃_n` for every
/// power `p <= UDEG` and column `n`; calls only combine those tables with
/// the per-call profile coefficients.
pub struct LimbDark<T, const UDEG: usize, const YDEG: usize> {
    binomials: Binomials,
    /// `expansions[p * N + n]`
    expansions: Vec<Vec<Term>>,
    _elem: PhantomData<fn() -> T>,
}

impl<T: Element, const UDEG: usize, const YDEG: usize> LimbDark<T, UDEG, YDEG> {
    /// Build the engine and its product tables
    pub fn new() -> Self {
        let shape = Self::SHAPE;
        let binomials = Binomials::new(UDEG + 1);
        let mut expansions = Vec::with_capacity((UDEG + 1) * shape.n());
        for p in 0..=UDEG {
            for n in 0..shape.n() {
                expansions.push(basis::z_power_product(basis::monomial(n), p, &binomials));
            }
        }

        limbdark_tracing::perf_event!(
            "engine_tables_built",
            udeg = UDEG,
            ydeg = YDEG,
            terms = expansions.iter().map(Vec::len).sum::<usize>(),
        );

        Self {
            binomials,
            expansions,
            _elem: PhantomData,
        }
    }

    /// Polynomial coefficients `c_p` of the intensity profile in `z`
    fn profile(&self, u: &[f64]) -> Vec<f64> {
        (0..=UDEG)
            .map(|p| {
                let sum: f64 = (p..=UDEG).map(|k| self.binomials.get(k, p) * u[k]).sum();
                if p % 2 == 0 {
                    -sum
                } else {
                    sum
                }
            })
            .collect()
    }

    /// Factor that preserves the flux of a uniform disk
    ///
    /// A profile with zero total flux (e.g. all-zero `u`) is left unscaled.
    fn normalization(profile: &[f64]) -> Result<f64> {
        let half_flux: f64 = profile
            .iter()
            .enumerate()
            .map(|(p, c)| c / (p as f64 + 2.0))
            .sum();
        if !half_flux.is_finite() {
            return Err(Error::DegenerateNormalization);
        }
        if half_flux == 0.0 {
            return Ok(1.0);
        }
        let norm = 0.5 / half_flux;
        if norm.is_finite() {
            Ok(norm)
        } else {
            Err(Error::DegenerateNormalization)
        }
    }
}

/// Scale `coeffs` by a power of two so the largest magnitude lies in `[0.5, 2)`
///
/// `L` is invariant under rescaling `u`, and power-of-two steps are exact,
/// so huge and subnormal inputs behave like their unit-scale counterparts.
/// All-zero input is left as is.
fn rescale_unit(coeffs: &mut [f64]) {
    let max_abs = coeffs.iter().fold(0.0f64, |acc, c| acc.max(c.abs()));
    if max_abs == 0.0 {
        return;
    }
    // 2^1000 keeps every intermediate factor a normal f64
    let mut exponent = -(max_abs.log2().floor() as i32);
    while exponent != 0 {
        let step = exponent.clamp(-1000, 1000);
        let factor = 2f64.powi(step);
        for c in coeffs.iter_mut() {
            *c *= factor;
        }
        exponent -= step;
    }
}

impl<T: Element, const UDEG: usize, const YDEG: usize> Default for LimbDark<T, UDEG, YDEG> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element, const UDEG: usize, const YDEG: usize> DesignMatrixEngine for LimbDark<T, UDEG, YDEG> {
    type Elem = T;

    const SHAPE: ShapeContract = ShapeContract::from_degrees(UDEG, YDEG);

    fn construct() -> Result<Self> {
        Ok(Self::new())
    }

    fn compute_design_matrix(&self, u: ArrayView1<'_, T>, mut out: ArrayViewMut2<'_, T>) -> Result<()> {
        let shape = Self::SHAPE;
        if u.len() != shape.coefficients() {
            return Err(Error::shape_mismatch(&[shape.coefficients()], u.shape()));
        }
        if out.dim() != (shape.nlu(), shape.n()) {
            return Err(Error::shape_mismatch(&shape.output_shape(), out.shape()));
        }

        let mut coeffs = Vec::with_capacity(u.len());
        for (index, value) in u.iter().enumerate() {
            if !value.is_finite() {
                return Err(Error::NonFiniteCoefficient { index });
            }
            coeffs.push(value.as_f64());
        }
        rescale_unit(&mut coeffs);

        let profile = self.profile(&coeffs);
        let norm = Self::normalization(&profile)?;
        tracing::trace!(?profile, norm, "limb-darkening profile");

        let columns = shape.n();
        let mut acc = Array2::<f64>::zeros((shape.nlu(), columns));
        for (p, c) in profile.iter().enumerate() {
            let weight = norm * c;
            if weight == 0.0 {
                continue;
            }
            for col in 0..columns {
                for term in &self.expansions[p * columns + col] {
                    acc[[term.row, col]] += weight * term.coeff;
                }
            }
        }

        for ((row, col), value) in acc.indexed_iter() {
            let narrowed = T::from_f64_rounded(*value);
            if !narrowed.is_finite() {
                return Err(Error::NonFiniteOutput { row, col });
            }
            out[[row, col]] = narrowed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array1};

    fn design<const U: usize, const Y: usize>(u: &[f64]) -> Result<Array2<f64>> {
        let engine = LimbDark::<f64, U, Y>::new();
        let shape = LimbDark::<f64, U, Y>::SHAPE;
        let mut out = Array2::<f64>::from_elem((shape.nlu(), shape.n()), f64::NAN);
        engine.compute_design_matrix(Array1::from(u.to_vec()).view(), out.view_mut())?;
        Ok(out)
    }

    #[test]
    fn test_uniform_scalar_case_is_one() -> Result<()> {
        let out = design::<0, 0>(&[1.0])?;
        assert_eq!(out.shape(), &[1, 1]);
        assert_eq!(out[[0, 0]], 1.0);
        Ok(())
    }

    #[test]
    fn test_no_limb_darkening_is_identity() -> Result<()> {
        let out = design::<0, 3>(&[-1.0])?;
        assert_eq!(out, Array2::<f64>::eye(16));
        Ok(())
    }

    #[test]
    fn test_quadratic_profile_on_uniform_map() -> Result<()> {
        let (u1, u2) = (0.4, 0.26);
        let out = design::<2, 0>(&[-1.0, u1, u2])?;
        assert_eq!(out.shape(), &[9, 1]);

        let (c0, c1, c2) = (1.0 - u1 - u2, u1 + 2.0 * u2, -u2);
        let norm = 1.0 / (1.0 - u1 / 3.0 - u2 / 6.0);
        let expected = [
            (0, norm * (c0 + c2)),
            (2, norm * c1),
            (4, -norm * c2),
            (8, -norm * c2),
        ];
        for (row, value) in expected {
            assert!((out[[row, 0]] - value).abs() < 1e-12, "row {row}: {} vs {value}", out[[row, 0]]);
        }
        for row in [1, 3, 5, 6, 7] {
            assert_eq!(out[[row, 0]], 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_all_zero_coefficients_give_finite_zero_matrix() -> Result<()> {
        let out = design::<2, 2>(&[0.0, 0.0, 0.0])?;
        assert!(out.iter().all(|v| *v == 0.0));
        Ok(())
    }

    #[test]
    fn test_rescaling_u_leaves_matrix_unchanged() -> Result<()> {
        let a = design::<2, 2>(&[-1.0, 0.3, 0.1])?;
        let b = design::<2, 2>(&[-3.0, 0.9, 0.3])?;
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_nan_coefficient_is_rejected() {
        let err = design::<1, 1>(&[-1.0, f64::NAN]).unwrap_err();
        assert_eq!(err, Error::NonFiniteCoefficient { index: 1 });
    }

    #[test]
    fn test_huge_coefficients_match_unit_scale() -> Result<()> {
        let huge = design::<2, 1>(&[-1e308, -1e308, 0.0])?;
        let unit = design::<2, 1>(&[-1.0, -1.0, 0.0])?;
        for (a, b) in huge.iter().zip(unit.iter()) {
            assert!((a - b).abs() < 1e-12, "{a} vs {b}");
        }
        assert!((unit[[0, 0]] - 1.5).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_subnormal_coefficients_match_unit_scale() -> Result<()> {
        let tiny = design::<2, 1>(&[5e-324, 0.0, 0.0])?;
        let unit = design::<2, 1>(&[1.0, 0.0, 0.0])?;
        assert_eq!(tiny[[0, 0]], 1.0);
        assert!(tiny.iter().zip(unit.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
        Ok(())
    }

    #[test]
    fn test_power_of_two_rescaling_is_bit_identical() -> Result<()> {
        let a = design::<2, 2>(&[-1.0, 0.4, 0.26])?;
        let b = design::<2, 2>(&[-1.0 * 2f64.powi(-600), 0.4 * 2f64.powi(-600), 0.26 * 2f64.powi(-600)])?;
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits()));
        Ok(())
    }

    #[test]
    fn test_rescale_unit_brings_extremes_near_one() {
        let mut coeffs = [f64::MAX, -f64::MAX, 1.0];
        rescale_unit(&mut coeffs);
        assert!(coeffs[0] >= 0.5 && coeffs[0] < 2.0);
        assert_eq!(coeffs[1], -coeffs[0]);

        let mut zeros = [0.0, -0.0];
        rescale_unit(&mut zeros);
        assert_eq!(zeros, [0.0, -0.0]);
    }

    #[test]
    fn test_f32_engine_tracks_f64_engine() {
        let narrow = LimbDark::<f32, 2, 2>::new();
        let mut out32 = Array2::<f32>::zeros((25, 9));
        narrow
            .compute_design_matrix(arr1(&[-1.0f32, 0.5, 0.25]).view(), out32.view_mut())
            .unwrap();

        let out64 = design::<2, 2>(&[-1.0, 0.5, 0.25]).unwrap();
        for (a, b) in out32.iter().zip(out64.iter()) {
            assert!((*a as f64 - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn test_wrong_view_shapes_are_rejected() {
        let engine = LimbDark::<f64, 1, 1>::new();
        let mut out = Array2::<f64>::zeros((9, 4));
        let short = arr1(&[1.0]);
        assert!(matches!(
            engine.compute_design_matrix(short.view(), out.view_mut()),
            Err(Error::ShapeMismatch { .. })
        ));

        let mut wrong = Array2::<f64>::zeros((4, 4));
        let u = arr1(&[-1.0, 0.5]);
        assert!(matches!(
            engine.compute_design_matrix(u.view(), wrong.view_mut()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_repeated_calls_are_bit_identical() {
        let engine = LimbDark::<f64, 2, 3>::new();
        let u1 = arr1(&[-1.0, 0.4, 0.26]);
        let u2 = arr1(&[-1.0, 0.1, 0.7]);
        let mut first = Array2::<f64>::zeros((36, 16));
        let mut scratch = Array2::<f64>::zeros((36, 16));
        let mut again = Array2::<f64>::zeros((36, 16));

        engine.compute_design_matrix(u1.view(), first.view_mut()).unwrap();
        engine.compute_design_matrix(u2.view(), scratch.view_mut()).unwrap();
        engine.compute_design_matrix(u1.view(), again.view_mut()).unwrap();

        assert!(first.iter().zip(again.iter()).all(|(a, b)| a.to_bits() == b.to_bits()));
    }
}
