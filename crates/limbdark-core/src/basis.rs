//! Polynomial map basis and its product with powers of `z`
//!
//! A degree-`l` map has `(l + 1)^2` coefficients. Index `n = l² + l + m`
//! (`-l <= m <= l`) selects the monomial `x^i y^j z^k` with `k ∈ {0, 1}`:
//!
//! ```text
//! μ = l - m, ν = l + m
//! ν even: i = μ / 2,       j = ν / 2,       k = 0
//! ν odd:  i = (μ - 1) / 2, j = (ν - 1) / 2, k = 1
//! ```
//!
//! Points lie on the unit sphere, so higher powers of `z` reduce through
//! `z² = 1 - x² - y²`. Both directions of the index map collapse to
//! `l = i + j + k`, `m = j - i`.

/// Monomial `x^x y^y z^z` with `z` in {0, 1}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Monomial {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Monomial {
    pub const fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    /// Total degree
    pub const fn degree(&self) -> usize {
        self.x + self.y + self.z
    }
}

/// Number of basis terms up to degree `deg`
pub const fn len(deg: usize) -> usize {
    (deg + 1) * (deg + 1)
}

/// Degree `l` of basis index `n`
pub fn degree_of(n: usize) -> usize {
    let mut l = 0;
    while (l + 1) * (l + 1) <= n {
        l += 1;
    }
    l
}

/// Monomial at basis index `n`
pub fn monomial(n: usize) -> Monomial {
    let l = degree_of(n) as isize;
    let m = n as isize - (l * l + l);
    let mu = (l - m) as usize;
    let nu = (l + m) as usize;
    if nu % 2 == 0 {
        Monomial::new(mu / 2, nu / 2, 0)
    } else {
        Monomial::new((mu - 1) / 2, (nu - 1) / 2, 1)
    }
}

/// Basis index of a reduced monomial (`mono.z <= 1`)
pub fn index(mono: Monomial) -> usize {
    debug_assert!(mono.z <= 1, "monomial must be reduced in z");
    let l = mono.degree();
    l * l + l + mono.y - mono.x
}

/// Pascal's triangle up to a fixed order, in f64
#[derive(Debug, Clone)]
pub struct Binomials {
    rows: Vec<Vec<f64>>,
}

impl Binomials {
    pub fn new(max_order: usize) -> Self {
        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(max_order + 1);
        for n in 0..=max_order {
            let mut row = vec![1.0; n + 1];
            for k in 1..n {
                row[k] = rows[n - 1][k - 1] + rows[n - 1][k];
            }
            rows.push(row);
        }
        Self { rows }
    }

    pub fn max_order(&self) -> usize {
        self.rows.len() - 1
    }

    /// `C(n, k)`; zero outside `0 <= k <= n`
    pub fn get(&self, n: usize, k: usize) -> f64 {
        if k > n {
            return 0.0;
        }
        self.rows[n][k]
    }
}

/// One entry of a sparse basis expansion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    pub row: usize,
    pub coeff: f64,
}

/// Expand `z^p · mono` in the reduced basis
///
/// With `e = mono.z + p = 2q + r`,
/// `z^e = z^r (1 - x² - y²)^q = z^r Σ_{b+c<=q} q!/(a! b! c!) (-1)^(b+c) x^(2b) y^(2c)`.
/// The result has degree `mono.degree() + p`.
pub fn z_power_product(mono: Monomial, p: usize, binomials: &Binomials) -> Vec<Term> {
    let e = mono.z + p;
    let (q, r) = (e / 2, e % 2);
    let mut terms = Vec::with_capacity((q + 1) * (q + 2) / 2);
    for b in 0..=q {
        for c in 0..=(q - b) {
            let sign = if (b + c) % 2 == 0 { 1.0 } else { -1.0 };
            let coeff = sign * binomials.get(q, b + c) * binomials.get(b + c, b);
            let target = Monomial::new(mono.x + 2 * b, mono.y + 2 * c, r);
            terms.push(Term {
                row: index(target),
                coeff,
            });
        }
    }
    terms
}
