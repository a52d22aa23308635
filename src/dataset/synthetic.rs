//! Synthetic regression datasets from fixed parametric functions

use std::f64::consts::{E, PI};
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Dataset;
use crate::{Error, Result};

/// Seed used by uniform sampling unless overridden.
pub const DEFAULT_SEED: u64 = 123_456;

/// Target functions for synthetic datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticFunction {
    /// `x³ e^{-x} cos x sin x (sin²x cos x - 1)`
    Salustowicz1d,
    /// `(y - 5) · salustowicz1d(x)`
    Salustowicz2d,
    /// `e^{-(x-1)²} / (1.2 + (y - 2.5)²)`
    Kotanchek,
    /// `log x + cos x - sin(x²/2 + x)`
    LogTrig,
    /// `sin(1 + x + x² + x³ + x⁴ + x⁵)`
    PolySine,
    /// `(sin(πx)ⁿ + sin(πx)) / (πx)`, 1 at `x = 0`
    Sinc(u32),
}

impl SyntheticFunction {
    /// Number of input attributes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Salustowicz2d | Self::Kotanchek => 2,
            _ => 1,
        }
    }

    /// Evaluate at `x` (length must equal [`arity`](Self::arity)).
    #[must_use]
    pub fn eval(self, x: &[f64]) -> f64 {
        match self {
            Self::Salustowicz1d => salustowicz(x[0]),
            Self::Salustowicz2d => (x[1] - 5.0) * salustowicz(x[0]),
            Self::Kotanchek => E.powf(-(x[0] - 1.0).powi(2)) / (1.2 + (x[1] - 2.5).powi(2)),
            Self::LogTrig => {
                let x = x[0];
                x.ln() + x.cos() - (x.powi(2) / 2.0 + x).sin()
            }
            Self::PolySine => {
                let x = x[0];
                (1.0 + x + x.powi(2) + x.powi(3) + x.powi(4) + x.powi(5)).sin()
            }
            Self::Sinc(n) => {
                let x = x[0];
                if x == 0.0 {
                    return 1.0;
                }
                let s = (PI * x).sin();
                (s.powi(n.try_into().unwrap_or(i32::MAX)) + s) / (PI * x)
            }
        }
    }

    /// Sample the function into a dataset (inputs then target per row).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Dataset`] if the sampling yields fewer than two
    /// points per dimension or a non-finite target.
    pub fn sample(self, sampling: &Sampling) -> Result<Dataset> {
        let (lower, upper) = sampling.bounds();
        if lower.partial_cmp(&upper) != Some(std::cmp::Ordering::Less) {
            return Err(Error::Dataset(format!(
                "empty sampling interval [{lower}, {upper}]"
            )));
        }
        let inputs = match *sampling {
            Sampling::Grid {
                lower,
                upper,
                points,
            } => grid(self.arity(), lower, upper, points)?,
            Sampling::Uniform {
                lower,
                upper,
                per_axis,
                seed,
            } => uniform(self.arity(), lower, upper, per_axis, seed),
        };

        let rows = inputs
            .into_iter()
            .map(|mut x| {
                let y = self.eval(&x);
                if !y.is_finite() {
                    return Err(Error::Dataset(format!("{self} is not finite at {x:?}")));
                }
                x.push(y);
                Ok(x)
            })
            .collect::<Result<Vec<_>>>()?;
        Dataset::from_rows(rows)
    }
}

fn salustowicz(x: f64) -> f64 {
    x.powi(3) * E.powf(-x) * x.cos() * x.sin() * (x.sin().powi(2) * x.cos() - 1.0)
}

/// Largest `d` with `d^arity <= points`.
fn points_per_dimension(points: usize, arity: usize) -> usize {
    let exponent = u32::try_from(arity).unwrap_or(u32::MAX);
    let mut d = 0usize;
    while (d + 1)
        .checked_pow(exponent)
        .is_some_and(|p| p <= points)
    {
        d += 1;
    }
    d
}

#[allow(clippy::cast_precision_loss)]
fn grid(arity: usize, lower: f64, upper: f64, points: usize) -> Result<Vec<Vec<f64>>> {
    let per_dim = points_per_dimension(points, arity);
    if per_dim < 2 {
        return Err(Error::Dataset(format!(
            "{points} points give fewer than two grid points per dimension"
        )));
    }
    let step = (upper - lower) / (per_dim - 1) as f64;
    let axis: Vec<f64> = (0..per_dim).map(|i| lower + i as f64 * step).collect();

    let mut rows = vec![Vec::new()];
    for _ in 0..arity {
        rows = rows
            .into_iter()
            .flat_map(|prefix| {
                axis.iter().map(move |&v| {
                    let mut row = prefix.clone();
                    row.push(v);
                    row
                })
            })
            .collect();
    }
    Ok(rows)
}

fn uniform(arity: usize, lower: f64, upper: f64, per_axis: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples: Vec<Vec<f64>> = (0..arity)
        .map(|_| (0..per_axis).map(|_| rng.gen_range(lower..upper)).collect())
        .collect();

    let mut rows = vec![Vec::new()];
    for sample in &samples {
        rows = rows
            .into_iter()
            .flat_map(|prefix| {
                sample.iter().map(move |&v| {
                    let mut row = prefix.clone();
                    row.push(v);
                    row
                })
            })
            .collect();
    }
    rows
}

impl fmt::Display for SyntheticFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Salustowicz1d => f.write_str("salustowicz-1d"),
            Self::Salustowicz2d => f.write_str("salustowicz-2d"),
            Self::Kotanchek => f.write_str("kotanchek"),
            Self::LogTrig => f.write_str("log-trig"),
            Self::PolySine => f.write_str("poly-sine"),
            Self::Sinc(n) => write!(f, "sinc-{n}"),
        }
    }
}

impl FromStr for SyntheticFunction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "salustowicz-1d" => Ok(Self::Salustowicz1d),
            "salustowicz-2d" => Ok(Self::Salustowicz2d),
            "kotanchek" => Ok(Self::Kotanchek),
            "log-trig" => Ok(Self::LogTrig),
            "poly-sine" => Ok(Self::PolySine),
            _ => match s.strip_prefix("sinc-").and_then(|n| n.parse().ok()) {
                Some(n @ (2 | 4 | 6 | 8 | 10)) => Ok(Self::Sinc(n)),
                _ => Err(Error::Config(format!("unknown synthetic function '{s}'"))),
            },
        }
    }
}

/// How input points are chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Sampling {
    /// Regular grid over `[lower, upper]^arity` with about `points` points.
    Grid {
        /// Lower bound per dimension
        lower: f64,
        /// Upper bound per dimension
        upper: f64,
        /// Total number of points (rounded down to a full grid)
        points: usize,
    },
    /// Cartesian product of `per_axis` uniform samples per dimension.
    Uniform {
        /// Lower bound per dimension
        lower: f64,
        /// Upper bound per dimension (exclusive)
        upper: f64,
        /// Samples per dimension
        per_axis: usize,
        /// RNG seed
        seed: u64,
    },
}

impl Sampling {
    const fn bounds(&self) -> (f64, f64) {
        match *self {
            Self::Grid { lower, upper, .. } | Self::Uniform { lower, upper, .. } => (lower, upper),
        }
    }
}
