use std::ops::RangeInclusive;

use rand::{
    distributions::{Distribution, Uniform},
    Rng,
};

use crate::matrix::Matrix2;

pub fn vector(len: usize, fill: f64) -> Vec<f64> {
    vec![fill; len]
}

/// Matrix of uniformly random values drawn from `range`, sampled row by row.
pub fn random_matrix<R: Rng + ?Sized>(
    rng: &mut R,
    rows: usize,
    cols: usize,
    range: RangeInclusive<f64>,
) -> Matrix2<f64> {
    let die = Uniform::from(range);
    Matrix2::from_fn(rows, cols, |_, _| die.sample(&mut *rng))
}
