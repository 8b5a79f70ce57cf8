//! Draws from a [`Distribution`] using `rand_distr`.

use rand::Rng;
use rand_distr::{Beta, Distribution as RandDistribution, LogNormal, Normal, Triangular, Uniform};

use crate::errors::ValidationError;
use crate::types::Distribution;

fn rejected(err: impl std::fmt::Display) -> ValidationError {
    ValidationError::OutOfRange {
        field: "params",
        reason: err.to_string(),
    }
}

fn draw<D, R>(dist: D, n: usize, rng: &mut R) -> Vec<f64>
where
    D: RandDistribution<f64>,
    R: Rng + ?Sized,
{
    (0..n).map(|_| dist.sample(rng)).collect()
}

/// Draw `n` independent values.
///
/// Out-of-range parameters are rejected before sampling. Zero-width uniform
/// and triangular ranges collapse to a constant.
pub fn sample<R: Rng + ?Sized>(
    distribution: &Distribution,
    n: usize,
    rng: &mut R,
) -> Result<Vec<f64>, ValidationError> {
    distribution.check_bounds()?;

    let values = match *distribution {
        Distribution::Normal { mean, std } => draw(Normal::new(mean, std).map_err(rejected)?, n, rng),
        Distribution::Uniform { min, max } if min == max => vec![min; n],
        Distribution::Uniform { min, max } => draw(Uniform::new(min, max), n, rng),
        Distribution::Triangular { min, max, .. } if min == max => vec![min; n],
        Distribution::Triangular { min, mode, max } => {
            draw(Triangular::new(min, max, mode).map_err(rejected)?, n, rng)
        }
        Distribution::Lognormal { mean, sigma } => {
            draw(LogNormal::new(mean, sigma).map_err(rejected)?, n, rng)
        }
        Distribution::Beta { alpha, beta } => draw(Beta::new(alpha, beta).map_err(rejected)?, n, rng),
        Distribution::Constant { value } => vec![value; n],
    };
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_normal_moments() {
        let values = sample(&Distribution::Normal { mean: 10.0, std: 2.0 }, 20_000, &mut rng()).unwrap();
        assert_eq!(values.len(), 20_000);
        assert!((stats::mean(&values) - 10.0).abs() < 0.1);
        assert!((stats::std_dev(&values) - 2.0).abs() < 0.1);
    }

    #[test]
    fn test_bounded_supports() {
        let mut r = rng();
        let uniform = sample(&Distribution::Uniform { min: -1.0, max: 3.0 }, 5000, &mut r).unwrap();
        assert!(uniform.iter().all(|&v| (-1.0..3.0).contains(&v)));

        let tri = sample(
            &Distribution::Triangular {
                min: 0.0,
                mode: 0.2,
                max: 1.0,
            },
            5000,
            &mut r,
        )
        .unwrap();
        assert!(tri.iter().all(|&v| (0.0..=1.0).contains(&v)));

        let beta = sample(&Distribution::Beta { alpha: 2.5, beta: 7.25 }, 5000, &mut r).unwrap();
        assert!(beta.iter().all(|&v| (0.0..=1.0).contains(&v)));

        let lognormal = sample(&Distribution::Lognormal { mean: 0.0, sigma: 0.5 }, 5000, &mut r).unwrap();
        assert!(lognormal.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_degenerate_ranges() {
        let mut r = rng();
        assert_eq!(
            sample(&Distribution::Uniform { min: 2.0, max: 2.0 }, 3, &mut r).unwrap(),
            vec![2.0; 3]
        );
        assert_eq!(
            sample(&Distribution::Constant { value: -4.5 }, 2, &mut r).unwrap(),
            vec![-4.5; 2]
        );
        assert_eq!(
            sample(&Distribution::Normal { mean: 1.0, std: 0.0 }, 2, &mut r).unwrap(),
            vec![1.0; 2]
        );
    }

    #[test]
    fn test_rejects_out_of_range() {
        let err = sample(&Distribution::Beta { alpha: -1.0, beta: 1.0 }, 10, &mut rng()).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { field: "alpha", .. }));
    }
}
