use crate::affinity::{affinity, distance, quantile};
use crate::config::DistanceMetric;
use crate::error::NcutError;
use crate::tests::{init, uniform_features};
use approx::assert_relative_eq;
use nalgebra::DMatrix;

// ─────────────────────────────────────────────────────────────────────────────
// Known values
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_euclidean_affinity_matches_closed_form() {
    init();
    let a = DMatrix::from_row_slice(1, 2, &[0.0, 0.0]);
    let b = DMatrix::from_row_slice(2, 2, &[3.0, 4.0, 0.0, 1.0]);

    let w = affinity(&a, &b, 1.0, DistanceMetric::Euclidean).unwrap();
    assert_eq!(w.shape(), (1, 2));
    assert_relative_eq!(w[(0, 0)], (-5.0f64).exp(), max_relative = 1e-4);
    assert_relative_eq!(w[(0, 1)], (-1.0f64).exp(), max_relative = 1e-4);

    // γ rescales the distance
    let w5 = affinity(&a, &b, 5.0, DistanceMetric::Euclidean).unwrap();
    assert_relative_eq!(w5[(0, 0)], (-1.0f64).exp(), max_relative = 1e-4);
}

#[test]
fn test_cosine_distance_ignores_magnitude() {
    let a = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, -3.0, 0.0]);
    let d = distance(&a, &a, DistanceMetric::Cosine).unwrap();

    assert_relative_eq!(d[(0, 0)], 0.0, epsilon = 1e-6);
    assert_relative_eq!(d[(0, 1)], 1.0, epsilon = 1e-6); // orthogonal
    assert_relative_eq!(d[(0, 2)], 2.0, epsilon = 1e-6); // opposite
    assert_relative_eq!(d[(1, 2)], 1.0, epsilon = 1e-6);
}

#[test]
fn test_quantile_interpolates_between_neighbours() {
    let s = [0.0, 1.0, 2.0, 3.0];
    assert_eq!(quantile(&s, 0.0), 0.0);
    assert_eq!(quantile(&s, 1.0), 3.0);
    assert_relative_eq!(quantile(&s, 0.5), 1.5, epsilon = 1e-12);
    assert_relative_eq!(quantile(&s, 0.25), 0.75, epsilon = 1e-12);
}

#[test]
fn test_rbf_scale_from_reference_quantiles() {
    // One column 0, 1, ..., 100: σ = (84.1345 − 15.8655) / 2
    let a = DMatrix::from_fn(101, 1, |i, _| i as f64);
    let sigma = (84.1345 - 15.8655) / 2.0;

    let d = distance(&a, &a, DistanceMetric::Rbf).unwrap();
    let expected = 0.5 * 100.0f64.powi(2) / (sigma * sigma);
    assert_relative_eq!(d[(0, 100)], expected, max_relative = 1e-4);
    assert_relative_eq!(d[(3, 3)], 0.0, epsilon = 1e-6);
}

// ─────────────────────────────────────────────────────────────────────────────
// Structural properties
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_self_affinity_symmetric_positive_unit_diagonal() {
    init();
    let x = uniform_features(40, 5, 3);
    for metric in [
        DistanceMetric::Cosine,
        DistanceMetric::Euclidean,
        DistanceMetric::Rbf,
    ] {
        let w = affinity(&x, &x, 0.5, metric).unwrap();
        assert_eq!(w.shape(), (40, 40));
        assert!((&w - w.transpose()).amax() < 1e-4, "{metric}: not symmetric");
        assert!(w.iter().all(|&v| v > 0.0 && v <= 1.0 + 1e-6), "{metric}: out of (0, 1]");
        for i in 0..40 {
            assert_relative_eq!(w[(i, i)], 1.0, epsilon = 1e-2);
        }
    }
}

#[test]
fn test_larger_gamma_raises_affinity() {
    let x = uniform_features(10, 3, 9);
    let sharp = affinity(&x, &x, 0.1, DistanceMetric::Euclidean).unwrap();
    let smooth = affinity(&x, &x, 1.0, DistanceMetric::Euclidean).unwrap();
    assert!(smooth.sum() > sharp.sum());
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_invalid_inputs_are_rejected() {
    let x = uniform_features(4, 3, 1);
    for gamma in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            affinity(&x, &x, gamma, DistanceMetric::Cosine),
            Err(NcutError::Configuration(_))
        ));
    }

    let y = uniform_features(4, 2, 1);
    assert!(matches!(
        affinity(&x, &y, 1.0, DistanceMetric::Cosine),
        Err(NcutError::ShapeMismatch { .. })
    ));

    let empty = DMatrix::<f64>::zeros(0, 3);
    assert!(matches!(
        affinity(&empty, &x, 1.0, DistanceMetric::Euclidean),
        Err(NcutError::EmptyInput(_))
    ));
}

#[test]
fn test_rbf_without_spread_is_degenerate() {
    let constant = DMatrix::from_element(6, 2, 0.25);
    assert!(matches!(
        affinity(&constant, &constant, 1.0, DistanceMetric::Rbf),
        Err(NcutError::NumericalDegeneracy(_))
    ));
}
