use crate::discretize::axis_align;
use crate::error::NcutError;
use crate::tests::{init, two_cluster_agreement, uniform_features};
use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn assert_one_hot(one_hot: &DMatrix<f64>, labels: &[usize]) {
    for (i, row) in one_hot.row_iter().enumerate() {
        assert_eq!(row.sum(), 1.0, "row {i} is not one-hot");
        assert_eq!(row.iter().filter(|&&v| v == 1.0).count(), 1);
        assert_eq!(row[labels[i]], 1.0);
    }
}

#[test]
fn test_output_rows_are_one_hot_for_any_input() {
    init();
    for (k, seed) in [(1, 0), (2, 1), (4, 2), (7, 3)] {
        let x = uniform_features(50, k, seed).map(|v| v - 0.5);
        let out = axis_align(&x, 100, seed).unwrap();
        assert_eq!(out.one_hot.shape(), (50, k));
        assert_eq!(out.rotation.shape(), (k, k));
        assert_eq!(out.labels.len(), 50);
        assert_one_hot(&out.one_hot, &out.labels);
        assert_eq!(out.cluster_sizes().iter().sum::<usize>(), 50);
    }
}

#[test]
fn test_single_component_puts_everything_in_one_cluster() {
    let x = uniform_features(10, 1, 4);
    let out = axis_align(&x, 10, 0).unwrap();
    assert!(out.labels.iter().all(|&c| c == 0));
    assert!(out.converged);
}

#[test]
fn test_recovers_well_separated_directions() {
    // Two groups of rows near (1, 1) and (1, −1), as a two-way NCut embedding looks.
    let mut rng = StdRng::seed_from_u64(5);
    let mut rows = Vec::new();
    let mut truth = Vec::new();
    for i in 0..60 {
        let side = if i % 2 == 0 { 1.0 } else { -1.0 };
        rows.push(1.0 + rng.random_range(-0.1..0.1));
        rows.push(side * (1.0 + rng.random_range(-0.1..0.1)));
        truth.push(i % 2);
    }
    let x = DMatrix::from_row_slice(60, 2, &rows);

    let out = axis_align(&x, 300, 0).unwrap();
    assert!(out.converged);
    assert_eq!(two_cluster_agreement(&out.labels, &truth), 1.0);

    // The rotation stays orthogonal.
    let rrt = &out.rotation * out.rotation.transpose();
    assert!((rrt - DMatrix::<f64>::identity(2, 2)).amax() < 1e-10);
}

#[test]
fn test_zero_rows_still_get_a_label() {
    let mut x = uniform_features(8, 3, 6);
    x.row_mut(2).fill(0.0);
    let out = axis_align(&x, 50, 0).unwrap();
    assert_one_hot(&out.one_hot, &out.labels);
}

#[test]
fn test_iteration_budget_exhaustion_is_not_an_error() {
    let x = uniform_features(30, 3, 7).map(|v| v - 0.5);

    let none = axis_align(&x, 0, 0).unwrap();
    assert_eq!(none.iterations, 0);
    assert!(!none.converged);
    assert_one_hot(&none.one_hot, &none.labels);

    // One pass always updates R and never sees a second objective.
    let once = axis_align(&x, 1, 0).unwrap();
    assert_eq!(once.iterations, 1);
    assert!(!once.converged);
    assert_one_hot(&once.one_hot, &once.labels);
}

#[test]
fn test_degenerate_shapes_are_rejected() {
    assert!(matches!(
        axis_align(&DMatrix::<f64>::zeros(5, 0), 10, 0),
        Err(NcutError::Configuration(_))
    ));
    assert!(matches!(
        axis_align(&DMatrix::<f64>::zeros(0, 3), 10, 0),
        Err(NcutError::EmptyInput(_))
    ));
}
