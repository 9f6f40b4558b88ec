use crate::stages::discretization::DiscretizationStage;
use crate::stages::embedding::EmbeddingStage;
use crate::tests::{agreement, blobs_2d, init};
use crate::SpectralClusteringPipeline;
use approx::assert_relative_eq;
use ncut_core::{DistanceMetric, EigSolver, NcutConfig, NcutError, SampleMethod};

// ─────────────────────────────────────────────────────────────────────────────
// End to end
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_two_gaussians_are_recovered() {
    init();
    let (x, truth) = blobs_2d(&[(-3.0, 0.0), (3.0, 0.0)], 1000, 0.3, 42);

    let config = NcutConfig {
        n_components: 2,
        num_sample: 200,
        affinity_focal_gamma: 1.0,
        sample_method: SampleMethod::Farthest,
        distance: DistanceMetric::Euclidean,
        ..NcutConfig::default()
    };
    let output = SpectralClusteringPipeline::new(config)
        .unwrap()
        .execute(&x)
        .unwrap();

    assert_eq!(output.embedding.shape(), (2000, 2));
    assert_eq!(output.one_hot.shape(), (2000, 2));
    assert_eq!(output.anchor_indices.len(), 200);
    assert!(output.embedding.iter().all(|v| v.is_finite()));

    let score = agreement(&output.labels, &truth, 2);
    assert!(score >= 0.95, "agreement {score:.3} below 0.95");
}

#[test]
fn test_two_gaussians_with_default_metric_and_solver() {
    init();
    let (x, truth) = blobs_2d(&[(-3.0, 0.0), (3.0, 0.0)], 1000, 0.3, 42);

    // Cosine distance, randomized SVD, farthest-point anchors.
    let mut pipeline = SpectralClusteringPipeline::with_defaults().unwrap();
    pipeline.config.n_components = 2;
    pipeline.config.num_sample = 200;
    let output = pipeline.execute(&x).unwrap();

    assert_eq!(output.embedding.shape(), (2000, 2));
    assert_eq!(output.anchor_indices.len(), 200);
    let score = agreement(&output.labels, &truth, 2);
    assert!(score >= 0.95, "agreement {score:.3} below 0.95");
}

#[test]
fn test_with_defaults_uses_default_config() {
    let default_summary = NcutConfig::default().summary();
    let pipeline = SpectralClusteringPipeline::with_defaults().unwrap();
    assert_eq!(pipeline.config.summary(), default_summary);
    assert!(pipeline.precomputed_indices.is_none());
    assert_eq!(EmbeddingStage::with_defaults().config.summary(), default_summary);
}

#[test]
fn test_three_gaussians_with_random_anchors() {
    init();
    let (x, truth) = blobs_2d(&[(-4.0, 0.0), (4.0, 0.0), (0.0, 5.0)], 150, 0.4, 7);

    let config = NcutConfig {
        n_components: 3,
        num_sample: 90,
        sample_method: SampleMethod::Random,
        distance: DistanceMetric::Euclidean,
        eig_solver: EigSolver::SubspaceIteration,
        chunk_size: 64,
        ..NcutConfig::default()
    };
    let output = SpectralClusteringPipeline::new(config)
        .unwrap()
        .execute(&x)
        .unwrap();

    assert_eq!(output.n_clusters(), 3);
    let score = agreement(&output.labels, &truth, 3);
    assert!(score >= 0.95, "agreement {score:.3} below 0.95");
}

#[test]
fn test_precomputed_anchors_pass_through() {
    let (x, _) = blobs_2d(&[(-3.0, 0.0), (3.0, 0.0)], 30, 0.3, 3);
    let anchors: Vec<usize> = (0..60).step_by(3).collect();

    let config = NcutConfig {
        distance: DistanceMetric::Euclidean,
        ..NcutConfig::exact(2)
    };
    let output = SpectralClusteringPipeline::new(config)
        .unwrap()
        .with_precomputed_indices(anchors.clone())
        .execute(&x)
        .unwrap();

    assert_eq!(output.anchor_indices, anchors);
    assert_eq!(output.labels.len(), 60);
}

#[test]
fn test_invalid_config_fails_before_running() {
    let config = NcutConfig {
        chunk_size: 0,
        ..NcutConfig::default()
    };
    assert!(matches!(
        SpectralClusteringPipeline::new(config),
        Err(NcutError::Configuration(_))
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Individual stages
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_stages_compose_by_hand() {
    init();
    let (x, truth) = blobs_2d(&[(-3.0, 0.0), (3.0, 0.0)], 40, 0.3, 11);
    let config = NcutConfig {
        distance: DistanceMetric::Euclidean,
        num_sample: 500,
        ..NcutConfig::exact(2)
    };

    // Fewer points than num_sample: every point is an anchor.
    let embedded = EmbeddingStage::new(config.clone()).execute(&x, None).unwrap();
    assert_eq!(embedded.anchor_indices, (0..80).collect::<Vec<_>>());
    assert_relative_eq!(embedded.embedding.eigenvalues[0], 1.0, epsilon = 1e-5);

    let alignment = DiscretizationStage::from_config(&config)
        .execute(&embedded.embedding)
        .unwrap();
    assert!(alignment.converged);
    assert_eq!(agreement(&alignment.labels, &truth, 2), 1.0);
}
