//! End-to-end scoring pipeline tests
//!
//! Exercise the public API the way a serving layer would: generate a table,
//! train, score sites, persist and reload the model.

use std::collections::HashMap;

use mineral_invest::ml_engine::{train_test_split, ModelBundle};
use mineral_invest::{
    generate, FeatureVector, InvestmentScorer, ScorerConfig, ScorerError, SharedScorer,
    FEATURE_NAMES, NUM_FEATURES,
};

fn example_site() -> HashMap<String, f64> {
    [
        ("reserve_tonnes", 5000.0),
        ("price_trend", 0.08),
        ("logistics_score", 0.7),
        ("governance_score", 0.6),
        ("extraction_cost", 80.0),
        ("transport_cost", 45.0),
        ("political_risk", 0.3),
        ("environmental_score", 0.8),
        ("proximity_to_ports", 150.0),
        ("energy_cost_index", 1.2),
        ("local_refining_capacity", 0.4),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn trained_scorer() -> InvestmentScorer {
    let mut scorer = InvestmentScorer::new(ScorerConfig::default());
    scorer
        .train(&generate(200).expect("generate"))
        .expect("train");
    scorer
}

// ============================================================================
// Synthesizer
// ============================================================================

#[test]
fn generate_is_reproducible_for_every_size() {
    for n in [1, 7, 64, 200] {
        assert_eq!(generate(n).expect("generate"), generate(n).expect("generate"));
    }
}

#[test]
fn generated_targets_stay_in_unit_interval() {
    let table = generate(1000).expect("generate");
    assert!(table
        .iter()
        .all(|r| (0.0..=1.0).contains(&r.investment_score)));
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn reference_scenario_metrics_are_sane() {
    let mut scorer = InvestmentScorer::new(ScorerConfig::default());
    let report = scorer
        .train(&generate(200).expect("generate"))
        .expect("train");

    assert_eq!(report.n_train, 160);
    assert_eq!(report.n_test, 40);
    assert_eq!(report.n_trees, 100);
    assert!(report.test_r2.is_finite());
    assert!(report.train_r2.is_finite());
    assert!(report.test_mse >= 0.0 && report.test_mse.is_finite());
    assert!(report.train_mse >= 0.0);
    // The forest fits its own partition better than the held-out one
    assert!(report.train_mse <= report.test_mse);

    let names: Vec<&str> = report
        .feature_importance
        .iter()
        .map(|f| f.feature.as_str())
        .collect();
    for name in FEATURE_NAMES {
        assert!(names.contains(&name), "{name} missing from importance ranking");
    }
}

#[test]
fn training_is_reproducible() {
    let table = generate(150).expect("generate");
    let mut a = InvestmentScorer::new(ScorerConfig::default());
    let mut b = InvestmentScorer::new(ScorerConfig::default());
    let ra = a.train(&table).expect("train");
    let rb = b.train(&table).expect("train");
    assert_eq!(ra, rb);

    let site = FeatureVector::from_map(&example_site()).expect("site");
    assert_eq!(
        a.predict(&site).expect("predict").to_bits(),
        b.predict(&site).expect("predict").to_bits()
    );
}

#[test]
fn scaler_ignores_held_out_rows() {
    let config = ScorerConfig::default();
    let table = generate(200).expect("generate");
    let partition = train_test_split(
        table.len(),
        config.training.test_fraction,
        config.training.split_seed,
    )
    .expect("split");

    let mut perturbed = table.clone();
    for &i in &partition.test {
        let f = &mut perturbed.records_mut()[i].features;
        f.reserve_tonnes *= 1000.0;
        f.price_trend += 5.0;
        f.extraction_cost = 1e6;
        f.proximity_to_ports = -3.0;
    }

    let mut original = InvestmentScorer::new(config.clone());
    let mut shifted = InvestmentScorer::new(config);
    original.train(&table).expect("train");
    shifted.train(&perturbed).expect("train");

    assert_eq!(
        original.scaler().expect("scaler"),
        shifted.scaler().expect("scaler")
    );
}

#[test]
fn too_small_table_is_a_validation_error() {
    let mut scorer = InvestmentScorer::new(ScorerConfig::default());
    let err = scorer
        .train(&generate(5).expect("generate"))
        .expect_err("5 rows cannot be split");
    assert!(matches!(err, ScorerError::Validation(_)));
    assert!(!scorer.is_trained());
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn example_site_scores_strictly_inside_unit_interval() {
    let scorer = trained_scorer();
    let score = scorer.predict_map(&example_site()).expect("predict");
    assert!(score > 0.0 && score < 1.0, "score = {score}");
}

#[test]
fn adversarial_inputs_are_clamped() {
    let scorer = trained_scorer();
    let extremes = [-1e12, -1.0, 0.0, 1e-9, 1e6, 1e15];
    for (i, &x) in extremes.iter().enumerate() {
        for &y in &extremes {
            let mut v = [x; NUM_FEATURES];
            v[i % NUM_FEATURES] = y;
            let score = scorer
                .predict(&FeatureVector::from_array(v))
                .expect("predict");
            assert!((0.0..=1.0).contains(&score), "score {score} for {v:?}");
        }
    }
}

#[test]
fn predict_before_training_is_uninitialized() {
    let scorer = InvestmentScorer::new(ScorerConfig::default());
    assert!(matches!(
        scorer.predict_map(&example_site()),
        Err(ScorerError::Uninitialized(_))
    ));
}

#[test]
fn missing_feature_is_not_zero_filled() {
    let scorer = trained_scorer();
    let mut site = example_site();
    site.remove("reserve_tonnes");
    match scorer.predict_map(&site) {
        Err(ScorerError::MissingFeatures(names)) => assert_eq!(names, vec!["reserve_tonnes"]),
        other => panic!("expected MissingFeatures, got {other:?}"),
    }
}

#[test]
fn assessment_matches_score() {
    let scorer = trained_scorer();
    let site = FeatureVector::from_map(&example_site()).expect("site");
    let score = scorer.predict(&site).expect("predict");
    let assessment = scorer.assess(&site).expect("assess");
    assert!((assessment.investment_score - score).abs() <= 0.0005 + 1e-12);
    assert_eq!(assessment.recommendation.proceed, score >= 0.5);
    assert_eq!(assessment.recommendation.key_factors.len(), 3);
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn save_load_round_trip_is_bit_identical() {
    let scorer = trained_scorer();
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("model.json");
    scorer.save(&path).expect("save");

    let mut fresh = InvestmentScorer::new(ScorerConfig::default());
    fresh.load(&path).expect("load");

    let table = generate(50).expect("generate");
    for record in &table {
        let a = scorer.predict(&record.features).expect("predict");
        let b = fresh.predict(&record.features).expect("predict");
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn save_before_training_fails() {
    let scorer = InvestmentScorer::new(ScorerConfig::default());
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("model.json");
    assert!(matches!(scorer.save(&path), Err(ScorerError::Uninitialized(_))));
    assert!(!path.exists());
}

#[test]
fn failed_load_keeps_current_model() {
    let mut scorer = trained_scorer();
    let site = FeatureVector::from_map(&example_site()).expect("site");
    let before = scorer.predict(&site).expect("predict");

    let dir = tempfile::tempdir().expect("tmpdir");
    let missing = dir.path().join("absent.json");
    assert!(matches!(scorer.load(&missing), Err(ScorerError::Io { .. })));

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, b"{\"format_version\": 1, \"feature_names\": 3}").expect("write");
    assert!(matches!(
        scorer.load(&corrupt),
        Err(ScorerError::CorruptBundle { .. })
    ));

    assert_eq!(scorer.predict(&site).expect("predict"), before);
}

#[test]
fn bundle_with_foreign_feature_order_is_rejected() {
    let scorer = trained_scorer();
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("model.json");
    scorer.save(&path).expect("save");

    let raw = std::fs::read(&path).expect("read");
    let mut bundle: ModelBundle = serde_json::from_slice(&raw).expect("parse");
    bundle.feature_names.reverse();
    std::fs::write(&path, serde_json::to_vec(&bundle).expect("encode")).expect("write");

    let mut fresh = InvestmentScorer::new(ScorerConfig::default());
    assert!(matches!(
        fresh.load(&path),
        Err(ScorerError::CorruptBundle { .. })
    ));
    assert!(!fresh.is_trained());
}

#[test]
fn shared_scorer_reloads_saved_bundle() {
    let scorer = trained_scorer();
    let dir = tempfile::tempdir().expect("tmpdir");
    let path = dir.path().join("model.json");
    scorer.save(&path).expect("save");

    let shared = SharedScorer::new(ScorerConfig::default());
    shared.load(&path).expect("load");
    let site = FeatureVector::from_map(&example_site()).expect("site");
    assert_eq!(
        shared.predict(&site).expect("predict").to_bits(),
        scorer.predict(&site).expect("predict").to_bits()
    );
}
