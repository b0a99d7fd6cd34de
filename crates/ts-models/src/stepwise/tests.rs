//! Tests for the stepwise selection engine
//!
//! Covers criterion scoring and threshold validation, the QR redundancy
//! check, the least-squares oracle, and full engine runs including
//! anti-cycling, budget/resume semantics, and the non-nested chi-square
//! removal short-circuit.

use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use ts_core::TermSet;

use crate::base::{FitOracle, FitStatistics};
use crate::error::StepwiseError;
use crate::stepwise::{
    is_redundant, orthonormal_basis, stepwise, Action, Bounds, Criterion, Direction,
    LeastSquaresOracle, NullObserver, Polarity, StepEvent, StepObserver, StepOutcome, StepReport,
    Stepwise, StepwiseConfig,
};

// ==================== Fixtures ====================

/// A vector orthogonal to the intercept, x1 = 1..8, the alternating x2,
/// and x1*x2; used to add noise that least squares cannot absorb.
const NOISE: [f64; 8] = [1.0, 1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0];

fn x1_values() -> Vec<f64> {
    (1..=8).map(|v| v as f64).collect()
}

fn x2_values() -> Vec<f64> {
    (0..8).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
}

/// Oracle over (x1, x2) with y = 1 + 2*x1 + 0.1*noise: x1 carries all the
/// signal, x2 and the interaction none.
fn x1_only_oracle() -> LeastSquaresOracle {
    let x1 = x1_values();
    let x2 = x2_values();
    let mut variables = Array2::zeros((8, 2));
    let mut y = Array1::zeros(8);
    for i in 0..8 {
        variables[(i, 0)] = x1[i];
        variables[(i, 1)] = x2[i];
        y[i] = 1.0 + 2.0 * x1[i] + 0.1 * NOISE[i];
    }
    LeastSquaresOracle::new(variables, &["x1", "x2"], y).unwrap()
}

/// Oracle where both variables carry signal: y = 1 + 2*x1 + 3*x2 + noise.
fn both_signal_oracle() -> LeastSquaresOracle {
    let x1 = x1_values();
    let x2 = x2_values();
    let mut variables = Array2::zeros((8, 2));
    let mut y = Array1::zeros(8);
    for i in 0..8 {
        variables[(i, 0)] = x1[i];
        variables[(i, 1)] = x2[i];
        y[i] = 1.0 + 2.0 * x1[i] + 3.0 * x2[i] + 0.1 * NOISE[i];
    }
    LeastSquaresOracle::new(variables, &["x1", "x2"], y).unwrap()
}

fn intercept_only() -> TermSet {
    TermSet::from_rows(&[vec![0, 0]], &["x1", "x2"]).unwrap()
}

fn full_bounds() -> Bounds {
    let lower = intercept_only();
    let upper = TermSet::from_rows(
        &[vec![0, 0], vec![1, 0], vec![0, 1], vec![1, 1]],
        &["x1", "x2"],
    )
    .unwrap();
    Bounds::new(lower, upper).unwrap()
}

fn stats(deviance: f64, dfe: f64, n_coefficients: usize) -> FitStatistics {
    FitStatistics {
        n_obs: 20,
        n_coefficients,
        sse: deviance,
        deviance,
        dfe,
        dispersion: 1.0,
        dispersion_estimated: false,
        log_likelihood: 0.0,
        aic: 0.0,
        bic: 0.0,
        r_squared: 0.0,
        adj_r_squared: 0.0,
    }
}

/// Observer recording every event for assertions
#[derive(Default)]
struct Recorder {
    evaluated: Vec<(Direction, String, f64)>,
    skipped: Vec<String>,
    committed: Vec<Action>,
    ended: Vec<String>,
}

impl StepObserver for Recorder {
    fn on_event(&mut self, event: &StepEvent<'_>) {
        match event {
            StepEvent::CandidateEvaluated {
                direction,
                term,
                score,
                ..
            } => self.evaluated.push((*direction, term.to_string(), *score)),
            StepEvent::CandidateSkipped { term, .. } => self.skipped.push(term.to_string()),
            StepEvent::StepCommitted { entry } => self.committed.push(entry.action),
            StepEvent::SessionEnded { reason } => self.ended.push(reason.to_string()),
        }
    }
}

/// Oracle returning canned statistics keyed by the term-set rendering
struct CannedOracle {
    fits: Vec<(String, FitStatistics)>,
}

impl FitOracle for CannedOracle {
    fn fit(&self, terms: &TermSet) -> crate::base::Result<FitStatistics> {
        let key = terms.to_string();
        self.fits
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, s)| *s)
            .ok_or_else(|| StepwiseError::FitFailed {
                terms: key,
                message: "no canned fit".to_string(),
            })
    }

    fn design_columns(&self, terms: &TermSet) -> crate::base::Result<Array2<f64>> {
        Ok(Array2::zeros((20, terms.n_terms())))
    }
}

// ==================== Criterion scoring ====================

#[test]
fn test_sse_f_test_detects_strong_signal() {
    let smaller = stats(168.08, 7.0, 1);
    let larger = stats(0.08, 6.0, 2);
    let (score, report) = Criterion::Sse.score(&smaller, &larger).unwrap();

    match report {
        StepReport::FTest { f, p_value } => {
            assert_abs_diff_eq!(f, 12600.0, epsilon = 1.0);
            assert_eq!(score, p_value);
            assert!(p_value < 1e-6);
        }
        other => panic!("expected an F-test report, got {:?}", other),
    }
}

#[test]
fn test_sse_f_test_non_nested_is_nan() {
    let smaller = stats(100.0, 10.0, 3);
    let larger = stats(90.0, 10.0, 3);
    let (score, _) = Criterion::Sse.score(&smaller, &larger).unwrap();
    assert!(score.is_nan());
}

#[test]
fn test_chi_square_test_values() {
    let smaller = stats(110.0, 11.0, 2);
    let larger = stats(100.0, 10.0, 3);
    let (score, report) = Criterion::Deviance.score(&smaller, &larger).unwrap();

    match report {
        StepReport::ChiSquare { chi2, p_value } => {
            assert_abs_diff_eq!(chi2, 10.0, epsilon = 1e-12);
            // Survival of chi2(1) at 10 is about 0.00157.
            assert_abs_diff_eq!(p_value, 0.001565, epsilon = 1e-4);
            assert_eq!(score, p_value);
        }
        other => panic!("expected a chi-square report, got {:?}", other),
    }
}

#[test]
fn test_deviance_uses_f_when_dispersion_estimated() {
    let smaller = stats(110.0, 11.0, 2);
    let mut larger = stats(100.0, 10.0, 3);
    larger.dispersion_estimated = true;
    let (_, report) = Criterion::Deviance.score(&smaller, &larger).unwrap();
    assert!(matches!(report, StepReport::FTest { .. }));
}

#[test]
fn test_aic_delta_sign() {
    let mut smaller = stats(0.0, 10.0, 2);
    let mut larger = stats(0.0, 9.0, 3);
    smaller.aic = 50.0;
    larger.aic = 45.0;
    let (score, report) = Criterion::Aic.score(&smaller, &larger).unwrap();
    assert_abs_diff_eq!(score, -5.0, epsilon = 1e-12);
    assert!(matches!(report, StepReport::Delta { delta } if delta == -5.0));
    // An AIC drop of 5 qualifies for entry under the default threshold.
    assert!(Criterion::Aic.qualifies_enter(score, Criterion::Aic.default_enter()));
}

#[test]
fn test_best_candidate_comparisons_handle_nan() {
    let c = Criterion::Sse;
    assert!(c.better_add(0.01, 0.5));
    assert!(!c.better_add(0.5, 0.01));
    assert!(!c.better_add(0.01, 0.01), "ties keep the first candidate");
    assert!(!c.better_add(f64::NAN, 0.9));
    assert!(c.better_add(0.9, f64::NAN));

    assert!(c.better_remove(0.9, 0.5));
    assert!(!c.better_remove(0.5, 0.9));
    assert!(c.qualifies_remove(f64::NAN, 0.10));

    let r = Criterion::RSquared;
    assert!(r.better_add(0.3, 0.2));
    assert!(r.better_remove(0.01, 0.02));
    assert!(r.qualifies_enter(0.15, 0.10));
    assert!(r.qualifies_remove(0.01, 0.05));
}

// ==================== Threshold validation ====================

#[test]
fn test_threshold_ordering_validated_eagerly() {
    // AIC is smaller-is-better: enter must stay below remove.
    let config = StepwiseConfig::default()
        .criterion(Criterion::Aic)
        .enter(0.02)
        .remove(0.01);
    let err = Stepwise::new(intercept_only(), full_bounds(), config).unwrap_err();
    match err {
        StepwiseError::InvalidThresholds {
            criterion,
            enter,
            remove,
            required,
        } => {
            assert_eq!(criterion, "aic");
            assert_eq!(enter, 0.02);
            assert_eq!(remove, 0.01);
            assert_eq!(required, "enter < remove");
        }
        other => panic!("expected InvalidThresholds, got {:?}", other),
    }

    // Larger-is-better polarity flips the requirement.
    let config = StepwiseConfig::default()
        .criterion(Criterion::RSquared)
        .enter(0.01)
        .remove(0.05);
    assert!(Stepwise::new(intercept_only(), full_bounds(), config).is_err());

    // Defaults are consistent for every built-in criterion.
    for criterion in [
        Criterion::Sse,
        Criterion::Deviance,
        Criterion::Aic,
        Criterion::Bic,
        Criterion::RSquared,
        Criterion::AdjRSquared,
    ] {
        criterion
            .validate_thresholds(criterion.default_enter(), criterion.default_remove())
            .unwrap();
    }
}

#[test]
fn test_custom_criterion_requires_name_and_ordering() {
    let score: crate::stepwise::ScoreFn = std::sync::Arc::new(|s, l| l.aic - s.aic);

    let unnamed = Criterion::Custom {
        name: String::new(),
        polarity: Polarity::SmallerBetter,
        enter: 0.0,
        remove: 0.01,
        score: score.clone(),
    };
    assert!(matches!(
        unnamed.validate_thresholds(0.0, 0.01),
        Err(StepwiseError::InvalidConfig { .. })
    ));

    let named = Criterion::Custom {
        name: "my_aic".to_string(),
        polarity: Polarity::SmallerBetter,
        enter: 0.0,
        remove: 0.01,
        score,
    };
    named.validate_thresholds(0.0, 0.01).unwrap();
    assert!(named.validate_thresholds(0.5, 0.1).is_err());
}

// ==================== Redundancy check ====================

#[test]
fn test_redundancy_detects_spanned_and_orthogonal_columns() {
    let n = 8;
    let mut design = Array2::zeros((n, 2));
    for i in 0..n {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = (i + 1) as f64;
    }
    let q = orthonormal_basis(&design).unwrap();

    // A linear combination of existing columns is redundant at any scale.
    let mut spanned = Array2::zeros((n, 1));
    for i in 0..n {
        spanned[(i, 0)] = 2.0 + 3.0 * (i + 1) as f64;
    }
    assert!(is_redundant(q.view(), spanned.view()));
    let tiny = spanned.mapv(|v| v * 1e-9);
    assert!(is_redundant(q.view(), tiny.view()));

    // A column orthogonal to the design is not.
    let mut orthogonal = Array2::zeros((n, 1));
    for (i, &e) in NOISE.iter().enumerate() {
        orthogonal[(i, 0)] = e;
    }
    assert!(!is_redundant(q.view(), orthogonal.view()));

    // The all-zero column counts as redundant.
    let zero = Array2::zeros((n, 1));
    assert!(is_redundant(q.view(), zero.view()));
}

// ==================== Least-squares oracle ====================

#[test]
fn test_oracle_design_columns() {
    let oracle = x1_only_oracle();
    let terms = TermSet::from_rows(
        &[vec![0, 0], vec![1, 0], vec![1, 1], vec![2, 0]],
        &["x1", "x2"],
    )
    .unwrap();
    let design = oracle.design_columns(&terms).unwrap();

    assert_eq!(design.dim(), (8, 4));
    // Canonical order: intercept, x1, x1:x2, x1^2.
    assert_eq!(design[(2, 0)], 1.0);
    assert_eq!(design[(2, 1)], 3.0);
    assert_eq!(design[(2, 2)], 3.0); // x1 * x2 at row 2: 3 * 1
    assert_eq!(design[(2, 3)], 9.0);
    assert_eq!(design[(3, 2)], -4.0); // 4 * -1
}

#[test]
fn test_oracle_exact_fit_statistics() {
    let variables =
        Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let y = Array1::from_vec(vec![3.0, 5.0, 7.0, 9.0, 11.0]);
    let oracle = LeastSquaresOracle::new(variables, &["x"], y).unwrap();

    let terms = TermSet::from_rows(&[vec![0], vec![1]], &["x"]).unwrap();
    let fit = oracle.fit(&terms).unwrap();

    assert_eq!(fit.n_obs, 5);
    assert_eq!(fit.n_coefficients, 2);
    assert_abs_diff_eq!(fit.dfe, 3.0, epsilon = 1e-12);
    assert!(fit.sse < 1e-10, "exact relationship leaves no residual");
    assert_abs_diff_eq!(fit.r_squared, 1.0, epsilon = 1e-10);
}

#[test]
fn test_oracle_empty_term_set_and_insufficient_data() {
    let variables = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
    let y = Array1::from_vec(vec![1.0, 2.0, 2.0]);
    let oracle = LeastSquaresOracle::new(variables, &["x"], y).unwrap();

    let empty = TermSet::empty(&["x"]);
    let fit = oracle.fit(&empty).unwrap();
    assert_eq!(fit.n_coefficients, 0);
    assert_abs_diff_eq!(fit.sse, 9.0, epsilon = 1e-12);
    assert_abs_diff_eq!(fit.dfe, 3.0, epsilon = 1e-12);

    // Two observations leave no residual degree of freedom for two
    // coefficients.
    let variables = Array2::from_shape_vec((2, 1), vec![1.0, 2.0]).unwrap();
    let y = Array1::from_vec(vec![1.0, 2.0]);
    let oracle = LeastSquaresOracle::new(variables, &["x"], y).unwrap();
    let terms = TermSet::from_rows(&[vec![0], vec![1]], &["x"]).unwrap();
    assert!(matches!(
        oracle.fit(&terms),
        Err(StepwiseError::InsufficientData {
            n_samples: 2,
            n_predictors: 2
        })
    ));
}

// ==================== Engine: end-to-end ====================

#[test]
fn test_stepwise_selects_only_the_real_signal() {
    let oracle = x1_only_oracle();
    let config = StepwiseConfig::default()
        .criterion(Criterion::Sse)
        .enter(0.05)
        .remove(0.10)
        .max_steps(10);

    let mut session = Stepwise::new(intercept_only(), full_bounds(), config).unwrap();
    let mut recorder = Recorder::default();
    session.run(&oracle, &mut recorder).unwrap();

    assert_eq!(session.terms().to_string(), "(Intercept) + x1");

    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.entries()[0].action, Action::Start);
    assert_eq!(history.entries()[1].action, Action::Add);
    assert_eq!(history.entries()[1].term, "x1");
    assert_abs_diff_eq!(history.entries()[1].df_change, -1.0, epsilon = 1e-12);

    // The interaction stays hierarchy-blocked the whole run: x2 never
    // entered, so x1:x2 must never even have been evaluated.
    assert!(recorder
        .evaluated
        .iter()
        .all(|(_, term, _)| term != "x1:x2"));
    assert_eq!(recorder.ended, vec!["no qualifying candidates"]);

    let fit = session.fit_statistics().unwrap();
    assert_abs_diff_eq!(fit.sse, 0.08, epsilon = 1e-9);
}

#[test]
fn test_stepwise_budget_and_resume_extend_history() {
    let oracle = both_signal_oracle();
    let config = StepwiseConfig::default()
        .criterion(Criterion::Sse)
        .max_steps(1);

    let mut session = Stepwise::new(intercept_only(), full_bounds(), config).unwrap();
    let mut recorder = Recorder::default();

    session.run(&oracle, &mut recorder).unwrap();
    assert_eq!(session.history().len(), 2, "Start plus one committed add");
    assert_eq!(session.history().entries()[1].term, "x1");
    assert_eq!(recorder.ended.last().map(String::as_str), Some("step budget exhausted"));

    // Resuming gets a fresh budget and appends to the same history.
    session.run(&oracle, &mut recorder).unwrap();
    assert_eq!(session.history().len(), 3);
    assert_eq!(session.history().entries()[2].term, "x2");
    assert_eq!(session.terms().to_string(), "(Intercept) + x1 + x2");

    // A third run finds nothing to do and leaves the history alone.
    session.run(&oracle, &mut recorder).unwrap();
    assert_eq!(session.history().len(), 3);
    assert_eq!(recorder.committed, vec![Action::Add, Action::Add]);
    assert_eq!(recorder.ended.last().map(String::as_str), Some("no qualifying candidates"));
}

#[test]
fn test_stepwise_skips_redundant_candidate_without_fitting() {
    // x2's column is exactly 2 * x1, so it can never improve the design.
    let x1 = x1_values();
    let mut variables = Array2::zeros((8, 2));
    let mut y = Array1::zeros(8);
    for i in 0..8 {
        variables[(i, 0)] = x1[i];
        variables[(i, 1)] = 2.0 * x1[i];
        y[i] = 3.0 * x1[i] + 0.1 * NOISE[i];
    }
    let oracle = LeastSquaresOracle::new(variables, &["x1", "x2"], y).unwrap();

    let start = TermSet::from_rows(&[vec![0, 0], vec![1, 0]], &["x1", "x2"]).unwrap();
    let bounds = Bounds::new(
        intercept_only(),
        TermSet::from_rows(&[vec![0, 0], vec![1, 0], vec![0, 1]], &["x1", "x2"]).unwrap(),
    )
    .unwrap();

    let mut session =
        Stepwise::new(start, bounds, StepwiseConfig::default().criterion(Criterion::Sse)).unwrap();
    let mut recorder = Recorder::default();
    let outcome = session.step(&oracle, &mut recorder).unwrap();

    assert_eq!(outcome, StepOutcome::NoChange);
    assert_eq!(recorder.skipped, vec!["x2"]);
    assert_eq!(session.history().len(), 1, "only the Start entry");
    assert_eq!(session.terms().to_string(), "(Intercept) + x1");
}

#[test]
fn test_non_nested_chi_square_short_circuits_removal() {
    let current = TermSet::from_rows(&[vec![0, 0], vec![1, 0], vec![0, 1]], &["x1", "x2"]).unwrap();
    let lower = intercept_only();
    let bounds = Bounds::new(lower, current.clone()).unwrap();

    // Removing x1 leaves the error degrees of freedom unchanged (a rank
    // deficiency), so the chi-square comparison is not nested.
    let oracle = CannedOracle {
        fits: vec![
            ("(Intercept) + x1 + x2".to_string(), stats(100.0, 10.0, 3)),
            ("(Intercept) + x2".to_string(), stats(105.0, 10.0, 2)),
            ("(Intercept) + x1".to_string(), stats(120.0, 11.0, 2)),
        ],
    };

    let config = StepwiseConfig::default().criterion(Criterion::Deviance);
    let mut session = Stepwise::new(current, bounds, config).unwrap();
    let mut recorder = Recorder::default();
    let outcome = session.step(&oracle, &mut recorder).unwrap();

    match outcome {
        StepOutcome::Removed { term, score } => {
            assert_eq!(term, "x1");
            assert!(score.is_nan());
        }
        other => panic!("expected a removal, got {:?}", other),
    }

    // Early exit: x2's removal was never evaluated.
    let removals: Vec<&String> = recorder
        .evaluated
        .iter()
        .filter(|(d, _, _)| *d == Direction::Remove)
        .map(|(_, term, _)| term)
        .collect();
    assert_eq!(removals, vec!["x1"]);

    assert_eq!(session.terms().to_string(), "(Intercept) + x2");
    let last = session.history().entries().last().unwrap();
    assert_eq!(last.action, Action::Remove);
    assert!(matches!(
        last.report,
        Some(StepReport::ChiSquare { chi2, .. }) if chi2.is_nan()
    ));
}

#[test]
fn test_anti_cycling_blocks_immediate_readd() {
    // After the forced removal of x1, the next step must not offer x1 for
    // addition even though the canned fits would make it look attractive.
    let current = TermSet::from_rows(&[vec![0, 0], vec![1, 0], vec![0, 1]], &["x1", "x2"]).unwrap();
    let bounds = Bounds::new(intercept_only(), current.clone()).unwrap();

    let oracle = CannedOracle {
        fits: vec![
            ("(Intercept) + x1 + x2".to_string(), stats(100.0, 10.0, 3)),
            ("(Intercept) + x2".to_string(), stats(105.0, 10.0, 2)),
            ("(Intercept) + x1".to_string(), stats(120.0, 11.0, 2)),
            ("(Intercept)".to_string(), stats(130.0, 12.0, 1)),
        ],
    };

    let config = StepwiseConfig::default().criterion(Criterion::Deviance);
    let mut session = Stepwise::new(current, bounds, config).unwrap();
    let mut recorder = Recorder::default();

    // First step removes x1 on the non-nested comparison.
    session.step(&oracle, &mut recorder).unwrap();
    assert_eq!(session.terms().to_string(), "(Intercept) + x2");

    // Second step: x1 is excluded from the add candidates.
    session.step(&oracle, &mut recorder).unwrap();
    let adds: Vec<&String> = recorder
        .evaluated
        .iter()
        .filter(|(d, _, _)| *d == Direction::Add)
        .map(|(_, term, _)| term)
        .collect();
    assert!(adds.iter().all(|term| *term != "x1"));
}

#[test]
fn test_stepwise_convenience_runs_to_termination() {
    let oracle = x1_only_oracle();
    let session = stepwise(
        intercept_only(),
        full_bounds(),
        StepwiseConfig::default().criterion(Criterion::Sse),
        &oracle,
    )
    .unwrap();
    assert_eq!(session.terms().to_string(), "(Intercept) + x1");
    assert_eq!(session.history().len(), 2);
}

#[test]
fn test_stepwise_with_noisy_data_recovers_strong_effects() {
    let n = 40;
    let mut rng = StdRng::seed_from_u64(7);
    let standard = Normal::new(0.0, 1.0).unwrap();
    let noise = Normal::new(0.0, 0.001).unwrap();

    let mut variables = Array2::zeros((n, 2));
    let mut y = Array1::zeros(n);
    for i in 0..n {
        let x1 = standard.sample(&mut rng);
        let x2 = standard.sample(&mut rng);
        variables[(i, 0)] = x1;
        variables[(i, 1)] = x2;
        y[i] = 1.0 + 2.0 * x1 + 3.0 * x2 + noise.sample(&mut rng);
    }
    let oracle = LeastSquaresOracle::new(variables, &["x1", "x2"], y).unwrap();

    let bounds = Bounds::new(
        intercept_only(),
        TermSet::from_rows(&[vec![0, 0], vec![1, 0], vec![0, 1]], &["x1", "x2"]).unwrap(),
    )
    .unwrap();
    let session = stepwise(
        intercept_only(),
        bounds,
        StepwiseConfig::default().criterion(Criterion::Sse),
        &oracle,
    )
    .unwrap();

    assert_eq!(session.terms().to_string(), "(Intercept) + x1 + x2");
    assert_eq!(session.history().len(), 3);
    assert!(session.fit_statistics().unwrap().r_squared > 0.999);
}

#[test]
fn test_history_display_lists_actions() {
    let oracle = x1_only_oracle();
    let mut session = Stepwise::new(
        intercept_only(),
        full_bounds(),
        StepwiseConfig::default().criterion(Criterion::Sse),
    )
    .unwrap();
    session.run(&oracle, &mut NullObserver).unwrap();

    let rendered = session.history().to_string();
    assert!(rendered.contains("Start"));
    assert!(rendered.contains("Add"));
    assert!(rendered.contains("x1"));
    assert!(rendered.contains("p ="));
}
