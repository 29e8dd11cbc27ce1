use ndarray::{array, Array1};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use spmix::em::NoopObserver;
use spmix::{
    csr_from_dense_rows, csr_from_triplets, fit, fit_with_observer, CsMat, EmConfig, EmEngine,
    FitStatus, IterationReport, MixtureParams,
};

/// Two topics over disjoint halves of the vocabulary: rows from topic A only
/// use features `0..d/2`, rows from topic B only `d/2..d`.
fn two_topics(n_per: usize, d: usize, seed: u64) -> (CsMat<f64>, Array1<f64>, Array1<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(3.0, 0.5).unwrap();
    let half = d / 2;

    let mut triplets = Vec::new();
    for i in 0..2 * n_per {
        let cols = if i < n_per { 0..half } else { half..d };
        for j in cols {
            // Roughly a third of a topic's words are absent from any given row.
            if rng.random::<f64>() < 0.66 {
                triplets.push((i, j, noise.sample(&mut rng)));
            }
        }
    }
    let x = csr_from_triplets((2 * n_per, d), &triplets).unwrap();

    let center_a: Array1<f64> = (0..d).map(|j| if j < half { 0.66 * 3.0 } else { 0.0 }).collect();
    let center_b: Array1<f64> = (0..d).map(|j| if j >= half { 0.66 * 3.0 } else { 0.0 }).collect();
    (x, center_a, center_b)
}

fn dist2(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    (a - b).mapv(|v| v * v).sum()
}

fn assert_non_decreasing(trace: &[f64]) {
    for w in trace.windows(2) {
        let tol = 1e-6 * (1.0 + w[0].abs());
        assert!(w[1] >= w[0] - tol, "log-likelihood decreased: {} -> {}", w[0], w[1]);
    }
}

#[test]
fn well_separated_topics_converge_to_their_centers() {
    let d = 30;
    let (x, center_a, center_b) = two_topics(40, d, 7);

    // Start each cluster from a single row of its topic.
    let dense_row = |i: usize| -> Array1<f64> {
        let mut v = Array1::zeros(d);
        for (j, &val) in x.outer_view(i).unwrap().iter() {
            v[j] = val;
        }
        v
    };
    let init = MixtureParams::new(
        vec![0.5, 0.5],
        vec![dense_row(0), dense_row(40)],
        vec![Array1::ones(d), Array1::ones(d)],
    )
    .unwrap();

    let config = EmConfig::new()
        .with_max_iterations(1000)
        .with_convergence_threshold(1e-4);
    let result = fit(&x, &init, config).unwrap();

    assert_eq!(result.status, FitStatus::Converged);
    assert!(result.iterations() < 1000);
    assert_non_decreasing(&result.log_likelihood_trace);

    let m0 = &result.params.clusters()[0].mean;
    let m1 = &result.params.clusters()[1].mean;
    assert!(dist2(m0, &center_a) < dist2(m0, &center_b));
    assert!(dist2(m1, &center_b) < dist2(m1, &center_a));

    let labels = result.assignments();
    assert!(labels[..40].iter().all(|&l| l == 0));
    assert!(labels[40..].iter().all(|&l| l == 1));

    // Absent vocabulary collapses to the smoothing floor, never below it.
    for c in result.params.clusters() {
        assert!(c.cov.iter().all(|&v| v >= 1e-5));
    }
    assert!(result.degenerate_events.is_empty());
}

#[test]
fn four_point_scenario_after_one_iteration() {
    let x = csr_from_dense_rows(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![5.0, 5.0],
        vec![5.0, 6.0],
    ])
    .unwrap();
    let init = MixtureParams::new(
        vec![0.5, 0.5],
        vec![array![0.0, 0.0], array![5.0, 5.0]],
        vec![array![1.0, 1.0], array![1.0, 1.0]],
    )
    .unwrap();

    let result = fit(&x, &init, EmConfig::new().with_max_iterations(1)).unwrap();
    assert_eq!(result.status, FitStatus::MaxedOut);

    // Hand computation: the closest cross pair is (0,1) vs mean (5,5),
    // a log-density gap of exactly 20, so the leak is 1 / (1 + e^20).
    let leak = 1.0 / (1.0 + 20f64.exp());
    let r = &result.responsibilities;
    assert!((r[[1, 1]] - leak).abs() < 1e-12);
    assert!((r[[1, 0]] - (1.0 - leak)).abs() < 1e-12);
    assert!(r[[0, 0]] > 1.0 - 1e-9);
    assert!(r[[2, 1]] > 1.0 - 1e-9);
    assert!(r[[3, 1]] > 1.0 - 1e-9);

    let m0 = &result.params.clusters()[0].mean;
    let m1 = &result.params.clusters()[1].mean;
    assert!(dist2(m0, &array![0.0, 0.5]) < 1e-12);
    assert!(dist2(m1, &array![5.0, 5.5]) < 1e-12);
}

#[test]
fn csr_and_csc_give_the_same_fit() {
    let (x, _, _) = two_topics(10, 8, 3);
    let init = MixtureParams::new(
        vec![0.3, 0.7],
        vec![Array1::from_elem(8, 1.0), Array1::from_elem(8, 2.0)],
        vec![Array1::ones(8), Array1::ones(8)],
    )
    .unwrap();
    let config = EmConfig::new().with_max_iterations(5);

    let a = fit(&x, &init, config.clone()).unwrap();
    let b = fit(&x.to_csc(), &init, config).unwrap();

    assert_eq!(a.iterations(), b.iterations());
    for (u, v) in a.log_likelihood_trace.iter().zip(&b.log_likelihood_trace) {
        assert!((u - v).abs() < 1e-9 * (1.0 + u.abs()));
    }
    for (ca, cb) in a.params.clusters().iter().zip(b.params.clusters()) {
        assert!(dist2(&ca.mean, &cb.mean) < 1e-18);
        assert!(dist2(&ca.cov, &cb.cov) < 1e-18);
    }
}

#[test]
fn verbose_does_not_change_results() {
    let (x, _, _) = two_topics(10, 6, 11);
    let init = MixtureParams::new(
        vec![0.5, 0.5],
        vec![Array1::from_elem(6, 0.5), Array1::from_elem(6, 1.5)],
        vec![Array1::ones(6), Array1::ones(6)],
    )
    .unwrap();

    let quiet = fit(&x, &init, EmConfig::new().with_verbose(false)).unwrap();
    let mut reports: Vec<IterationReport> = Vec::new();
    let loud = fit_with_observer(
        &x,
        &init,
        EmConfig::new().with_verbose(true),
        &mut |r: &IterationReport| reports.push(*r),
    )
    .unwrap();

    assert_eq!(quiet.log_likelihood_trace, loud.log_likelihood_trace);
    assert_eq!(quiet.params, loud.params);
    assert_eq!(reports.len(), loud.iterations());
}

#[test]
fn point_impossible_under_every_cluster_scores_neg_inf() {
    // (1e200)² overflows once scaled by the tiny variance.
    let x = csr_from_dense_rows(&[vec![1e200], vec![0.0]]).unwrap();
    let params = MixtureParams::new(
        vec![0.4, 0.6],
        vec![array![0.0], array![1.0]],
        vec![array![1e-200], array![1e-200]],
    )
    .unwrap();

    let scores = params.score_samples(&x).unwrap();
    assert_eq!(scores[0], f64::NEG_INFINITY);
    assert!(scores[1].is_finite());
    assert_eq!(params.log_likelihood(&x).unwrap(), f64::NEG_INFINITY);

    let resp = params.predict_proba(&x).unwrap();
    assert!(resp.iter().all(|v| !v.is_nan()));
    // Uninformative row falls back to the mixing weights.
    assert_eq!(resp.row(0).to_vec(), vec![0.4, 0.6]);
    for row in resp.rows() {
        assert!((row.sum() - 1.0).abs() < 1e-12);
    }
}

fn arb_problem() -> impl Strategy<Value = (Vec<Vec<f64>>, usize)> {
    (4usize..20, 1usize..5, 1usize..4).prop_flat_map(|(n, d, k)| {
        let cell = prop_oneof![Just(0.0), -5.0f64..5.0];
        (
            proptest::collection::vec(proptest::collection::vec(cell, d), n),
            Just(k.min(n)),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_iteration((rows, k) in arb_problem(), iters in 1usize..15) {
        let d = rows[0].len();
        let x = csr_from_dense_rows(&rows).unwrap();

        // Seed means from the first k rows, unit variances, uniform weights.
        let init = MixtureParams::new(
            vec![1.0 / k as f64; k],
            rows.iter().take(k).map(|r| Array1::from(r.clone())).collect(),
            vec![Array1::ones(d); k],
        ).unwrap();

        let smoothing = 1e-3;
        let config = EmConfig::new()
            .with_max_iterations(iters)
            .with_cov_smoothing(smoothing);
        let mut engine = EmEngine::new(&x, &init, config).unwrap();
        loop {
            let status = engine.step(&mut NoopObserver).unwrap();
            let w_sum: f64 = engine.params().weights().sum();
            prop_assert!(
                (w_sum - 1.0).abs() < 1e-9,
                "weights sum to {} after iteration {}",
                w_sum,
                engine.trace().len()
            );
            for c in engine.params().clusters() {
                prop_assert!(c.cov.iter().all(|&v| v >= smoothing));
            }
            if status.is_terminal() {
                break;
            }
        }
        let result = engine.into_result();

        prop_assert!(result.iterations() >= 1);
        prop_assert!(result.iterations() <= iters);
        prop_assert!(result.status.is_terminal());

        let w_sum: f64 = result.params.weights().sum();
        prop_assert!((w_sum - 1.0).abs() < 1e-9, "weights sum to {}", w_sum);

        for row in result.responsibilities.rows() {
            prop_assert!((row.sum() - 1.0).abs() < 1e-9);
            prop_assert!(row.iter().all(|&v| (0.0..=1.0 + 1e-12).contains(&v)));
        }
        for c in result.params.clusters() {
            prop_assert!(c.cov.iter().all(|&v| v >= smoothing && v.is_finite()));
            prop_assert!(c.mean.iter().all(|v| v.is_finite()));
        }
        prop_assert!(result.log_likelihood_trace.iter().all(|v| !v.is_nan()));
    }
}
