use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spmix::{csr_from_triplets, fit_with_observer, EmConfig, IterationReport, MixtureParams};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Synthetic bag-of-words: three "topics", each drawing word counts from
    // its own slice of a 300-word vocabulary plus a few shared stop words.
    //
    // Run with `RUST_LOG=spmix=info` to see the per-iteration log-likelihood.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let n_topics = 3;
    let docs_per_topic = 60;
    let vocab = 300;
    let slice = (vocab - 10) / n_topics;

    let mut rng = StdRng::seed_from_u64(2024);
    let mut triplets = Vec::new();
    for doc in 0..n_topics * docs_per_topic {
        let topic = doc / docs_per_topic;
        for _ in 0..25 {
            let word = if rng.random::<f64>() < 0.2 {
                rng.random_range(0..10)
            } else {
                10 + topic * slice + rng.random_range(0..slice)
            };
            triplets.push((doc, word, 1.0));
        }
    }
    // Duplicate (doc, word) triplets sum into counts.
    let x = csr_from_triplets((n_topics * docs_per_topic, vocab), &triplets)?;
    println!(
        "docs={} vocab={} stored={} ({:.1}% dense)",
        x.rows(),
        x.cols(),
        x.nnz(),
        100.0 * x.nnz() as f64 / (x.rows() * x.cols()) as f64
    );

    // Stand-in for an external initializer: one document per topic as a mean.
    let seed_docs = [0, docs_per_topic, 2 * docs_per_topic];
    let means = seed_docs
        .iter()
        .map(|&i| {
            let mut m = Array1::zeros(vocab);
            if let Some(row) = x.outer_view(i) {
                for (j, &v) in row.iter() {
                    m[j] = v;
                }
            }
            m
        })
        .collect();
    let init = MixtureParams::new(
        vec![1.0 / n_topics as f64; n_topics],
        means,
        vec![Array1::ones(vocab); n_topics],
    )?;

    let config = EmConfig::new()
        .with_cov_smoothing(1e-5)
        .with_max_iterations(200)
        .with_convergence_threshold(1e-4)
        .with_verbose(true);

    let mut last = f64::NEG_INFINITY;
    let result = fit_with_observer(&x, &init, config, &mut |r: &IterationReport| {
        last = r.log_likelihood;
    })?;

    println!(
        "status={:?} iterations={} final_ll={:.3}",
        result.status,
        result.iterations(),
        last
    );
    println!("weights={:.3}", result.params.weights());

    let labels = result.assignments();
    for topic in 0..n_topics {
        let docs = &labels[topic * docs_per_topic..(topic + 1) * docs_per_topic];
        let mut counts = vec![0usize; n_topics];
        for &l in docs {
            counts[l] += 1;
        }
        println!("  topic {topic}: cluster counts {counts:?}");
    }

    Ok(())
}
