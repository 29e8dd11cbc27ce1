//! The EM loop.

use super::config::{DegeneratePolicy, EmConfig};
use super::observer::{IterationReport, NoopObserver, ProgressObserver};
use super::params::{ClusterParams, MixtureParams};
use super::result::{DegenerateEvent, FitResult, FitStatus};
use crate::density::log_density_with_squares;
use crate::error::{Error, Result};
use crate::sparse::SparseMatrix;
use crate::stable::log_sum_exp_rows;
use ndarray::{Array1, Array2, Axis, Zip};
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Effective counts at or below this are treated as an empty cluster.
/// Dividing a weighted sum by anything smaller only amplifies round-off.
pub const DEGENERATE_COUNT: f64 = 1e-10;

/// Output of one E-step.
#[derive(Debug, Clone)]
pub(crate) struct Expectation {
    /// n × K, rows sum to 1.
    pub(crate) resp: Array2<f64>,
    /// `Σ_i log Σ_k w_k N(x_i | k)`.
    pub(crate) log_likelihood: f64,
}

/// Run `f` once per cluster, on rayon when the `parallel` feature is on.
/// Each call owns exactly one cluster index.
fn per_cluster<T, F>(clusters: &[ClusterParams], f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize, &ClusterParams) -> Result<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        clusters
            .par_iter()
            .enumerate()
            .map(|(k, c)| f(k, c))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        clusters
            .iter()
            .enumerate()
            .map(|(k, c)| f(k, c))
            .collect()
    }
}

/// `logresp[i, k] = ln w_k + log N(x_i | μ_k, Σ_k)`.
/// `x_sq` is `x ∘ x`, shared by every cluster.
pub(crate) fn log_joint<M: SparseMatrix + Sync>(x: &M, x_sq: &M, params: &MixtureParams) -> Result<Array2<f64>> {
    let columns = per_cluster(params.clusters(), |_, c| {
        let mut col = log_density_with_squares(x, x_sq, c.mean.view(), c.cov.view())?;
        let log_w = c.weight.ln();
        col.mapv_inplace(|v| v + log_w);
        Ok(col)
    })?;

    let mut logresp = Array2::zeros((x.n_rows(), params.n_clusters()));
    for (mut dst, col) in logresp.columns_mut().into_iter().zip(&columns) {
        dst.assign(col);
    }
    Ok(logresp)
}

/// E-step: responsibilities and total log-likelihood.
///
/// A row that is `-inf` under every cluster contributes `-inf` to the
/// log-likelihood and gets the mixing weights as its responsibilities.
pub(crate) fn expectation<M: SparseMatrix + Sync>(
    x: &M,
    x_sq: &M,
    params: &MixtureParams,
) -> Result<Expectation> {
    let mut resp = log_joint(x, x_sq, params)?;
    let norm = log_sum_exp_rows(resp.view());
    let log_likelihood = norm.sum();
    let weights = params.weights();

    for (mut row, &z) in resp.axis_iter_mut(Axis(0)).zip(norm.iter()) {
        if z == f64::NEG_INFINITY {
            row.assign(&weights);
        } else {
            row.mapv_inplace(|v| (v - z).exp());
        }
    }

    Ok(Expectation {
        resp,
        log_likelihood,
    })
}

/// Expectation-Maximization over a sparse observation matrix.
///
/// The engine borrows the data, clones the initial parameters, and only ever
/// mutates its own copy. Drive it with [`step`](Self::step) for one iteration
/// at a time, or [`run`](Self::run) to the end.
#[derive(Debug)]
pub struct EmEngine<'a, M> {
    data: &'a M,
    /// `x ∘ x`, computed once per fit.
    data_sq: M,
    params: MixtureParams,
    config: EmConfig,
    status: FitStatus,
    trace: Vec<f64>,
    resp: Array2<f64>,
    events: Vec<DegenerateEvent>,
}

impl<'a, M: SparseMatrix + Sync> EmEngine<'a, M> {
    /// Validate inputs and set up a run in the `Running` state.
    pub fn new(data: &'a M, init: &MixtureParams, config: EmConfig) -> Result<Self> {
        config.validate()?;
        init.validate()?;
        if data.n_rows() == 0 || data.n_cols() == 0 {
            return Err(Error::EmptyInput);
        }
        if init.n_features() != data.n_cols() {
            return Err(Error::DimensionMismatch {
                expected: data.n_cols(),
                found: init.n_features(),
            });
        }

        debug!(
            n_rows = data.n_rows(),
            n_cols = data.n_cols(),
            n_stored = data.n_stored(),
            n_clusters = init.n_clusters(),
            "starting EM"
        );

        Ok(Self {
            data,
            data_sq: data.square(),
            params: init.clone(),
            resp: Array2::zeros((data.n_rows(), init.n_clusters())),
            config,
            status: FitStatus::Running,
            trace: Vec::new(),
            events: Vec::new(),
        })
    }

    /// Current state.
    pub fn status(&self) -> FitStatus {
        self.status
    }

    /// Current working parameters.
    pub fn params(&self) -> &MixtureParams {
        &self.params
    }

    /// Log-likelihoods so far.
    pub fn trace(&self) -> &[f64] {
        &self.trace
    }

    /// Run one E-step, M-step and convergence check. A no-op once terminal.
    pub fn step<O: ProgressObserver + ?Sized>(&mut self, observer: &mut O) -> Result<FitStatus> {
        if self.status.is_terminal() {
            return Ok(self.status);
        }
        let iteration = self.trace.len();

        let Expectation {
            resp,
            log_likelihood,
        } = expectation(self.data, &self.data_sq, &self.params)?;
        self.maximization(&resp, iteration)?;
        self.resp = resp;

        let delta = self.trace.last().map(|prev| log_likelihood - prev);
        self.trace.push(log_likelihood);

        if self.config.verbose {
            info!(iteration, log_likelihood, "EM iteration");
        } else {
            debug!(iteration, log_likelihood, "EM iteration");
        }
        observer.on_iteration(&IterationReport {
            iteration,
            log_likelihood,
            delta,
        });

        self.status = match delta {
            Some(d) if d < self.config.convergence_threshold && log_likelihood.is_finite() => {
                FitStatus::Converged
            }
            _ if self.trace.len() >= self.config.max_iterations => FitStatus::MaxedOut,
            _ => FitStatus::Running,
        };
        if self.status.is_terminal() {
            debug!(status = ?self.status, iterations = self.trace.len(), "EM finished");
        }
        Ok(self.status)
    }

    /// Iterate until `Converged` or `MaxedOut`.
    pub fn run(self) -> Result<FitResult> {
        self.run_with_observer(&mut NoopObserver)
    }

    /// Iterate until terminal, reporting every iteration to `observer`.
    pub fn run_with_observer<O: ProgressObserver + ?Sized>(mut self, observer: &mut O) -> Result<FitResult> {
        while !self.step(observer)?.is_terminal() {}
        Ok(self.into_result())
    }

    /// Snapshot the current state.
    pub fn into_result(self) -> FitResult {
        FitResult {
            params: self.params,
            responsibilities: self.resp,
            log_likelihood_trace: self.trace,
            status: self.status,
            degenerate_events: self.events,
        }
    }

    /// M-step: re-estimate every cluster from `resp`.
    ///
    /// ```text
    /// N_k  = Σ_i r_ik
    /// w_k  = N_k / n
    /// μ_k  = Σ_i r_ik x_i / N_k                         = colsum(D(r_k) X) / N_k
    /// σ²_k = (Σ_i r_ik (x_i² - 2 x_i μ_k) + μ_k² N_k) / N_k + smoothing
    ///      = (colsum(D(r_k) X∘X) - 2 μ_k colsum(D(r_k) X) + μ_k² N_k) / N_k + smoothing
    /// ```
    fn maximization(&mut self, resp: &Array2<f64>, iteration: usize) -> Result<()> {
        let n = self.data.n_rows() as f64;
        let counts = resp.sum_axis(Axis(0));
        let degenerate: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|&(_, &c)| !(c > DEGENERATE_COUNT))
            .map(|(k, _)| k)
            .collect();

        if let (DegeneratePolicy::Reject, Some(&cluster)) =
            (self.config.degenerate_policy, degenerate.first())
        {
            return Err(Error::DegenerateCluster { cluster, iteration });
        }

        let data = self.data;
        let data_sq = &self.data_sq;
        let smoothing = self.config.cov_smoothing;
        let counts_ref = &counts;
        let updates = per_cluster(self.params.clusters(), |k, _| {
            let count = counts_ref[k];
            if !(count > DEGENERATE_COUNT) {
                return Ok(None);
            }
            let r = resp.column(k);
            let sum_x = data.scale_rows(r)?.col_sums();
            let sum_x_sq = data_sq.scale_rows(r)?.col_sums();

            let mean = &sum_x / count;
            let mut cov: Array1<f64> = Array1::zeros(mean.len());
            Zip::from(&mut cov)
                .and(&sum_x_sq)
                .and(&sum_x)
                .and(&mean)
                .for_each(|v, &sq, &s, &mu| {
                    let second = sq - 2.0 * mu * s + mu * mu * count;
                    *v = (second / count).max(0.0) + smoothing;
                });
            Ok(Some((mean, cov)))
        })?;

        for (k, (cluster, update)) in self
            .params
            .clusters_mut()
            .iter_mut()
            .zip(updates)
            .enumerate()
        {
            cluster.weight = counts[k] / n;
            match update {
                Some((mean, cov)) => {
                    cluster.mean = mean;
                    cluster.cov = cov;
                }
                // Frozen: the caller's initial covariance may sit below the floor.
                None => cluster.cov.mapv_inplace(|v| v.max(smoothing)),
            }
        }

        for k in degenerate {
            warn!(iteration, cluster = k, count = counts[k], "freezing degenerate cluster");
            self.events.push(DegenerateEvent {
                iteration,
                cluster: k,
                count: counts[k],
            });
        }
        Ok(())
    }
}

/// Fit a diagonal Gaussian mixture to `data` starting from `init`.
///
/// `init` is cloned; the caller's copy is left untouched.
pub fn fit<M: SparseMatrix + Sync>(data: &M, init: &MixtureParams, config: EmConfig) -> Result<FitResult> {
    EmEngine::new(data, init, config)?.run()
}

/// [`fit`], reporting each iteration to `observer`.
pub fn fit_with_observer<M, O>(
    data: &M,
    init: &MixtureParams,
    config: EmConfig,
    observer: &mut O,
) -> Result<FitResult>
where
    M: SparseMatrix + Sync,
    O: ProgressObserver + ?Sized,
{
    EmEngine::new(data, init, config)?.run_with_observer(observer)
}
