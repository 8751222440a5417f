//! Dual coordinate ascent solver
//!
//! Trains a binary soft-margin kernel machine by repeatedly taking a Newton
//! step on the dual variable with the largest KKT violation, keeping the
//! per-example derivative vector up to date incrementally from the cached
//! kernel row of the updated variable. The bias is itself a dual variable:
//! whenever the coordinate-wise primal problem is at its minimum, the bias
//! receives its own Newton step, scaled by a running estimate of its
//! curvature, and the shift is propagated back into the derivatives.

use crate::cache::KernelCache;
use crate::core::{
    CancelToken, KernelMachineError, Result, SolverConfig, StepObserver, SupportVectorModel,
    TrainStatus, TrainingOutcome,
};
use crate::kernel::KernelAdapter;
use crate::solver::ConvergenceMonitor;
use log::{debug, info, warn};
use std::sync::Arc;

/// Dual coordinate ascent solver working against a kernel row cache
pub struct DualAscentSolver<K: KernelAdapter> {
    kernel: Arc<K>,
    config: SolverConfig,
    observer: Option<Box<dyn StepObserver>>,
    cancel: CancelToken,
}

/// View of the training kernel with both labels folded in:
/// `H(i, j) = y_i * y_j * K(i, j)`. Rows of this view are what the
/// coordinate updates consume, so this is what gets cached.
struct LabelFoldedKernel<'a, K: KernelAdapter> {
    kernel: &'a K,
    labels: &'a [f64],
}

impl<K: KernelAdapter> KernelAdapter for LabelFoldedKernel<'_, K> {
    fn num_lhs(&self) -> usize {
        self.kernel.num_lhs()
    }

    fn num_rhs(&self) -> usize {
        self.kernel.num_rhs()
    }

    fn compute(&self, i: usize, j: usize) -> f64 {
        self.labels[i] * self.labels[j] * self.kernel.compute(i, j)
    }

    fn cache_size_bytes(&self) -> usize {
        self.kernel.cache_size_bytes()
    }
}

impl<K: KernelAdapter> DualAscentSolver<K> {
    /// Create a solver over an initialized training kernel
    pub fn new(kernel: Arc<K>, config: SolverConfig) -> Self {
        Self {
            kernel,
            config,
            observer: None,
            cancel: CancelToken::new(),
        }
    }

    /// Attach an observer notified on the diagnostic cadence
    pub fn with_observer(mut self, observer: Box<dyn StepObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Attach a cooperative cancellation token, polled on the diagnostic cadence
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Train on binary labels, one per left-hand kernel vector.
    ///
    /// Runs until the stopping criteria are met, the iteration cap binds, or
    /// cancellation is requested. The two latter cases still produce a model
    /// from the current iterate, flagged through [`TrainStatus`].
    pub fn train(&mut self, labels: &[f64]) -> Result<TrainingOutcome> {
        let n = labels.len();
        if n == 0 {
            return Err(KernelMachineError::EmptyTrainingSet);
        }
        if self.kernel.num_lhs() != n {
            return Err(KernelMachineError::LabelCountMismatch {
                expected: self.kernel.num_lhs(),
                actual: n,
            });
        }
        for &label in labels {
            if label != 1.0 && label != -1.0 {
                return Err(KernelMachineError::InvalidLabel(label));
            }
        }
        if labels.iter().all(|&l| l == labels[0]) {
            return Err(KernelMachineError::DegenerateTrainingSet(
                "all labels belong to one class; the dual has no non-trivial solution"
                    .to_string(),
            ));
        }

        let c = self.config.c;
        let alpha_eps = self.config.alpha_eps;
        let primal_eps = self.config.epsilon;
        // dual tolerance heuristic: scale the primal tolerance by the set size
        let dual_eps = self.config.epsilon * n as f64;

        let folded = LabelFoldedKernel {
            kernel: self.kernel.as_ref(),
            labels,
        };
        let cache = KernelCache::new(self.kernel.cache_size_bytes(), n)?;

        let mut alpha = vec![0.0; n];
        // residual of the curvature solve, seeded with the labels
        let mut hessres: Vec<f64> = labels.to_vec();
        // derivative of the dual objective per variable, plus the bias share
        let mut dalpha: Vec<f64> = vec![-1.0; n];
        let mut eta = 0.0;
        let mut detas = 0.0;
        let mut hessest = 0.0;

        let mut monitor = ConvergenceMonitor::new(primal_eps, dual_eps, self.config.stop_factor);
        let mut status = TrainStatus::MaxIterationsReached;
        let mut niter: u64 = 0;

        while niter < self.config.max_iterations {
            niter += 1;

            // pick the variable with the largest violation, skipping
            // variables already satisfied at a bound
            let mut maxpidx: Option<usize> = None;
            let mut maxpviol = 0.0;
            let mut free_alpha = false;
            for i in 0..n {
                if alpha[i] > 0.0 && alpha[i] < c {
                    free_alpha = true;
                }
                let satisfied = dalpha[i] == 0.0
                    || (alpha[i] == 0.0 && dalpha[i] > 0.0)
                    || (alpha[i] == c && dalpha[i] < 0.0);
                if satisfied {
                    continue;
                }
                let v = dalpha[i].abs();
                if v > maxpviol {
                    maxpviol = v;
                    maxpidx = Some(i);
                } else if v == maxpviol {
                    if let Some(best) = maxpidx {
                        // ties: an already-cached row is cheaper to act on;
                        // failing that, keep the running label sum small
                        let i_cached = cache.is_cached(i);
                        let best_cached = cache.is_cached(best);
                        if (i_cached && !best_cached)
                            || (i_cached == best_cached
                                && detas != 0.0
                                && labels[i] * detas < 0.0
                                && labels[best] * detas >= 0.0)
                        {
                            maxpidx = Some(i);
                        }
                    }
                }
            }
            let maxdviol = detas.abs();

            monitor.update(maxpviol, maxdviol, free_alpha);
            if monitor.should_stop() {
                info!(
                    "converged after {} iterations (primal {:.3e}, dual {:.3e}, free={})",
                    niter, maxpviol, maxdviol, free_alpha
                );
                status = TrainStatus::Converged;
                break;
            }

            let mut stepped = false;
            if let Some(maxpidx) = maxpidx {
                // Newton step against the locked kernel row; the diagonal is
                // read from the row, never assumed
                let row = cache.lock_row(maxpidx, &folded)?;
                let k_ii = row[maxpidx];
                let hstep = -hessres[maxpidx] / k_ii;

                let alpha_old = alpha[maxpidx];
                let mut alpha_new = alpha_old - dalpha[maxpidx] / k_ii;
                if alpha_new < alpha_eps {
                    alpha_new = 0.0;
                }
                if alpha_new > c - alpha_eps {
                    alpha_new = c;
                }
                let alpha_change = alpha_new - alpha_old;

                if hstep != 0.0 || alpha_change != 0.0 {
                    for j in 0..n {
                        hessres[j] += row[j] * hstep;
                        dalpha[j] += row[j] * alpha_change;
                    }
                }
                alpha[maxpidx] = alpha_new;
                drop(row);

                hessest -= labels[maxpidx] * hstep;
                detas += labels[maxpidx] * alpha_change;
                stepped = true;
            }

            if monitor.primal_cool() && detas != 0.0 && hessest > 0.0 {
                // bias Newton step, propagated into every derivative
                let eta_change = detas / hessest;
                eta += eta_change;
                for j in 0..n {
                    dalpha[j] += labels[j] * eta_change;
                }
            } else if !stepped {
                return Err(KernelMachineError::OptimizationStalled(format!(
                    "no KKT violation after {niter} iterations but stopping criteria unmet"
                )));
            }

            if self.config.diagnostic_interval > 0 && niter % self.config.diagnostic_interval == 0
            {
                if log::log_enabled!(log::Level::Debug) {
                    debug!(
                        "iter {}: objective {:.6}, primal violation {:.3e}, dual violation {:.3e}",
                        niter,
                        self.dual_objective(&alpha, labels),
                        maxpviol,
                        maxdviol
                    );
                }
                if let Some(observer) = self.observer.as_mut() {
                    observer.on_step(niter, &alpha, eta);
                }
                if self.cancel.is_cancelled() {
                    info!("training cancelled after {} iterations", niter);
                    status = TrainStatus::Cancelled;
                    break;
                }
            }
        }

        if status == TrainStatus::MaxIterationsReached {
            warn!(
                "no convergence within {} iterations; finalizing the current iterate",
                niter
            );
        }

        // fold labels into the coefficients so scoring needs no labels
        let num_sv = alpha.iter().filter(|&&a| a > 0.0).count();
        let mut model = SupportVectorModel::new();
        model.create(num_sv);
        let mut slot = 0;
        for (i, &a) in alpha.iter().enumerate() {
            if a > 0.0 {
                model.set(slot, i, a * labels[i])?;
                slot += 1;
            }
        }
        model.set_bias(eta);

        info!(
            "model has {} support vectors out of {} examples, bias {:.6}",
            num_sv, n, eta
        );

        Ok(TrainingOutcome {
            model,
            status,
            iterations: niter,
        })
    }

    /// Full dual objective, for diagnostics only
    fn dual_objective(&self, alpha: &[f64], labels: &[f64]) -> f64 {
        let n = alpha.len();
        let mut objective: f64 = alpha.iter().sum();
        for i in 0..n {
            if alpha[i] == 0.0 {
                continue;
            }
            for j in 0..n {
                if alpha[j] == 0.0 {
                    continue;
                }
                objective -=
                    0.5 * alpha[i] * alpha[j] * labels[i] * labels[j] * self.kernel.compute(i, j);
            }
        }
        objective
    }

    /// The solver configuration
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{FeatureKernel, LinearKernel, PrecomputedKernel};
    use crate::core::SparseVector;
    use approx::assert_relative_eq;

    fn linear_kernel(points: &[(f64, f64)]) -> FeatureKernel<LinearKernel> {
        let features: Arc<Vec<SparseVector>> = Arc::new(
            points
                .iter()
                .map(|&(x, y)| SparseVector::new(vec![0, 1], vec![x, y]))
                .collect(),
        );
        let mut kernel = FeatureKernel::new(LinearKernel::new(), 1 << 20);
        kernel.init(Arc::clone(&features), features).unwrap();
        kernel
    }

    #[test]
    fn test_empty_training_set() {
        let kernel = PrecomputedKernel::new(vec![], 1 << 20).unwrap();
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        assert!(matches!(
            solver.train(&[]),
            Err(KernelMachineError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_label_count_mismatch() {
        let kernel = linear_kernel(&[(1.0, 1.0), (-1.0, -1.0)]);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        assert!(matches!(
            solver.train(&[1.0, -1.0, 1.0]),
            Err(KernelMachineError::LabelCountMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_non_binary_label() {
        let kernel = linear_kernel(&[(1.0, 1.0), (-1.0, -1.0)]);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        assert!(matches!(
            solver.train(&[1.0, 0.5]),
            Err(KernelMachineError::InvalidLabel(l)) if l == 0.5
        ));
    }

    #[test]
    fn test_single_class_labels_are_degenerate() {
        let kernel = linear_kernel(&[(1.0, 1.0), (1.0, -1.0)]);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        assert!(matches!(
            solver.train(&[1.0, 1.0]),
            Err(KernelMachineError::DegenerateTrainingSet(_))
        ));
    }

    #[test]
    fn test_two_point_problem() {
        let kernel = linear_kernel(&[(1.0, 0.0), (-1.0, 0.0)]);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        let outcome = solver.train(&[1.0, -1.0]).unwrap();

        assert!(outcome.status.converged());
        assert_eq!(outcome.model.num_support_vectors(), 1);
        // alpha hits the box bound C = 1, label folded in
        assert_relative_eq!(outcome.model.alphas()[0], 1.0);
        assert_eq!(outcome.model.bias(), 0.0);
    }

    #[test]
    fn test_symmetric_four_points() {
        let kernel = linear_kernel(&[(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
        let outcome = solver.train(&[1.0, 1.0, -1.0, -1.0]).unwrap();

        assert!(outcome.status.converged());
        assert!(outcome.iterations < 100);
        assert_eq!(outcome.model.num_support_vectors(), 2);
        assert!(outcome.model.bias().abs() < 1e-6);

        // one support vector per class, equal weight
        assert_eq!(outcome.model.support_vector_indices(), &[0, 2]);
        assert_relative_eq!(outcome.model.alphas()[0], 0.5);
        assert_relative_eq!(outcome.model.alphas()[1], -0.5);
    }

    #[test]
    fn test_box_constraint_holds_when_iteration_capped() {
        // alternating labels around a circle: not linearly separable
        let points: Vec<(f64, f64)> = (0..30)
            .map(|i| ((i as f64 * 0.63).cos(), (i as f64 * 0.63).sin()))
            .collect();
        let labels: Vec<f64> = (0..30)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();

        let kernel = linear_kernel(&points);
        let config = SolverConfig::default().with_c(0.5).with_max_iterations(20);
        let mut solver = DualAscentSolver::new(Arc::new(kernel), config);
        let outcome = solver.train(&labels).unwrap();

        assert_eq!(outcome.status, TrainStatus::MaxIterationsReached);
        assert_eq!(outcome.iterations, 20);
        assert!(outcome.model.num_support_vectors() >= 1);
        for &a in outcome.model.alphas() {
            // label folding preserves magnitude
            assert!(a.abs() <= 0.5 + 1e-12);
            assert!(a.abs() > 0.0);
        }
    }

    #[test]
    fn test_cancellation_through_token() {
        let points: Vec<(f64, f64)> = (0..20)
            .map(|i| ((i as f64 * 0.7).sin(), (i as f64 * 1.3).cos()))
            .collect();
        let labels: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();

        let token = CancelToken::new();
        token.cancel();

        let kernel = linear_kernel(&points);
        let mut config = SolverConfig::default();
        config.diagnostic_interval = 1;
        let mut solver =
            DualAscentSolver::new(Arc::new(kernel), config).with_cancel_token(token);
        let outcome = solver.train(&labels).unwrap();

        assert_eq!(outcome.status, TrainStatus::Cancelled);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_observer_sees_iterations() {
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::sync::Arc as StdArc;

        struct Counter(StdArc<AtomicU64>);
        impl StepObserver for Counter {
            fn on_step(&mut self, _iteration: u64, _alphas: &[f64], _bias: f64) {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }

        let calls = StdArc::new(AtomicU64::new(0));
        let kernel = linear_kernel(&[(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]);
        let mut config = SolverConfig::default();
        config.diagnostic_interval = 1;
        let mut solver = DualAscentSolver::new(Arc::new(kernel), config)
            .with_observer(Box::new(Counter(StdArc::clone(&calls))));
        let outcome = solver.train(&[1.0, 1.0, -1.0, -1.0]).unwrap();

        // one notification per completed iteration except the stopping one
        assert_eq!(calls.load(Ordering::Relaxed), outcome.iterations - 1);
    }

    #[test]
    fn test_deterministic_iteration_sequence() {
        let points = [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)];
        let labels = [1.0, 1.0, -1.0, -1.0];

        let run = || {
            let kernel = linear_kernel(&points);
            let mut solver = DualAscentSolver::new(Arc::new(kernel), SolverConfig::default());
            solver.train(&labels).unwrap()
        };
        let a = run();
        let b = run();

        assert_eq!(a.iterations, b.iterations);
        assert_eq!(a.model, b.model);
    }
}
