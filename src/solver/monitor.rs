//! Convergence bookkeeping for the dual ascent solver

/// Two-part stopping rule for the training loop.
///
/// Tracks the largest primal and dual violations seen in the current
/// iteration and whether any dual variable sits strictly inside its box.
/// The solver may terminate only when the primal side is below tolerance
/// and the dual side is either below tolerance or has no free variable
/// left to act on.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    primal_eps: f64,
    dual_eps: f64,
    stop_factor: f64,
    max_primal_violation: f64,
    max_dual_violation: f64,
    has_free_variable: bool,
}

impl ConvergenceMonitor {
    /// Create a monitor with the given tolerances.
    ///
    /// `stop_factor` scales both tolerances; 1.0 for the plain C-SVM
    /// variant, other formulations derive it from their dual normalization.
    pub fn new(primal_eps: f64, dual_eps: f64, stop_factor: f64) -> Self {
        Self {
            primal_eps,
            dual_eps,
            stop_factor,
            max_primal_violation: f64::INFINITY,
            max_dual_violation: f64::INFINITY,
            has_free_variable: false,
        }
    }

    /// Record this iteration's violation extrema
    pub fn update(
        &mut self,
        primal_violation: f64,
        dual_violation: f64,
        has_free_variable: bool,
    ) {
        self.max_primal_violation = primal_violation;
        self.max_dual_violation = dual_violation;
        self.has_free_variable = has_free_variable;
    }

    /// Whether the primal side is within tolerance
    pub fn primal_cool(&self) -> bool {
        self.max_primal_violation < self.primal_eps * self.stop_factor
    }

    /// Whether the dual side is within tolerance or out of free variables
    pub fn dual_cool(&self) -> bool {
        self.max_dual_violation < self.dual_eps * self.stop_factor || !self.has_free_variable
    }

    /// Whether the solver may stop
    pub fn should_stop(&self) -> bool {
        self.primal_cool() && self.dual_cool()
    }

    /// Largest primal violation recorded by the last update
    pub fn max_primal_violation(&self) -> f64 {
        self.max_primal_violation
    }

    /// Largest dual violation recorded by the last update
    pub fn max_dual_violation(&self) -> f64 {
        self.max_dual_violation
    }

    /// Whether the last update saw a variable strictly inside its box
    pub fn has_free_variable(&self) -> bool {
        self.has_free_variable
    }
}
