use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use batchline_core::AppResult;
use batchline_domain::{GovernorOutcome, LoopBudget, StepResult};
use tracing::debug;

use crate::batch_ports::Clock;

/// One unit of work driven by [`LoopGovernor::run`].
#[async_trait]
pub trait LoopStep: Send {
    /// Performs one iteration and reports whether more work may remain.
    async fn step(&mut self) -> AppResult<StepResult>;
}

/// Runs a step repeatedly inside a wall-clock deadline and an iteration cap.
///
/// Bounds are checked before every iteration, so a step already in flight is
/// never interrupted; the deadline is cooperative.
#[derive(Clone)]
pub struct LoopGovernor {
    clock: Arc<dyn Clock>,
    pause_between_iterations: Duration,
}

impl LoopGovernor {
    /// Creates a governor that yields to the runtime between iterations.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            pause_between_iterations: Duration::ZERO,
        }
    }

    /// Sleeps for `pause` between iterations, clamped to the time left.
    #[must_use]
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause_between_iterations = pause;
        self
    }

    /// Returns the configured pause between iterations.
    #[must_use]
    pub fn pause_between_iterations(&self) -> Duration {
        self.pause_between_iterations
    }

    /// Drives `step` until the backlog drains or the budget runs out.
    ///
    /// Step errors abort the loop and are returned unchanged.
    pub async fn run(
        &self,
        budget: &mut LoopBudget,
        step: &mut dyn LoopStep,
    ) -> AppResult<GovernorOutcome> {
        loop {
            if budget.iterations_exhausted() {
                debug!(
                    iterations = budget.iterations_done(),
                    "iteration cap reached with work remaining"
                );
                return Ok(GovernorOutcome::Completed);
            }

            if budget.is_expired_at(self.clock.now()) {
                debug!(
                    iterations = budget.iterations_done(),
                    deadline = %budget.deadline(),
                    "loop deadline reached"
                );
                return Ok(GovernorOutcome::TimedOut);
            }

            budget.record_iteration();
            if step.step().await? == StepResult::Exhausted {
                return Ok(GovernorOutcome::Exhausted);
            }

            self.pause(budget).await;
        }
    }

    async fn pause(&self, budget: &LoopBudget) {
        let pause = self
            .pause_between_iterations
            .min(budget.remaining_at(self.clock.now()));

        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(pause).await;
        }
    }
}
