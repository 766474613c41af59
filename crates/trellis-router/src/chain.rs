//! Per-request context transform chain.
//!
//! This is not a middleware model with a `next()`: each stage is a
//! plain async function from one seed value to the next, applied
//! strictly in registration order. The only way a stage can skip the
//! rest of the chain is to return an `Err` — either a raised response
//! or a genuine failure.
//!
//! The chain is stored as an explicit ordered list and executed by a
//! single loop, so per-request cost is linear in the number of stages
//! without call-stack growth.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use trellis_core::{BoxFuture, PetalResult};

/// One stage of a transform chain.
///
/// Implemented for any `Fn(S) -> Future<Output = PetalResult<S>>`
/// closure, so stages are usually written as async closures:
///
/// ```
/// use trellis_core::PetalResult;
/// use trellis_router::Chain;
///
/// let chain: Chain<u32> = Chain::identity()
///     .push(|seed: u32| async move { PetalResult::Ok(seed + 1) });
/// ```
pub trait Transform<S>: Send + Sync {
    /// Map one seed value to the next.
    fn apply(&self, seed: S) -> BoxFuture<'static, PetalResult<S>>;
}

impl<S, F, Fut> Transform<S> for F
where
    F: Fn(S) -> Fut + Send + Sync,
    Fut: Future<Output = PetalResult<S>> + Send + 'static,
{
    fn apply(&self, seed: S) -> BoxFuture<'static, PetalResult<S>> {
        Box::pin(self(seed))
    }
}

/// An ordered list of transform stages.
///
/// Chains are immutable: [`Chain::push`] returns a new chain sharing
/// the existing stages, so a route that captured the chain earlier is
/// never affected by later composition.
pub struct Chain<S> {
    stages: Vec<Arc<dyn Transform<S>>>,
}

impl<S> Chain<S> {
    /// The identity chain: no stages, the seed passes through as-is.
    #[must_use]
    pub fn identity() -> Self {
        Self { stages: Vec::new() }
    }

    /// Return a new chain with `stage` appended.
    ///
    /// Later-added stages run after earlier ones.
    #[must_use]
    pub fn push<T: Transform<S> + 'static>(&self, stage: T) -> Self {
        let mut stages = self.stages.clone();
        stages.push(Arc::new(stage));
        Self { stages }
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether this is the identity chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run all stages over the seed in registration order.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, skipping the remaining stages.
    pub async fn run(&self, seed: S) -> PetalResult<S> {
        let mut seed = seed;
        for stage in &self.stages {
            seed = stage.apply(seed).await?;
        }
        Ok(seed)
    }
}

impl<S> Clone for Chain<S> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<S> Default for Chain<S> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<S> fmt::Debug for Chain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("stages", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use trellis_core::{ErrorSignal, PetalError, StatusCode};

    #[test]
    fn identity_passes_seed_through() {
        let chain: Chain<u32> = Chain::identity();
        assert_eq!(block_on(chain.run(7)).unwrap(), 7);
    }

    #[test]
    fn stages_run_in_registration_order() {
        let chain: Chain<Vec<&'static str>> = Chain::identity()
            .push(|mut seed: Vec<&'static str>| async move {
                seed.push("first");
                Ok(seed)
            })
            .push(|mut seed: Vec<&'static str>| async move {
                seed.push("second");
                Ok(seed)
            });
        assert_eq!(
            block_on(chain.run(Vec::new())).unwrap(),
            vec!["first", "second"]
        );
    }

    #[test]
    fn push_does_not_affect_the_source_chain() {
        let base: Chain<u32> = Chain::identity().push(|seed: u32| async move { Ok(seed + 1) });
        let longer = base.push(|seed: u32| async move { Ok(seed * 10) });

        assert_eq!(base.len(), 1);
        assert_eq!(longer.len(), 2);
        assert_eq!(block_on(base.run(1)).unwrap(), 2);
        assert_eq!(block_on(longer.run(1)).unwrap(), 20);
    }

    #[test]
    fn error_skips_remaining_stages() {
        let chain: Chain<u32> = Chain::identity()
            .push(|_seed: u32| async move {
                Err(PetalError::Raised(
                    ErrorSignal::new(StatusCode::UNAUTHORIZED),
                ))
            })
            .push(|_seed: u32| async move { panic!("stage after an error must not run") });

        match block_on(chain.run(0)) {
            Err(PetalError::Raised(signal)) => {
                assert_eq!(signal.status(), StatusCode::UNAUTHORIZED);
            }
            other => panic!("expected a raised signal, got {other:?}"),
        }
    }
}
