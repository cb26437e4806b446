//! Projection and consecutive-duplicate suppression for raw changes

use crate::error::{AutosaveError, Result};
use std::fmt;
use std::sync::Arc;

/// Shared projection from a raw change to the value that gets saved
pub type Projection<V, P> = Arc<dyn Fn(V) -> anyhow::Result<P> + Send + Sync>;

/// Wrap an infallible projection
pub fn projection<V, P, F>(f: F) -> Projection<V, P>
where
    V: 'static,
    P: 'static,
    F: Fn(V) -> P + Send + Sync + 'static,
{
    Arc::new(move |value| Ok(f(value)))
}

/// Wrap a projection that can fail
pub fn fallible_projection<V, P, F>(f: F) -> Projection<V, P>
where
    F: Fn(V) -> anyhow::Result<P> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Applies the projection and drops values equal to the previously
/// accepted one.
pub struct ChangeFilter<V, P> {
    projection: Projection<V, P>,
    last: Option<P>,
}

impl<V, P> ChangeFilter<V, P>
where
    P: Clone + PartialEq,
{
    /// Create a filter with the given projection
    pub fn new(projection: Projection<V, P>) -> Self {
        Self {
            projection,
            last: None,
        }
    }

    /// Project `value` and return it if it differs from the last accepted value.
    ///
    /// `Ok(None)` means the change was suppressed as a duplicate.
    pub fn accept(&mut self, value: V) -> Result<Option<P>> {
        let projected = (self.projection)(value).map_err(AutosaveError::Projection)?;

        if self.last.as_ref() == Some(&projected) {
            return Ok(None);
        }

        self.last = Some(projected.clone());
        Ok(Some(projected))
    }

    /// Last accepted value
    pub fn last(&self) -> Option<&P> {
        self.last.as_ref()
    }
}

impl<V> ChangeFilter<V, V>
where
    V: Clone + PartialEq + 'static,
{
    /// Filter that saves raw values unchanged
    pub fn identity() -> Self {
        Self::new(projection(|value: V| value))
    }
}

impl<V, P: fmt::Debug> fmt::Debug for ChangeFilter<V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeFilter")
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
