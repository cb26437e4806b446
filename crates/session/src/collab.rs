//! Load and save collaborators
//!
//! The session never persists anything itself. It calls a [`Loader`] once
//! at activation and a [`Saver`] once per closed save window.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// Persists a projected value
#[async_trait]
pub trait Saver<P>: Send + Sync + 'static {
    /// Save `value`. Errors are reported but never retried.
    async fn save(&self, value: P) -> anyhow::Result<()>;
}

/// Fetches the starting value of a session
#[async_trait]
pub trait Loader<V>: Send + Sync + 'static {
    /// Load the initial value
    async fn load(&self) -> anyhow::Result<V>;
}

#[async_trait]
impl<P, S> Saver<P> for Arc<S>
where
    P: Send + 'static,
    S: Saver<P> + ?Sized,
{
    async fn save(&self, value: P) -> anyhow::Result<()> {
        (**self).save(value).await
    }
}

#[async_trait]
impl<V, L> Loader<V> for Arc<L>
where
    V: Send + 'static,
    L: Loader<V> + ?Sized,
{
    async fn load(&self) -> anyhow::Result<V> {
        (**self).load().await
    }
}

/// [`Saver`] backed by an async closure
pub struct SaveFn<F>(F);

/// Adapt `f` into a [`Saver`]
pub fn save_fn<F>(f: F) -> SaveFn<F> {
    SaveFn(f)
}

#[async_trait]
impl<P, F, Fut> Saver<P> for SaveFn<F>
where
    P: Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn save(&self, value: P) -> anyhow::Result<()> {
        (self.0)(value).await
    }
}

/// [`Loader`] backed by an async closure
pub struct LoadFn<F>(F);

/// Adapt `f` into a [`Loader`]
pub fn load_fn<F>(f: F) -> LoadFn<F> {
    LoadFn(f)
}

#[async_trait]
impl<V, F, Fut> Loader<V> for LoadFn<F>
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
{
    async fn load(&self) -> anyhow::Result<V> {
        (self.0)().await
    }
}

/// Outcome of the initial load
#[derive(Debug, Clone)]
pub enum LoadState<V> {
    /// Load still running
    Loading,
    /// Load finished with the initial value
    Ready(V),
    /// Load failed; not retried
    Failed(Arc<anyhow::Error>),
}

impl<V> LoadState<V> {
    /// Whether the load is still running
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the load succeeded
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Initial value, if loaded
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Load error, if it failed
    pub fn error(&self) -> Option<&anyhow::Error> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}
