//! Cold, single-shot async sequences.
//!
//! A [`Cold`] wraps a factory of futures. Nothing runs until someone
//! polls the stream or subscribes, and every stream or subscription runs
//! the operation again from scratch: results are never cached or shared.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::error::CatalogError;

type Factory<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, CatalogError>> + Send + Sync>;

/// What an observer receives: one `Next` then `Complete`, or one `Error`.
#[derive(Debug)]
pub enum Event<T> {
    Next(T),
    Error(CatalogError),
    Complete,
}

/// A lazily started, re-runnable single-value operation.
pub struct Cold<T> {
    factory: Factory<T>,
}

impl<T> Clone for Cold<T> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<T: Send + 'static> Cold<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CatalogError>> + Send + 'static,
    {
        Self {
            factory: Arc::new(move || -> BoxFuture<'static, Result<T, CatalogError>> {
                Box::pin(f())
            }),
        }
    }

    /// Already-known value, still delivered through the sequence contract.
    pub fn ready(value: T) -> Self
    where
        T: Clone + Sync,
    {
        Self::new(move || {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Run the operation once and wait for its result.
    pub async fn run(&self) -> Result<T, CatalogError> {
        (self.factory)().await
    }

    /// One fresh run as a stream of exactly one item.
    ///
    /// The operation starts on the first poll.
    pub fn stream(&self) -> BoxStream<'static, Result<T, CatalogError>> {
        let factory = Arc::clone(&self.factory);
        stream::once(async move { factory().await }).boxed()
    }

    /// Start one run on the tokio runtime and push its outcome to `observer`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<O>(&self, observer: O) -> Subscription
    where
        O: FnMut(Event<T>) + Send + 'static,
    {
        let delivery = Arc::new(Mutex::new(Some(observer)));
        let task_delivery = Arc::clone(&delivery);
        let factory = Arc::clone(&self.factory);

        let handle = tokio::spawn(async move {
            let result = factory().await;

            let mut slot = task_delivery.lock();
            let Some(observer) = slot.as_mut() else {
                tracing::trace!("Result dropped, subscriber already gone");
                return;
            };
            match result {
                Ok(value) => {
                    observer(Event::Next(value));
                    observer(Event::Complete);
                }
                Err(e) => observer(Event::Error(e)),
            }
            *slot = None;
        });

        Subscription {
            cancel: Box::new(move || {
                delivery.lock().take();
            }),
            handle,
        }
    }

    /// Transform the value; the result is just as cold.
    pub fn map<U, F>(self, f: F) -> Cold<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let factory = self.factory;
        Cold::new(move || {
            let fut = factory();
            let f = Arc::clone(&f);
            async move { fut.await.map(|v| f(v)) }
        })
    }

    /// Chain a fallible step after the value; still cold.
    pub fn and_then<U, F, Fut>(self, f: F) -> Cold<U>
    where
        U: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, CatalogError>> + Send + 'static,
    {
        let f = Arc::new(f);
        let factory = self.factory;
        Cold::new(move || {
            let fut = factory();
            let f = Arc::clone(&f);
            async move { f(fut.await?).await }
        })
    }
}

/// Handle of one [`Cold::subscribe`] run.
///
/// Dropping it does not unsubscribe.
pub struct Subscription {
    cancel: Box<dyn Fn() + Send + Sync>,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivery to the observer.
    ///
    /// The underlying operation keeps running to completion; once this
    /// returns the observer is never called again.
    pub fn unsubscribe(&self) {
        (self.cancel)();
    }

    /// Whether the run has finished (delivered or dropped its result).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the run to finish.
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "Subscription task failed");
        }
    }
}
