//! Single-shot callbacks (plain and async).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::CallbackMetadata;
use crate::error::Result;

type PlainFn = dyn Fn(&Value) -> Result<Value> + Send + Sync;
type AsyncPlainFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// A function invoked once per operation; keeps no state between calls.
#[derive(Clone)]
pub struct PlainCallback {
    func: Arc<PlainFn>,
    metadata: CallbackMetadata,
}

impl PlainCallback {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            metadata: CallbackMetadata::new(),
        }
    }

    /// Wrap a zero-argument function as a `reset` callback.
    pub fn reset_hook<F>(func: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        Self::new(move |_| func().map(|_| Value::Null))
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn metadata(&self) -> &CallbackMetadata {
        &self.metadata
    }

    /// Run the callback once.
    pub fn invoke(&self, args: &Value) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for PlainCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainCallback")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Like [`PlainCallback`], but the invocation may suspend.
#[derive(Clone)]
pub struct AsyncPlainCallback {
    func: Arc<AsyncPlainFn>,
    metadata: CallbackMetadata,
}

impl AsyncPlainCallback {
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            func: Arc::new(move |args| func(args).boxed()),
            metadata: CallbackMetadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn metadata(&self) -> &CallbackMetadata {
        &self.metadata
    }

    /// Run the callback once, awaiting its result.
    pub async fn invoke(&self, args: &Value) -> Result<Value> {
        (self.func)(args.clone()).await
    }
}

impl fmt::Debug for AsyncPlainCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncPlainCallback")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
