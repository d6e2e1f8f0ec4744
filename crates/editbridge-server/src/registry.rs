//! Method registry: the mapping from method name to handler.

use rustc_hash::FxHashMap;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::editor::Editor;
use crate::error::{HandlerError, HandlerResult, RegistryError};

/// Type alias for a boxed, sendable handler future.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Type-erased method handler.
pub type MethodHandler = Arc<dyn Fn(HandlerContext, Value) -> BoxFuture<HandlerResult> + Send + Sync>;

/// Everything a handler gets besides its params.
#[derive(Clone)]
pub struct HandlerContext {
    /// The editor the request operates on
    pub editor: Arc<dyn Editor>,
    /// Cancelled when the connection closes, the listener stops, or the
    /// handler deadline passes
    pub cancel: CancellationToken,
}

impl HandlerContext {
    pub fn new(editor: Arc<dyn Editor>, cancel: CancellationToken) -> Self {
        Self { editor, cancel }
    }

    /// Run `operation` unless the request is cancelled first.
    ///
    /// Cancellation only stops waiting. Work the editor already started may
    /// still complete.
    pub async fn until_cancelled<F, T>(&self, operation: F) -> Result<T, HandlerError>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            output = operation => Ok(output),
            _ = self.cancel.cancelled() => Err(HandlerError::Cancelled),
        }
    }
}

/// Name-to-handler table consulted by the dispatcher.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    handlers: FxHashMap<String, MethodHandler>,
}

impl MethodRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full standard method table.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        crate::methods::install(&mut registry);
        registry
    }

    /// Register an async function as the handler for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] when `name` is already taken.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(HandlerContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(name, boxed(handler))
    }

    /// Register an already type-erased handler.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: MethodHandler,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Insert without the duplicate check. Used for the built-in table.
    pub(crate) fn insert<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(HandlerContext, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.handlers.insert(name.to_string(), boxed(handler));
    }

    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<MethodHandler> {
        self.handlers.get(name).cloned()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered method names, sorted.
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}

fn boxed<F, Fut>(handler: F) -> MethodHandler
where
    F: Fn(HandlerContext, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |ctx, params| Box::pin(handler(ctx, params)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessEditor;
    use crate::methods::STANDARD_METHODS;
    use serde_json::json;

    async fn ping(_ctx: HandlerContext, params: Value) -> HandlerResult {
        Ok(json!({ "pong": params }))
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = MethodRegistry::new();
        registry.register("ping", ping).unwrap();
        assert_eq!(
            registry.register("ping", ping),
            Err(RegistryError::Duplicate("ping".to_string()))
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("ping"));
        assert!(registry.lookup("pong").is_none());
    }

    #[test]
    fn test_standard_table_is_complete() {
        let registry = MethodRegistry::standard();
        assert_eq!(registry.len(), STANDARD_METHODS.len());
        for name in STANDARD_METHODS {
            assert!(registry.contains(name), "missing handler for {name}");
        }
    }

    #[tokio::test]
    async fn test_lookup_invokes_handler() {
        let mut registry = MethodRegistry::new();
        registry.register("ping", ping).unwrap();

        let handler = registry.lookup("ping").unwrap();
        let ctx = HandlerContext::new(Arc::new(HeadlessEditor::new()), CancellationToken::new());
        let result = handler(ctx, json!(1)).await.unwrap();
        assert_eq!(result, json!({"pong": 1}));
    }

    #[tokio::test]
    async fn test_until_cancelled() {
        let ctx = HandlerContext::new(Arc::new(HeadlessEditor::new()), CancellationToken::new());
        ctx.cancel.cancel();
        let result = ctx.until_cancelled(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(HandlerError::Cancelled)));
    }
}
