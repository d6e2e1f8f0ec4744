//! Request dispatch: method lookup, handler deadline and failure encoding.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use editbridge_core::{Outcome, Request, Response, DEFAULT_HANDLER_TIMEOUT};

use crate::editor::Editor;
use crate::error::HandlerError;
use crate::registry::{HandlerContext, MethodRegistry};

/// Turns requests into responses.
///
/// Every request yields exactly one response. A failed editor operation
/// becomes `{ "success": false, "error": reason }`; unknown methods, bad
/// params, panics and deadline overruns become `{ "error": reason }`.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<MethodRegistry>,
    editor: Arc<dyn Editor>,
    handler_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: MethodRegistry, editor: Arc<dyn Editor>) -> Self {
        Self {
            registry: Arc::new(registry),
            editor,
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
        }
    }

    /// Dispatcher over the standard method table.
    pub fn standard(editor: Arc<dyn Editor>) -> Self {
        Self::new(MethodRegistry::standard(), editor)
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    #[inline]
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    #[inline]
    pub fn editor(&self) -> &Arc<dyn Editor> {
        &self.editor
    }

    #[inline]
    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }

    /// Run one request to completion.
    ///
    /// The handler gets a child of `connection`, so closing the connection
    /// cancels it. When the deadline passes the handler's token is cancelled
    /// and a timeout failure is returned.
    pub async fn dispatch(&self, request: Request, connection: &CancellationToken) -> Response {
        let Request { id, method, params } = request;

        let Some(handler) = self.registry.lookup(&method) else {
            debug!(%id, %method, "Unknown method");
            return Response::failure(id, format!("Unknown command: {method}"));
        };

        let cancel = connection.child_token();
        let ctx = HandlerContext::new(Arc::clone(&self.editor), cancel.clone());
        let run = AssertUnwindSafe(handler(ctx, params)).catch_unwind();

        let outcome = tokio::select! {
            finished = tokio::time::timeout(self.handler_timeout, run) => match finished {
                Ok(Ok(Ok(value))) => Outcome::Ok(value),
                Ok(Ok(Err(HandlerError::Editor(e)))) => {
                    debug!(%id, %method, "Editor refused: {}", e);
                    return Response::rejected(id, e.to_string());
                }
                Ok(Ok(Err(e))) => {
                    debug!(%id, %method, "Handler failed: {}", e);
                    Outcome::Err(e.to_string())
                }
                Ok(Err(_)) => {
                    error!(%id, %method, "Handler panicked");
                    Outcome::Err(format!("Handler '{method}' panicked"))
                }
                Err(_) => {
                    cancel.cancel();
                    let millis = self.handler_timeout.as_millis();
                    warn!(%id, %method, "Handler timed out after {} ms", millis);
                    Outcome::Err(format!("Handler '{method}' timed out after {millis} ms"))
                }
            },
            _ = connection.cancelled() => Outcome::Err(HandlerError::Cancelled.to_string()),
        };

        Response::from_outcome(id, outcome)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("methods", &self.registry.len())
            .field("handler_timeout", &self.handler_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::headless::HeadlessEditor;
    use serde_json::{json, Value};

    fn dispatcher(registry: MethodRegistry) -> Dispatcher {
        Dispatcher::new(registry, Arc::new(HeadlessEditor::new()))
    }

    async fn stall(ctx: HandlerContext, _params: Value) -> HandlerResult {
        ctx.cancel.cancelled().await;
        Err(HandlerError::Cancelled)
    }

    async fn explode(_ctx: HandlerContext, _params: Value) -> HandlerResult {
        panic!("boom");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dispatcher = Dispatcher::standard(Arc::new(HeadlessEditor::new()));
        let request = Request::new("1", "doesNotExist", json!({}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert_eq!(response.id.as_str(), "1");
        assert_eq!(response.result, json!({"error": "Unknown command: doesNotExist"}));
    }

    #[tokio::test]
    async fn test_empty_workspace() {
        let dispatcher = Dispatcher::standard(Arc::new(HeadlessEditor::new()));
        let request = Request::new("1", "getWorkspaceInfo", json!({}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert_eq!(
            response.result,
            json!({"hasWorkspace": false, "message": "No workspace open"})
        );
    }

    #[tokio::test]
    async fn test_handler_error_becomes_failure() {
        let dispatcher = Dispatcher::standard(Arc::new(HeadlessEditor::new()));
        let request = Request::new("7", "saveFile", json!({}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert_eq!(
            response.result,
            json!({"success": false, "error": "No active editor"})
        );
        assert_eq!(
            response.into_outcome(),
            Outcome::Err("No active editor".to_string())
        );
    }

    #[tokio::test]
    async fn test_invalid_params_becomes_failure() {
        let dispatcher = Dispatcher::standard(Arc::new(HeadlessEditor::new()));
        let request = Request::new("8", "openFile", json!({"path": 3}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        let reason = response.into_outcome().into_result().unwrap_err();
        assert!(reason.starts_with("Invalid params:"), "{reason}");
    }

    #[tokio::test]
    async fn test_deadline_cancels_handler() {
        let mut registry = MethodRegistry::new();
        registry.register("stall", stall).unwrap();
        let dispatcher = dispatcher(registry).with_handler_timeout(Duration::from_millis(50));

        let request = Request::new("2", "stall", json!({}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert_eq!(
            response.result,
            json!({"error": "Handler 'stall' timed out after 50 ms"})
        );
    }

    #[tokio::test]
    async fn test_panic_becomes_failure() {
        let mut registry = MethodRegistry::new();
        registry.register("explode", explode).unwrap();
        let dispatcher = dispatcher(registry);

        let request = Request::new("3", "explode", json!({}));
        let response = dispatcher.dispatch(request, &CancellationToken::new()).await;
        assert_eq!(response.result, json!({"error": "Handler 'explode' panicked"}));
    }

    #[tokio::test]
    async fn test_connection_close_cancels_handler() {
        let mut registry = MethodRegistry::new();
        registry.register("stall", stall).unwrap();
        let dispatcher = dispatcher(registry);

        let connection = CancellationToken::new();
        connection.cancel();
        let request = Request::new("4", "stall", json!({}));
        let response = dispatcher.dispatch(request, &connection).await;
        assert_eq!(response.result, json!({"error": "Operation cancelled"}));
    }
}
