//! Editor side of the bridge
//!
//! [`BridgeListener`] accepts WebSocket connections on the bridge port and
//! hands each inbound request to the [`Dispatcher`], which looks the method
//! up in a [`MethodRegistry`] and runs its handler against an [`Editor`].
//! Every well-formed request gets exactly one response carrying the same id.
//!
//! The standard registry covers the 28 methods in [`STANDARD_METHODS`].
//! [`HeadlessEditor`] implements [`Editor`] over the filesystem so the bridge
//! can run without a graphical editor.

mod dispatcher;
pub mod editor;
pub mod error;
pub mod headless;
mod listener;
pub mod methods;
mod registry;

pub use dispatcher::Dispatcher;
pub use editor::{
    Diagnostic, DiagnosticSeverity, DocumentContent, DocumentInfo, Editor, ExtensionInfo,
    MessageKind, Position, Range, SelectionInfo, TabInfo, WorkspaceFolder,
};
pub use error::{EditorError, EditorResult, HandlerError, HandlerResult, RegistryError, ServerError};
pub use headless::HeadlessEditor;
pub use listener::{BridgeListener, BridgeStatus};
pub use methods::{BUILT_IN_THEMES, STANDARD_METHODS};
pub use registry::{BoxFuture, HandlerContext, MethodHandler, MethodRegistry};

pub use editbridge_core::ServerConfig;
