#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Formforge directive-driven form generation and command resolution library.

/// Connected client identities and deployment modes.
#[path = "../connection.rs"]
pub mod connection;

/// Core primitives: form requests, responses, outcomes, and errors.
#[path = "../forms.rs"]
pub mod forms;

/// `!%name:kind:options%` directive scanning and decoding.
#[path = "../directives.rs"]
pub mod directives;

/// Typed widget specifications with defaults and response extraction.
#[path = "../widgets.rs"]
pub mod widgets;

/// Command and menu form assembly.
#[path = "../assembly.rs"]
pub mod assembly;

/// Single-assignment pending results and transport callbacks.
#[path = "../resolver.rs"]
pub mod resolver;

/// First-occurrence directive substitution.
#[path = "../substitution.rs"]
pub mod substitution;

/// Command dispatch to execution backends.
#[path = "../dispatch.rs"]
pub mod dispatch;

/// Authorization predicates for buttons and commands.
#[path = "../access.rs"]
pub mod access;

/// Display templating of non-directive placeholders.
#[path = "../templating.rs"]
pub mod templating;

/// TOML menu configuration.
#[path = "../config.rs"]
pub mod config;

/// Orchestrator rendering menus and resolving command forms.
#[path = "../formcommander.rs"]
pub mod formcommander;

/// Menu navigation sessions chaining selections into command runs.
#[path = "../session.rs"]
pub mod session;

/// Telemetry helpers for form orchestration.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Prelude exports for consumers that embed the form pipeline.
pub mod prelude {
    pub use crate::access::{AccessList, AccessPolicy, ListAccessPolicy};
    pub use crate::assembly::{ButtonArena, CommandForm, MenuForm};
    pub use crate::config::{ButtonDefinition, CommandDefinition, MenuDefinition, MenuDocument};
    pub use crate::connection::{ClientIdentity, DeploymentMode};
    pub use crate::directives::{scan_directives, DirectiveKind, DirectiveSpec};
    pub use crate::dispatch::{CommandBackend, CommandDispatcher, CommandManager, LoopbackBackend};
    pub use crate::formcommander::{FormCommander, FormCommanderBuilder};
    pub use crate::forms::{
        Cancelled, CommandOutcome, FormComponent, FormError, FormRequest, FormResponse,
        ResponseValue,
    };
    pub use crate::resolver::{FormCallback, FormTransport, LoopbackTransport, PendingResult};
    pub use crate::session::MenuSession;
    pub use crate::substitution::{substitute, ResolvedValues};
    pub use crate::telemetry::{FormTelemetry, FormTelemetryBuilder};
    pub use crate::templating::{DisplayTemplater, PlaceholderTemplater};
    pub use crate::widgets::{Widget, WidgetSpec};
}
