//! Startup orchestration for packgate.
//!
//! [`InitOrchestrator`] brings the system up in a fixed order:
//!
//! ```text
//! NotStarted → InitializingStore → InitializingPurchaseService
//!            → InitializingCollaborators → SyncingPurchases → Ready
//! ```
//!
//! Components live in an [`AppContext`] registry that the host builds once and
//! shares. A component already present in the registry is reused rather than
//! constructed again.
//!
//! # Budgets
//!
//! | Stage | Default budget |
//! |---|---|
//! | store | 5 s |
//! | purchase service | 30 s (configurable) |
//! | collaborators | none |
//! | purchase sync | 10 s |
//!
//! A stage that overruns is logged and skipped; `Ready` is always reached.

mod config;
mod context;
mod error;
mod orchestrator;

pub use config::{OrchestratorConfig, PackgateConfig};
pub use context::{AppContext, AppContextBuilder};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{Collaborator, InitOrchestrator, InitStage};
