//! Adapter contract, registry and submission dispatch.
//!
//! Adapters wrap one third-party platform each. They share settings access,
//! activity logging and HTTP through an [`AdapterContext`], are registered
//! once at startup in an [`IntegrationRegistry`], and receive form
//! submissions through the [`SubmissionDispatcher`].

pub mod adapter;
pub mod adapters;
pub mod bootstrap;
pub mod dispatcher;
pub mod logger;
pub mod registry;
pub mod service;

pub use adapter::{
    AdapterContext, Configurable, ConnectionResult, FieldMappable, IntegrationAdapter, Submission,
};
pub use bootstrap::default_registry;
pub use dispatcher::{DispatchOutcome, DispatchReport, SkipReason, SubmissionDispatcher};
pub use logger::{ActivityLogger, LogContext};
pub use registry::IntegrationRegistry;
pub use service::IntegrationService;
