//! Action catalog, validation and execution
//!
//! `registry` declares what the model may ask for, `gateway` carries the
//! request to the owning backend, and `outcome` is the single result
//! contract both sides speak.

pub mod gateway;
pub mod outcome;
pub mod registry;

pub use gateway::ActionGateway;
pub use outcome::{ActionFailure, ActionOutcome, ActionRequest, ActionResult, FailureKind};
pub use registry::{ActionSpec, Backend, ParamKind, ParamSpec, SchemaError, ValidatedArguments};
