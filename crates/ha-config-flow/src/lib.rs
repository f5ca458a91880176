//! Config Flows
//!
//! Multi-step forms an integration walks the user through before a config
//! entry is created. An integration implements [`ConfigFlow`]; the
//! [`FlowManager`] keeps active flows, validates submitted answers against
//! the form last shown, and persists the entry when a flow finishes.
//!
//! # Key Types
//!
//! - [`Schema`] - Ordered form fields with voluptuous-style validation
//! - [`StepOutcome`] - What a step returns: a form, an entry, or an abort
//! - [`FlowResult`] - Wire shape sent to the frontend
//! - [`FlowManager`] - Drives flows and hands finished ones to config entries

pub mod error;
pub mod flow;
pub mod manager;
pub mod result;
pub mod schema;

pub use error::FlowError;
pub use flow::{ConfigFlow, ConfigFlowHandler, FlowFactory, UserInput};
pub use manager::FlowManager;
pub use result::{FlowResult, FlowResultType, FormStep, StepOutcome};
pub use schema::{FieldKind, FormField, Schema, SchemaError, SchemaField, SelectOption};
