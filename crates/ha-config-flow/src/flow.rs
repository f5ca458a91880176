//! Config flow traits
//!
//! [`ConfigFlow`] is implemented once per integration and holds the state
//! of one setup session. [`ConfigFlowHandler`] is the host-facing interface
//! the API layer talks to.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::error::FlowError;
use crate::result::{FlowResult, StepOutcome};

/// Validated answers submitted for a step
pub type UserInput = Map<String, Value>;

/// Creates a fresh flow instance for a domain
pub type FlowFactory = Arc<dyn Fn() -> Box<dyn ConfigFlow> + Send + Sync + 'static>;

/// One integration's setup wizard
///
/// Each step is called first with `None` to render its form, then with the
/// validated answers once the user submits.
#[async_trait]
pub trait ConfigFlow: Send {
    /// Integration domain the entry is created for
    fn domain(&self) -> &str;

    /// Major version of the entry data this flow produces
    fn version(&self) -> u32 {
        1
    }

    /// Minor version of the entry data this flow produces
    fn minor_version(&self) -> u32 {
        1
    }

    /// Step a new flow starts at
    fn initial_step(&self) -> &str {
        "user"
    }

    /// Run a step
    async fn step(
        &mut self,
        step_id: &str,
        user_input: Option<UserInput>,
    ) -> Result<StepOutcome, FlowError>;
}

/// Interface for starting and progressing configuration flows
#[async_trait]
pub trait ConfigFlowHandler: Send + Sync {
    /// Start a new flow for an integration; usually returns its first form
    async fn start_flow(
        &self,
        handler: &str,
        show_advanced_options: bool,
    ) -> Result<FlowResult, FlowError>;

    /// Continue a flow. `None` re-renders the current step's form.
    async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> Result<FlowResult, FlowError>;

    /// Drop an unfinished flow
    async fn abort_flow(&self, flow_id: &str) -> Result<(), FlowError>;

    /// Active flows as JSON (`flow_id`, `handler`, `step_id`, `context`)
    async fn list_flows(&self) -> Vec<Value>;

    /// Domains a flow can be started for
    fn handlers(&self) -> Vec<String>;
}
