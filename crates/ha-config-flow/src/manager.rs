//! Config Flow Manager
//!
//! Keeps one [`ConfigFlow`] instance per active flow id. Submitted answers
//! are validated against the schema of the form last shown for that flow
//! before the step runs. When a step finishes the flow, the entry is
//! written through [`ConfigEntries`] and the flow is forgotten.

use async_trait::async_trait;
use dashmap::DashMap;
use ha_config_entries::{ConfigEntries, ConfigEntry};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::error::FlowError;
use crate::flow::{ConfigFlow, ConfigFlowHandler, FlowFactory};
use crate::result::{FlowResult, StepOutcome};
use crate::schema::Schema;

/// Active flow state
struct ActiveFlow {
    /// Integration domain
    handler: String,
    flow: Arc<Mutex<Box<dyn ConfigFlow>>>,
    /// Step whose form is currently shown
    current_step: String,
    /// Schema the next submission is validated against
    schema: Schema,
}

/// Manages active configuration flows
pub struct FlowManager {
    /// Active flows: flow_id -> flow state
    flows: RwLock<HashMap<String, ActiveFlow>>,
    /// Flow factories by domain
    factories: DashMap<String, FlowFactory>,
    /// Where finished flows are persisted
    entries: Arc<ConfigEntries>,
}

impl FlowManager {
    pub fn new(entries: Arc<ConfigEntries>) -> Self {
        Self {
            flows: RwLock::new(HashMap::new()),
            factories: DashMap::new(),
            entries,
        }
    }

    /// Register the flow factory for a domain
    pub fn register(&self, domain: &str, factory: FlowFactory) {
        self.factories.insert(domain.to_string(), factory);
        debug!("Registered config flow for domain: {}", domain);
    }

    /// Config entries finished flows are written to
    pub fn entries(&self) -> &Arc<ConfigEntries> {
        &self.entries
    }

    /// Number of unfinished flows
    pub async fn active_flows(&self) -> usize {
        self.flows.read().await.len()
    }

    /// Turn a step outcome into a flow result, persisting or forgetting the
    /// flow as needed
    async fn settle(
        &self,
        flow_id: &str,
        handler: &str,
        flow: &Arc<Mutex<Box<dyn ConfigFlow>>>,
        versions: (u32, u32),
        outcome: StepOutcome,
    ) -> Result<FlowResult, FlowError> {
        match outcome {
            StepOutcome::Form(form) => {
                let result = FlowResult::form(flow_id, handler, &form);
                let mut flows = self.flows.write().await;
                flows.insert(
                    flow_id.to_string(),
                    ActiveFlow {
                        handler: handler.to_string(),
                        flow: flow.clone(),
                        current_step: form.step_id,
                        schema: form.schema,
                    },
                );
                Ok(result)
            }
            StepOutcome::CreateEntry { title, data } => {
                let (version, minor_version) = versions;
                let entry = ConfigEntry::new(handler, title.clone())
                    .with_data_map(data)
                    .with_version(version, minor_version);

                // On failure the flow stays at its step so the user can resubmit
                let entry = self.entries.add(entry).await?;
                self.flows.write().await.remove(flow_id);

                info!(
                    "Flow {} for {} created entry {} ({})",
                    flow_id, handler, entry.entry_id, title
                );
                Ok(FlowResult::create_entry(
                    flow_id,
                    handler,
                    &title,
                    version,
                    minor_version,
                    serde_json::to_value(&entry)?,
                ))
            }
            StepOutcome::Abort { reason } => {
                self.flows.write().await.remove(flow_id);
                info!("Flow {} for {} aborted: {}", flow_id, handler, reason);
                Ok(FlowResult::abort(flow_id, handler, &reason))
            }
        }
    }
}

#[async_trait]
impl ConfigFlowHandler for FlowManager {
    async fn start_flow(
        &self,
        handler: &str,
        show_advanced_options: bool,
    ) -> Result<FlowResult, FlowError> {
        let factory = self
            .factories
            .get(handler)
            .map(|f| f.value().clone())
            .ok_or_else(|| FlowError::UnknownHandler(handler.to_string()))?;

        let flow_id = Ulid::new().to_string().to_lowercase();
        info!(
            "Starting config flow for {} with flow_id {} (advanced: {})",
            handler, flow_id, show_advanced_options
        );

        let flow = Arc::new(Mutex::new(factory()));
        let mut instance = flow.lock().await;
        let step_id = instance.initial_step().to_string();
        let outcome = instance.step(&step_id, None).await?;
        let versions = (instance.version(), instance.minor_version());

        self.settle(&flow_id, handler, &flow, versions, outcome)
            .await
    }

    async fn progress_flow(
        &self,
        flow_id: &str,
        user_input: Option<Value>,
    ) -> Result<FlowResult, FlowError> {
        let (handler, flow, current_step, schema) = {
            let flows = self.flows.read().await;
            let active = flows
                .get(flow_id)
                .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;
            (
                active.handler.clone(),
                active.flow.clone(),
                active.current_step.clone(),
                active.schema.clone(),
            )
        };

        let validated = match user_input {
            Some(input) => Some(schema.validate(&input).map_err(|e| {
                warn!("Rejected input for flow {} step {}: {}", flow_id, current_step, e);
                FlowError::from(e)
            })?),
            None => None,
        };

        debug!(
            "Progressing flow {} for {} at step {}",
            flow_id, handler, current_step
        );

        // Held until the outcome is settled so a second submission sees the result
        let mut instance = flow.lock().await;
        if !self.flows.read().await.contains_key(flow_id) {
            return Err(FlowError::UnknownFlow(flow_id.to_string()));
        }
        let outcome = instance.step(&current_step, validated).await?;
        let versions = (instance.version(), instance.minor_version());

        self.settle(flow_id, &handler, &flow, versions, outcome)
            .await
    }

    async fn abort_flow(&self, flow_id: &str) -> Result<(), FlowError> {
        let removed = self.flows.write().await.remove(flow_id);
        match removed {
            Some(active) => {
                info!("Flow {} for {} aborted by user", flow_id, active.handler);
                Ok(())
            }
            None => Err(FlowError::UnknownFlow(flow_id.to_string())),
        }
    }

    async fn list_flows(&self) -> Vec<Value> {
        let flows = self.flows.read().await;
        flows
            .iter()
            .map(|(flow_id, flow)| {
                serde_json::json!({
                    "flow_id": flow_id,
                    "handler": flow.handler,
                    "step_id": flow.current_step,
                    "context": {
                        "source": "user"
                    }
                })
            })
            .collect()
    }

    fn handlers(&self) -> Vec<String> {
        let mut handlers: Vec<String> = self.factories.iter().map(|f| f.key().clone()).collect();
        handlers.sort();
        handlers
    }
}
