//! Invocation façade: resolve a name through the store, validate the
//! request, delegate to the engine.

use std::sync::Arc;

use tracing::{info_span, warn};

use crate::engine::redactor::Redactor;
use crate::engine::Engine;
use crate::store::{AlgorithmStore, StoreError};
use crate::types::{Failure, InvocationRequest, InvocationResult};

/// Runs stored algorithms by name.
#[derive(Debug, Clone)]
pub struct Invoker {
    store: Arc<dyn AlgorithmStore>,
    engine: Engine,
}

impl Invoker {
    /// Build a façade over `store` and `engine`.
    pub fn new(store: Arc<dyn AlgorithmStore>, engine: Engine) -> Self {
        Self { store, engine }
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<dyn AlgorithmStore> {
        &self.store
    }

    /// The engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run algorithm `name` over `payload`.
    ///
    /// `payload` must be a JSON object; anything else is
    /// [`FailureKind::InvalidInput`](crate::types::FailureKind::InvalidInput).
    pub fn invoke(
        &self,
        name: &str,
        payload: &serde_json::Value,
        passcode: &str,
        api_key: Option<&str>,
        key_order: Option<Vec<String>>,
    ) -> InvocationResult {
        let serde_json::Value::Object(map) = payload else {
            return Err(Failure::invalid_input(format!(
                "payload must be a JSON object, got {}",
                json_type(payload)
            )));
        };
        let request = InvocationRequest {
            payload: map.clone(),
            passcode: passcode.to_owned(),
            api_key: api_key.unwrap_or_default().to_owned(),
            key_order,
        };
        self.invoke_request(name, &request)
    }

    /// Run algorithm `name` with a prepared request.
    pub fn invoke_request(&self, name: &str, request: &InvocationRequest) -> InvocationResult {
        let span = info_span!("invoke", algorithm = %name);
        let _entered = span.enter();

        let definition = match self.store.get(name) {
            Ok(definition) => definition,
            Err(StoreError::NotFound(_)) => return Err(Failure::not_found(name.trim())),
            Err(e) => {
                warn!(error = %e, "algorithm store lookup failed");
                let redactor = Redactor::new(request.secrets(), 0);
                return Err(Failure::runtime(format!(
                    "could not load algorithm: {}",
                    redactor.redact(&e.to_string())
                )));
            }
        };
        self.engine.run(&definition.source, request)
    }

    /// [`Invoker::invoke`] on the tokio blocking pool, so many invocations
    /// proceed in parallel without stalling the async runtime.
    pub async fn invoke_async(
        self: &Arc<Self>,
        name: String,
        payload: serde_json::Value,
        passcode: String,
        api_key: Option<String>,
        key_order: Option<Vec<String>>,
    ) -> InvocationResult {
        let invoker = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            invoker.invoke(&name, &payload, &passcode, api_key.as_deref(), key_order)
        })
        .await
        .unwrap_or_else(|e| Err(Failure::runtime(format!("invocation task failed: {e}"))))
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Split `"a, b ,c"` into `["a", "b", "c"]`, dropping empty entries.
/// Blank input means no explicit order.
pub fn parse_key_order(text: &str) -> Option<Vec<String>> {
    let keys: Vec<String> = text
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .collect();
    if keys.is_empty() {
        None
    } else {
        Some(keys)
    }
}
