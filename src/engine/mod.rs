//! Execution engine: load injected source into a fresh environment, check
//! the `generate` contract, call it, validate the result.
//!
//! Every run happens on a dedicated worker thread so a runaway snippet can
//! be abandoned once the wall-clock budget expires. The worker shares one
//! interrupt flag with the interpreter; setting it makes the interpreter
//! unwind at its next step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, warn, Span};
use uuid::Uuid;

use crate::capability::CapabilityRegistry;
use crate::script::{self, Interpreter, Limits, ScriptError, Value};
use crate::types::{Failure, FailureKind, InvocationRequest, InvocationResult};

pub mod redactor;

use redactor::Redactor;

/// Name of the required entry point.
pub const ENTRY_POINT: &str = "generate";

/// Entry-point parameters in the order they are passed.
pub const ENTRY_PARAMS: [&str; 4] = ["payload", "passcode", "api_key", "key_order"];

/// Name given to invocation worker threads.
pub const WORKER_THREAD_NAME: &str = "hashgen-invoke";

const NOT_CALLABLE: &str = "generate not found or not callable";
const NOT_A_STRING: &str = "generate must return a string";

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Wall-clock budget per invocation; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Interpreter step and call-depth bounds.
    pub limits: Limits,
    /// Longest failure detail returned, in characters; `0` disables.
    pub max_detail_len: usize,
    /// Stack size of each worker thread, in bytes.
    pub worker_stack_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_millis(5_000)),
            limits: Limits::default(),
            max_detail_len: 512,
            worker_stack_size: 8 * 1024 * 1024,
        }
    }
}

/// Invocation lifecycle stages, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Loading,
    ContractChecking,
    Invoking,
    ResultValidating,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::ContractChecking => "contract_checking",
            Self::Invoking => "invoking",
            Self::ResultValidating => "result_validating",
        }
    }
}

/// Stateless, re-entrant executor for injected algorithms.
///
/// Cloning is cheap; clones share nothing mutable.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
    capabilities: CapabilityRegistry,
}

impl Engine {
    /// Engine with the standard capability set.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_capabilities(config, CapabilityRegistry::standard())
    }

    /// Engine with a caller-supplied capability registry (e.g. a fixed clock).
    pub fn with_capabilities(config: EngineConfig, capabilities: CapabilityRegistry) -> Self {
        Self {
            config,
            capabilities,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `source` against `request` and return the digest.
    ///
    /// Never panics and never propagates a fault: every failure is classified
    /// into a [`Failure`] whose detail has been sanitised.
    pub fn run(&self, source: &str, request: &InvocationRequest) -> InvocationResult {
        let invocation_id = Uuid::new_v4();
        let span = info_span!("invocation", %invocation_id);
        let _entered = span.enter();
        let started = Instant::now();
        debug!(payload_keys = request.payload.len(), "invocation started");

        let redactor = Redactor::new(request.secrets(), self.config.max_detail_len);
        let source = source.to_owned();
        let request = request.clone();
        let limits = self.config.limits;
        let capabilities = self.capabilities.clone();
        let outcome = self.isolate(move |interrupt| {
            execute(&source, &request, &capabilities, limits, interrupt)
        });

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(digest) => {
                info!(elapsed_ms, "invocation succeeded");
                Ok(digest)
            }
            Err(failure) => {
                let failure = Failure::new(failure.kind, redactor.redact(&failure.detail));
                warn!(kind = %failure.kind, elapsed_ms, "invocation failed");
                Err(failure)
            }
        }
    }

    /// Load `source` and check the entry-point contract without calling it.
    ///
    /// # Errors
    ///
    /// [`FailureKind::LoadError`], [`FailureKind::ContractError`], or
    /// [`FailureKind::RuntimeError`] if a top-level constant faults.
    pub fn check(&self, source: &str) -> Result<(), Failure> {
        let redactor = Redactor::new(Vec::<String>::new(), self.config.max_detail_len);
        let source = source.to_owned();
        let limits = self.config.limits;
        let capabilities = self.capabilities.clone();
        self.isolate(move |interrupt| {
            let interp = load(&source, &capabilities, limits, interrupt)?;
            entry_arity(&interp).map(|_| ())
        })
        .map_err(|failure| Failure::new(failure.kind, redactor.redact(&failure.detail)))
    }

    /// Run `job` on a worker thread, enforcing the wall-clock budget.
    fn isolate<T, F>(&self, job: F) -> Result<T, Failure>
    where
        T: Send + 'static,
        F: FnOnce(Arc<AtomicBool>) -> Result<T, Failure> + Send + 'static,
    {
        let interrupt = Arc::new(AtomicBool::new(false));
        let worker_flag = Arc::clone(&interrupt);
        let (tx, rx) = mpsc::channel();
        let parent = Span::current();

        let spawned = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .stack_size(self.config.worker_stack_size)
            .spawn(move || {
                let _entered = parent.enter();
                // The receiver is gone after a timeout; nothing to report to.
                let _ = tx.send(job(worker_flag));
            });
        if let Err(e) = spawned {
            return Err(Failure::runtime(format!("could not start worker: {e}")));
        }

        let received = match self.config.timeout {
            Some(budget) => rx.recv_timeout(budget).map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => {
                    interrupt.store(true, Ordering::Relaxed);
                    Failure::new(
                        FailureKind::Timeout,
                        format!("invocation exceeded the {} ms budget", budget.as_millis()),
                    )
                }
                mpsc::RecvTimeoutError::Disconnected => worker_died(),
            }),
            None => rx.recv().map_err(|_| worker_died()),
        };
        received?
    }
}

fn worker_died() -> Failure {
    Failure::runtime("invocation worker terminated unexpectedly")
}

// ---------------------------------------------------------------------------
// Worker side
// ---------------------------------------------------------------------------

fn execute(
    source: &str,
    request: &InvocationRequest,
    capabilities: &CapabilityRegistry,
    limits: Limits,
    interrupt: Arc<AtomicBool>,
) -> InvocationResult {
    let mut interp = load(source, capabilities, limits, interrupt)?;

    let arity = entry_arity(&interp)?;

    debug!(stage = Stage::Invoking.as_str(), arity);
    let args = entry_args(request, arity);
    let value = interp
        .call(ENTRY_POINT, args)
        .map_err(|e| classify(Stage::Invoking, e))?;

    debug!(stage = Stage::ResultValidating.as_str(), steps = interp.steps());
    match value {
        Value::Str(digest) => Ok(digest),
        other => Err(Failure::contract(format!(
            "{NOT_A_STRING}, got {}",
            other.type_name()
        ))),
    }
}

fn load(
    source: &str,
    capabilities: &CapabilityRegistry,
    limits: Limits,
    interrupt: Arc<AtomicBool>,
) -> Result<Interpreter, Failure> {
    debug!(stage = Stage::Loading.as_str(), source_len = source.len());
    script::load(source, capabilities.bind(), limits, interrupt)
        .map_err(|e| classify(Stage::Loading, e))
}

/// Validate `generate` and return how many arguments to pass it.
fn entry_arity(interp: &Interpreter) -> Result<usize, Failure> {
    debug!(stage = Stage::ContractChecking.as_str());
    let Some(def) = interp.function(ENTRY_POINT) else {
        return Err(Failure::contract(NOT_CALLABLE));
    };
    let declared = def.params.len();
    if declared < 2 {
        return Err(Failure::contract(format!(
            "generate must accept payload and passcode, declares {declared} parameter(s)"
        )));
    }
    if def.required_params() > ENTRY_PARAMS.len() {
        return Err(Failure::contract(format!(
            "generate requires {} parameters, at most {} are supplied",
            def.required_params(),
            ENTRY_PARAMS.len()
        )));
    }
    Ok(declared.min(ENTRY_PARAMS.len()))
}

/// `(payload, passcode, api_key, key_order)` truncated to `arity`.
fn entry_args(request: &InvocationRequest, arity: usize) -> Vec<Value> {
    let payload = Value::Map(
        request
            .payload
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect(),
    );
    let key_order = request.key_order.as_ref().map_or(Value::None, |keys| {
        Value::List(keys.iter().map(|k| Value::Str(k.clone())).collect())
    });
    let mut args = vec![
        payload,
        Value::Str(request.passcode.clone()),
        Value::Str(request.api_key.clone()),
        key_order,
    ];
    args.truncate(arity);
    args
}

fn classify(stage: Stage, error: ScriptError) -> Failure {
    match error {
        ScriptError::Syntax { .. } => Failure::load(error.to_string()),
        ScriptError::Interrupted => Failure::new(FailureKind::Timeout, "invocation was cancelled"),
        ScriptError::Runtime { .. } => {
            debug!(stage = stage.as_str(), "runtime fault");
            Failure::runtime(error.to_string())
        }
    }
}
