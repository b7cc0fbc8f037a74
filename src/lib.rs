//! Hashgen: run user-supplied signing and hashing algorithms by name.
//!
//! Algorithms are small programs in a sandboxed snippet language. Each
//! defines `generate(payload, passcode, api_key, key_order)` and returns a
//! digest string. The only host functionality a snippet can reach is the
//! fixed capability set: digests, HMAC, base64, JSON and the clock.
//!
//! - [`store`] persists named algorithms.
//! - [`engine`] loads, checks and runs one algorithm in isolation.
//! - [`invoker`] ties the two together behind a by-name call.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod capability;
pub mod config;
pub mod engine;
pub mod invoker;
pub mod logging;
pub mod script;
pub mod store;
pub mod types;

pub use engine::{Engine, EngineConfig};
pub use invoker::{parse_key_order, Invoker};
pub use store::{AlgorithmDefinition, AlgorithmStore, FileStore, MemoryStore, StoreError};
pub use types::{Failure, FailureKind, InvocationRequest, InvocationResult};
