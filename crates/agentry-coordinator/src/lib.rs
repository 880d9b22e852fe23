//! Request orchestration for agentry.
//!
//! One [`Coordinator`] instance handles one request end-to-end:
//! a routing decision picks one of two backend agents, the matching gateway
//! delegates and mirrors the agent's progress, and a final synthesis pass
//! turns the delegate's output into the user-facing answer. Response
//! content, progress stages and attachments stream out through a
//! per-request [`ResponseSink`] in arrival order.

pub mod config;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod events;
pub mod gateway;
mod history;
pub mod prompts;
pub mod router;
pub mod stage;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use decision::CoordinationDecision;
pub use error::CoordinatorError;
pub use events::{ResponseEvent, ResponseSink};
pub use gateway::{AgentGateway, GatewayError, GatewayResponse, GpaGateway, UmsGateway};
pub use router::Router;
pub use stage::{Stage, StageTracker};
