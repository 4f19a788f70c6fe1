pub mod metrics;
pub mod request;
pub mod response;
pub mod scheduler;
pub mod servable;
pub mod stats;

pub use metrics::*;
pub use request::*;
pub use response::*;
pub use scheduler::*;
pub use servable::*;
pub use stats::*;

use tensorport_core::Result;

/// One in-flight inference request: stats plus the provider pair.
///
/// The payload moves into the scheduler's queue and comes back through
/// the completion callback, so the providers stay alive until the
/// request reaches its terminal status.
pub struct InferPayload {
    pub stats: InferStats,
    pub request: Box<dyn RequestProvider>,
    pub response: Box<dyn ResponseProvider>,
}

/// One-shot completion notification: fires exactly once with the
/// terminal status, handing provider ownership back to the frontend.
pub type OnComplete = Box<dyn FnOnce(Result<()>, InferPayload) + Send>;
