//! Request lifecycle: the review state machine and its side effects.
//!
//! The design separates:
//! - **Decision**: pure function from (current status, reviewer action) to a
//!   transition or a no-op (`transition`)
//! - **Plan**: the transition's side effects as data (`effect`)
//! - **Dispatch**: execution of the plan, each step independently fallible
//!   (`dispatch`)
//! - **Service**: orchestration around them: readiness, scope, authorization,
//!   per-request locking, submission (`service`)

pub mod dispatch;
pub mod effect;
pub mod service;
pub mod transition;

pub use dispatch::*;
pub use effect::*;
pub use service::*;
pub use transition::*;
