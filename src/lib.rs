//! # breakpoints - transition-tracking media query registry
//!
//! Client code registers predicate strings ("breakpoints", usually media
//! queries) together with a callback. The registry reports the current match
//! value immediately and then exactly once per transition, driven by the
//! platform's own change notifications.
//!
//! ## Core Concepts
//!
//! - **Predicate**: condition text, evaluated by the platform, never parsed here
//! - **Binding**: one predicate, one handler, one platform subscription
//! - **Registry**: owns bindings in registration order; the only client entry point
//! - **Platform evaluator**: the injected `PredicateEvaluator` capability
//!
//! ## Usage
//!
//! ```rust
//! use breakpoints::{Registry, SimulatedViewport};
//!
//! let viewport = SimulatedViewport::shared(1200, 800);
//! let registry = Registry::new(&viewport)?;
//!
//! let handle = registry.register("(max-width: 768px)", |matches| {
//!     println!("mobile layout: {matches}");
//! })?;
//!
//! viewport.resize(640, 800);
//! viewport.dispatch_pending();
//!
//! registry.deregister(handle);
//! # Ok::<(), breakpoints::BreakpointError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core
pub mod binding;
pub mod error;
pub mod predicate;
pub mod registry;

// Platform capability and reference evaluator
pub mod platform;

// Adapters built on the core
pub mod config;
pub mod handlers;
pub mod states;

// Ambient
pub mod logging;

// Re-export primary types at crate root for convenience
pub use binding::{Handler, Phase};
pub use config::{StateDef, StatesConfig};
pub use error::{BreakpointError, BreakpointResult, ValidationError};
pub use handlers::{HandlerTable, MatchHandlers, SharedHandler};
pub use platform::{
    HeadlessHost, Host, Listener, MediaType, PlatformError, PredicateEvaluator, SimulatedViewport,
    SubscriptionHandle,
};
pub use predicate::{BindingHandle, BindingId, Predicate};
pub use registry::Registry;
pub use states::StateSet;
