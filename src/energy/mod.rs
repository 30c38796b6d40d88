//! Device power and energy estimation.
//!
//! Everything in here is synchronous and side-effect free; the services call
//! into it whenever a device changes state.

pub mod accumulator;
pub mod power;
pub mod suggestions;
pub mod summary;

pub use accumulator::{close_interval, ClosedInterval, OpenInterval};
pub use power::{PowerModel, PowerModelConfig};
pub use suggestions::{suggest, Suggestion, SuggestionCategory};
pub use summary::{summarize, EnergySummary};
