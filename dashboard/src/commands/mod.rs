//! Dashboard commands.
//!
//! Each command takes the shared [`DashboardState`](crate::DashboardState)
//! and returns a serializable response for the presentation layer:
//!
//! - **options**: values offered by the filter widgets
//! - **refresh**: the full dashboard for one filter selection

pub mod options;
pub mod refresh;

pub use options::*;
pub use refresh::*;
