// Application layer: use cases over the storage layer, each run on behalf
// of an explicit caller.

mod attendance;
pub mod error;
mod service;

pub use attendance::*;
pub use error::*;
pub use service::*;
