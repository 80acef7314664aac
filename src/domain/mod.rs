mod attendance;
mod balance;
mod days;
mod leave;
mod user;

pub use attendance::*;
pub use balance::*;
pub use days::*;
pub use leave::*;
pub use user::*;
