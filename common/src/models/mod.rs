pub mod channel;
pub mod user;

pub use channel::*;
pub use user::*;
