pub mod config;
pub mod messages;
pub mod models;
pub mod session;
pub mod utils;

pub use self::config::*;
pub use self::messages::*;
pub use self::session::*;
pub use self::utils::*;
