pub mod config;
pub mod error;
pub mod flight;
pub mod runway;
pub mod scenario;
pub mod schedule;
pub mod separation;
pub mod store;
pub mod time;
pub mod tower;
pub mod weather;

pub use error::{Error, Result};
pub use schedule::{Engine, PassReport};
pub use tower::Tower;
