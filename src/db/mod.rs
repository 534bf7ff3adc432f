pub mod connection;
pub mod queries;
pub mod store;

pub use connection::*;
pub use queries::*;
pub use store::*;
