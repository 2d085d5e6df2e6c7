pub mod config;
pub mod error;
pub mod ident;
pub mod schema;
pub mod table;

pub use config::Config;
pub use error::*;
pub use ident::*;
pub use schema::*;
pub use table::*;
