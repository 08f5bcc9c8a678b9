pub mod catalog;
pub mod db;
pub mod schema;

pub use catalog::*;
pub use db::*;
pub use schema::*;
