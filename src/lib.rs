pub mod camel;
pub mod config;
pub mod parsedir;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use resolve::{NodeRef, ResolveError, Resolver, lookup_definition};
pub use schema::{Definition, Schema, SchemaError};
