use crate::{
    resolve::Resolver,
    schema::{Schema, SchemaError},
};

const CAMEL_MODEL_JSON: &str = include_str!("camel-model.json");

/// The camel route model definitions packaged with the crate.
pub fn model() -> Result<Schema, SchemaError> {
    Schema::from_json_str(CAMEL_MODEL_JSON)
}

impl Resolver {
    /// A resolver over the packaged camel route model.
    pub fn camel() -> Result<Self, SchemaError> {
        Ok(Resolver::new(model()?))
    }
}
