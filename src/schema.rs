use std::{
    fs, io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::parsedir::{self, ParseDirError};

/// The `type` marker of a definition that has no base type.
pub const OBJECT_TYPE: &str = "object";

const DEFINITIONS_KEY: &str = "definitions";
const SCHEMA_EXTENSIONS: &[&str] = &["json", "toml"];

#[derive(thiserror::Error, Debug)]
pub enum SchemaError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Unsupported schema format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Invalid path: {0}")]
    PathError(String),

    #[error("Could not determine file stem for path: {0}")]
    StemError(PathBuf),
}

impl From<ParseDirError<SchemaError>> for SchemaError {
    fn from(err: ParseDirError<SchemaError>) -> Self {
        match err {
            ParseDirError::Io(e) => SchemaError::Io(e),
            ParseDirError::FileParse(e) => e,
            ParseDirError::PathError(p) => SchemaError::PathError(p),
            ParseDirError::StemError(p) => SchemaError::StemError(p),
        }
    }
}

/// One named entry of a [`Schema`].
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Definition {
    /// Either [`OBJECT_TYPE`] or the name of the definition this one inherits from.
    #[serde(rename = "type")]
    pub typ: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<Extends>,

    #[serde(default)]
    pub properties: IndexMap<String, Value>,

    /// Descriptive fields (`title`, `group`, `icon`, `description`, ...),
    /// carried through without interpretation.
    #[serde(flatten)]
    pub fields: IndexMap<String, Value>,
}

/// Secondary parents whose properties are mixed into a definition.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Extends {
    #[serde(rename = "type")]
    pub types: TypeRefs,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum TypeRefs {
    One(String),
    Many(Vec<String>),
}

impl Definition {
    pub fn new(typ: impl Into<String>) -> Self {
        Definition {
            typ: typ.into(),
            extends: None,
            properties: IndexMap::new(),
            fields: IndexMap::new(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.text_field("title")
    }

    pub fn group(&self) -> Option<&str> {
        self.text_field("group")
    }

    pub fn icon(&self) -> Option<&str> {
        self.text_field("icon")
    }

    pub fn description(&self) -> Option<&str> {
        self.text_field("description")
    }

    fn text_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// The parent named by `type`, if this is not a base definition.
    pub fn parent(&self) -> Option<&str> {
        if self.typ == OBJECT_TYPE {
            None
        } else {
            Some(self.typ.as_str())
        }
    }

    pub fn extended_types(&self) -> impl Iterator<Item = &str> {
        let types: &[String] = match self.extends.as_ref().map(|e| &e.types) {
            Some(TypeRefs::One(name)) => std::slice::from_ref(name),
            Some(TypeRefs::Many(names)) => names,
            None => &[],
        };
        types.iter().map(String::as_str)
    }

    /// True when resolving this definition needs no other entry of the schema.
    pub fn is_self_contained(&self) -> bool {
        self.parent().is_none() && self.extended_types().next().is_none()
    }

    /// Every type this definition depends on, `type` parent first.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.parent().into_iter().chain(self.extended_types())
    }

    /// Copies `base` and lays this definition's fields over it.
    ///
    /// A field this definition declares wins, even when its value is `null`;
    /// fields it leaves out fall back to `base`. The `properties` map is taken
    /// from `self` as is; merging it with the ancestors is up to the resolver.
    pub fn overlay(&self, base: &Definition) -> Definition {
        let mut fields = base.fields.clone();
        fields.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));

        Definition {
            typ: self.typ.clone(),
            extends: self.extends.clone(),
            properties: self.properties.clone(),
            fields,
        }
    }
}

/// A mapping from type name to [`Definition`], kept in declaration order.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct Schema {
    definitions: IndexMap<String, Definition>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: Definition) -> Option<Definition> {
        self.definitions.insert(name.into(), definition)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.definitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Parses a JSON schema, either a bare mapping or one wrapped in `definitions`.
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(s)?;
        Ok(serde_json::from_value(unwrap_definitions(document))?)
    }

    /// Parses a TOML schema, either a bare table or one wrapped in `definitions`.
    pub fn from_toml_str(s: &str) -> Result<Self, SchemaError> {
        let document: Value = toml::from_str(s)?;
        Ok(serde_json::from_value(unwrap_definitions(document))?)
    }

    /// Loads a schema file, or a directory holding one definition per file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        if path.is_dir() {
            let mut schema = Schema::new();
            for result in parsedir::parse(path, SCHEMA_EXTENSIONS, parse_definition)? {
                let (name, definition) = result?;
                schema.insert(name, definition);
            }
            tracing::debug!("loaded {} definitions from {}", schema.len(), path.display());
            return Ok(schema);
        }

        let contents = fs::read_to_string(path)?;
        match extension(path) {
            Some("json") => Self::from_json_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => Err(SchemaError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl FromIterator<(String, Definition)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, Definition)>>(iter: I) -> Self {
        Schema {
            definitions: iter.into_iter().collect(),
        }
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|ext| ext.to_str())
}

fn parse_definition(path: &Path, contents: &str) -> Result<Definition, SchemaError> {
    match extension(path) {
        Some("json") => Ok(serde_json::from_str(contents)?),
        Some("toml") => Ok(toml::from_str(contents)?),
        _ => Err(SchemaError::UnsupportedFormat(path.to_path_buf())),
    }
}

// A document wraps its mapping in `definitions` unless `definitions` is itself a type.
fn unwrap_definitions(document: Value) -> Value {
    match document {
        Value::Object(mut map) => {
            let wrapped = map
                .get(DEFINITIONS_KEY)
                .and_then(Value::as_object)
                .is_some_and(|defs| !defs.contains_key("type"));
            if wrapped {
                map.remove(DEFINITIONS_KEY).unwrap_or_default()
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}
