//! Ordered, overridable configuration layers.
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::Path,
};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::LayerLoadError;

/// One source of key/value pairs. Values may still hold `%{token}` markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer(BTreeMap<String, String>);

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a layer from a JSON object.
    ///
    /// Strings load verbatim, numbers and booleans as their JSON text. `null`
    /// marks a declared but unset key and is skipped, as are nested values.
    pub fn from_json_object(object: &Map<String, Value>) -> Self {
        object
            .iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null | Value::Array(_) | Value::Object(_) => return None,
                };
                Some((key.clone(), value))
            })
            .collect()
    }

    /// Reads a JSON object file as a layer.
    pub fn from_json_file(path: &Path) -> Result<Self, LayerLoadError> {
        let content = fs::read_to_string(path).map_err(|source| LayerLoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value =
            serde_json::from_str(&content).map_err(|source| LayerLoadError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        match value {
            Value::Object(object) => Ok(Self::from_json_object(&object)),
            _ => Err(LayerLoadError::NotAnObject(path.to_path_buf())),
        }
    }

    /// Reads a JSON object file, treating any failure as an empty layer.
    pub fn graceful(path: &Path) -> Self {
        match Self::from_json_file(path) {
            Ok(layer) => layer,
            Err(err) => {
                debug!("Using empty config layer: {err}");
                Self::default()
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Layer {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for Layer {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

/// A stack of layers where later loads take precedence over earlier ones.
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    layers: Vec<Layer>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer on top of everything loaded so far.
    pub fn load(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Every key any layer defines, once each, in first-seen order.
    pub fn keys(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.layers
            .iter()
            .flat_map(Layer::keys)
            .filter(|key| seen.insert(*key))
            .collect()
    }

    /// The value from the most recently loaded layer that defines `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.layers.iter().rev().find_map(|layer| layer.get(key))
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}
