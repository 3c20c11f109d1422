//! JSON persistence for a single store's snapshot (spec §6): numbers map
//! to numbers, strings to strings, `nil` to `null`, arrays and objects
//! recurse; functions never persist and are not expected to appear here.

use std::fs;
use std::io;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::builtins::json::{json_to_value, value_to_json};
use crate::value::Value;

pub(super) fn save(path: &Path, entries: &IndexMap<String, Value>) -> io::Result<()> {
    let mut map = serde_json::Map::new();
    for (key, value) in entries {
        map.insert(key.clone(), value_to_json(value));
    }
    let text = serde_json::to_string_pretty(&Json::Object(map))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, text)
}

pub(super) fn load(path: &Path) -> io::Result<IndexMap<String, Value>> {
    let text = fs::read_to_string(path)?;
    let json: Json = serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let Json::Object(map) = json else {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "persisted datastore file is not a JSON object"));
    };
    let mut out = IndexMap::new();
    for (key, value) in map {
        out.insert(key, json_to_value(&value));
    }
    Ok(out)
}
