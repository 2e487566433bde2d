// Per-decode scratch space for cross-field references.

use std::collections::HashMap;

use crate::error::DecodeError;
use crate::ident::ResourceLocation;
use crate::value::Value;

/// Join a scope path and a field name into a full entry path.
pub fn join_path(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{path}/{field}")
    }
}

/// The path of array element `index` under the array's own path.
pub fn element_path(array_path: &str, index: usize) -> String {
    format!("{array_path}[{index}]")
}

/// Strip the last path segment (either `/name` or `[index]`), yielding the
/// parent scope. Empty string is the root scope.
fn parent_scope(path: &str) -> Option<&str> {
    if path.is_empty() {
        return None;
    }
    let slash = path.rfind('/');
    let bracket = path.rfind('[');
    match (slash, bracket) {
        (None, None) => Some(""),
        (Some(s), None) => Some(&path[..s]),
        (None, Some(b)) => Some(&path[..b]),
        (Some(s), Some(b)) => Some(&path[..s.max(b)]),
    }
}

/// Mutable accumulator recording every field decoded so far in the current
/// packet, addressable by hierarchical path.
///
/// Wire formats place lengths, discriminators and presence flags in one
/// field and reference them structurally from a later field's type; the
/// schema expresses that declaratively (`"count": "propertyCount"`) and this
/// record resolves it at decode time. Field order in a container therefore
/// matters: a referencing field must be decoded after the field it
/// references. One record serves exactly one top-level packet decode.
#[derive(Debug, Default)]
pub struct PacketRecord {
    entries: HashMap<String, (ResourceLocation, Value)>,
    anon_counters: HashMap<String, u32>,
}

impl PacketRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a just-decoded value under `path/field_name`. Later reads at
    /// this path or below can resolve `field_name` by lookup.
    pub fn write_entry(
        &mut self,
        path: &str,
        field_name: &str,
        type_id: ResourceLocation,
        value: Value,
    ) {
        self.entries
            .insert(join_path(path, field_name), (type_id, value));
    }

    /// Record an array element under `path[index]`.
    pub fn write_element(
        &mut self,
        array_path: &str,
        index: usize,
        type_id: ResourceLocation,
        value: Value,
    ) {
        self.entries
            .insert(element_path(array_path, index), (type_id, value));
    }

    /// Look up `field_name` starting at `path`, walking ancestor scopes up
    /// to the root. Leading `../` segments in the name pop scopes before the
    /// walk starts.
    pub fn try_get_entry_value(&self, path: &str, field_name: &str) -> Option<&Value> {
        let mut scope = path;
        let mut name = field_name;
        while let Some(rest) = name.strip_prefix("../") {
            scope = parent_scope(scope)?;
            name = rest;
        }

        loop {
            if let Some((_, value)) = self.entries.get(&join_path(scope, name)) {
                return Some(value);
            }
            match parent_scope(scope) {
                Some(parent) => scope = parent,
                None => return None,
            }
        }
    }

    /// Like [`try_get_entry_value`](Self::try_get_entry_value) but fails the
    /// decode with a descriptive error when the field was never written.
    pub fn get_reference(&self, path: &str, field_name: &str) -> Result<&Value, DecodeError> {
        self.try_get_entry_value(path, field_name)
            .ok_or_else(|| DecodeError::MissingReferenceField {
                path: path.to_string(),
                field: field_name.to_string(),
            })
    }

    /// Next synthetic name for an unnamed container field at this scope,
    /// guaranteed not to collide with explicitly named siblings.
    pub fn next_anonymous_name(&mut self, path: &str) -> String {
        loop {
            let counter = self.anon_counters.entry(path.to_string()).or_insert(0);
            let candidate = format!("anon_{counter}");
            *counter += 1;
            if !self.entries.contains_key(&join_path(path, &candidate)) {
                return candidate;
            }
        }
    }
}
