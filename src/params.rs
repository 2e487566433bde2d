// Deferred construction parameters for template type definitions.

use std::collections::HashMap;

use serde_json::Value as Json;
use tracing::warn;

/// Construction parameters of a parameterized type, split into literal
/// values and named placeholders still waiting for an inheriting type to
/// supply them.
///
/// Schemas declare partial templates (`"countType": "$cType"`) to cut down
/// repetition; a later definition extends the template and fills the hole,
/// possibly with another placeholder, chainably. A handler that still has
/// unresolved placeholders is an inert template: it exists only to be
/// inherited from, and invoking its decode path must fail fast.
#[derive(Debug, Clone, Default)]
pub struct TypeParams {
    /// parameter name -> placeholder name it is waiting on
    unresolved: HashMap<String, String>,
    /// parameter name -> literal JSON value
    resolved: HashMap<String, Json>,
}

fn as_placeholder(value: &Json) -> Option<&str> {
    value.as_str().and_then(|s| s.strip_prefix('$'))
}

impl TypeParams {
    /// Build a parameter set from a template (if any) plus newly supplied
    /// parameters, per the inheritance rules:
    ///
    /// 1. the template's resolved and unresolved sets carry forward;
    /// 2. a supplied name matching an inherited placeholder resolves that
    ///    placeholder (or re-points it at a new placeholder, extending the
    ///    chain);
    /// 3. a recognized parameter name is stored directly;
    /// 4. anything else is kept but flagged as unexpected (non-fatal, for
    ///    forward compatibility with schema fields the engine doesn't use).
    pub fn inherit(
        template: Option<&TypeParams>,
        recognized: &[&str],
        supplied: &serde_json::Map<String, Json>,
    ) -> TypeParams {
        let mut params = template.cloned().unwrap_or_default();

        for (name, value) in supplied {
            // Parameters waiting on a placeholder with this name.
            let waiting: Vec<String> = params
                .unresolved
                .iter()
                .filter(|(_, placeholder)| *placeholder == name)
                .map(|(param, _)| param.clone())
                .collect();

            if !waiting.is_empty() {
                for param in waiting {
                    params.unresolved.remove(&param);
                    params.set(param, value);
                }
                continue;
            }

            if !recognized.contains(&name.as_str()) {
                warn!(parameter = %name, "unexpected type parameter, keeping as-is");
            }
            params.set(name.clone(), value);
        }

        params
    }

    fn set(&mut self, name: String, value: &Json) {
        match as_placeholder(value) {
            Some(placeholder) => {
                self.resolved.remove(&name);
                self.unresolved.insert(name, placeholder.to_string());
            }
            None => {
                self.unresolved.remove(&name);
                self.resolved.insert(name, value.clone());
            }
        }
    }

    /// A resolved parameter's literal value.
    pub fn get(&self, name: &str) -> Option<&Json> {
        self.resolved.get(name)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }

    /// Names of parameters still waiting on placeholders, sorted for stable
    /// error messages.
    pub fn unresolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.unresolved.keys().cloned().collect();
        names.sort();
        names
    }
}
