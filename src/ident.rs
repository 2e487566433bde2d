// Namespaced type identifiers, used as registry keys.

use std::fmt;

/// A namespaced identifier (`namespace:path`) naming a logical packet type.
///
/// Protocol documents register types inside nested namespaces
/// (e.g. `play/toClient`), while native types live in the global namespace
/// (empty string). Equality and hashing cover both components.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceLocation {
    namespace: String,
    path: String,
}

impl ResourceLocation {
    /// A type id in the global namespace.
    pub fn global(path: impl Into<String>) -> Self {
        Self {
            namespace: String::new(),
            path: path.into(),
        }
    }

    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            path: path.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}:{}", self.namespace, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_covers_namespace_and_path() {
        assert_eq!(ResourceLocation::global("varint"), ResourceLocation::global("varint"));
        assert_ne!(
            ResourceLocation::global("packet"),
            ResourceLocation::new("play/toClient", "packet")
        );
    }

    #[test]
    fn display_elides_global_namespace() {
        assert_eq!(ResourceLocation::global("varint").to_string(), "varint");
        assert_eq!(
            ResourceLocation::new("play/toClient", "packet").to_string(),
            "play/toClient:packet"
        );
    }
}
