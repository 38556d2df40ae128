//! Version registry.
//!
//! The current cache generation is fixed for the lifetime of the process.
//! Replacing it at deploy time is the only way to make every client drop
//! previously cached data: the store named after the old generation no
//! longer matches and is collected on the next activation.

use std::fmt;

/// Generation baked in at build time, used when configuration does not override it.
pub const BUILD_GENERATION: &str = match option_env!("SKYCACHE_GENERATION") {
    Some(g) => g,
    None => "v1.0.1",
};

/// An opaque cache generation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation(String);

impl Generation {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::new(BUILD_GENERATION)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only holder of the current generation and the live store name.
#[derive(Debug, Clone)]
pub struct VersionRegistry {
    generation: Generation,
    store_name: String,
}

impl VersionRegistry {
    /// Build the registry; with a prefix the store is named `<prefix>-<generation>`.
    pub fn new(generation: Generation, prefix: Option<&str>) -> Self {
        let store_name = match prefix.map(str::trim).filter(|p| !p.is_empty()) {
            Some(p) => format!("{p}-{generation}"),
            None => generation.to_string(),
        };
        Self { generation, store_name }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Name of the live store.
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Whether `name` is the live store.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.store_name
    }
}
