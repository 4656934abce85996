// src/health/registry.rs
use super::outcome::DependencyName;
use super::probe::DependencyProbe;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dependency `{0}` is registered more than once")]
    Duplicate(String),

    #[error("invalid dependency name `{0}`: expected [a-zA-Z_][a-zA-Z0-9_]*")]
    InvalidName(String),
}

#[derive(Clone)]
pub struct ProbeEntry {
    pub name: DependencyName,
    pub probe: Arc<dyn DependencyProbe>,
}

impl std::fmt::Debug for ProbeEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeEntry")
            .field("name", &self.name)
            .field("kind", &self.probe.kind())
            .finish()
    }
}

/// Ordered, immutable set of probes. Built once at startup.
#[derive(Debug, Default)]
pub struct ProbeRegistry {
    entries: Vec<ProbeEntry>,
}

impl ProbeRegistry {
    pub fn builder() -> ProbeRegistryBuilder {
        ProbeRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries in registration order.
    pub fn list(&self) -> &[ProbeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &DependencyName> {
        self.entries.iter().map(|entry| &entry.name)
    }
}

#[derive(Default)]
pub struct ProbeRegistryBuilder {
    entries: Vec<ProbeEntry>,
}

impl ProbeRegistryBuilder {
    pub fn register<P>(self, name: &str, probe: P) -> Self
    where
        P: DependencyProbe + 'static,
    {
        self.register_arc(name, Arc::new(probe))
    }

    pub fn register_arc(mut self, name: &str, probe: Arc<dyn DependencyProbe>) -> Self {
        self.entries.push(ProbeEntry {
            name: DependencyName::new(name),
            probe,
        });
        self
    }

    /// Validates names and freezes the registry.
    ///
    /// Names end up inside metric names, so they follow the same charset.
    pub fn build(self) -> Result<ProbeRegistry, RegistryError> {
        let mut seen = HashSet::with_capacity(self.entries.len());

        for entry in &self.entries {
            let name = entry.name.as_str();
            if !is_valid_name(name) {
                return Err(RegistryError::InvalidName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(RegistryError::Duplicate(name.to_string()));
            }
        }

        Ok(ProbeRegistry {
            entries: self.entries,
        })
    }
}

/// True when `name` can be embedded in an exposition metric name.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
