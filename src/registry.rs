//! The probe registry: an immutable, ordered set of uniquely named probes.
//!
//! Built once at startup and shared read-only by every run.

use crate::config::ProbeConfig;
use crate::models::ProbeId;
use crate::probe::{build_probe, Probe, SecretSource};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

/// Invalid registry composition, detected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate probe id: {0}")]
    DuplicateId(ProbeId),

    #[error("probe at position {0} has an empty id")]
    EmptyId(usize),
}

/// A probe together with its identifier.
pub struct RegisteredProbe {
    pub id: ProbeId,
    pub probe: Box<dyn Probe>,
}

pub struct ProbeRegistry {
    entries: Vec<RegisteredProbe>,
}

impl ProbeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build the registry described by `[[probes]]` configuration entries.
    pub fn from_config(
        probes: &[ProbeConfig],
        client: &reqwest::Client,
        secrets: &dyn SecretSource,
    ) -> Result<Self, RegistryError> {
        probes
            .iter()
            .fold(Self::builder(), |builder, cfg| {
                debug!("Registering {} probe {}", cfg.kind(), cfg.id());
                builder.register_boxed(cfg.id(), build_probe(cfg, client, secrets))
            })
            .build()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProbe> {
        self.entries.iter()
    }

    /// Probe ids in registration order.
    pub fn ids(&self) -> Vec<&ProbeId> {
        self.entries.iter().map(|e| &e.id).collect()
    }

    pub fn contains(&self, id: &ProbeId) -> bool {
        self.entries.iter().any(|e| &e.id == id)
    }
}

/// Collects probes in order; uniqueness is checked by [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<RegisteredProbe>,
}

impl RegistryBuilder {
    pub fn register(self, id: impl Into<ProbeId>, probe: impl Probe + 'static) -> Self {
        self.register_boxed(id, Box::new(probe))
    }

    pub fn register_boxed(mut self, id: impl Into<ProbeId>, probe: Box<dyn Probe>) -> Self {
        self.entries.push(RegisteredProbe {
            id: id.into(),
            probe,
        });
        self
    }

    pub fn build(self) -> Result<ProbeRegistry, RegistryError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.id.as_str().trim().is_empty() {
                return Err(RegistryError::EmptyId(position));
            }
            if !seen.insert(&entry.id) {
                return Err(RegistryError::DuplicateId(entry.id.clone()));
            }
        }

        Ok(ProbeRegistry {
            entries: self.entries,
        })
    }
}
