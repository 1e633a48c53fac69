//! Startup-time workflow registry.
//!
//! The registry is an explicit object built once at process start from a
//! deterministically ordered registration list and then shared immutably
//! across workers. There is no global singleton and no import-time
//! discovery: what is registered is exactly what the startup list names.

use std::collections::BTreeMap;

use crate::workflow::config::WorkflowConfig;
use crate::workflow::error::{DefinitionError, EngineError};
use crate::workflow::machine::StateMachine;
use crate::workflow::types::WorkflowKind;

/// A registered workflow kind: its config and its paired machine.
#[derive(Debug, Clone)]
pub struct WorkflowEntry {
    /// Declarative configuration for the kind.
    pub config: WorkflowConfig,
    /// The validated state machine interpreting the kind's events.
    pub machine: StateMachine,
}

/// Write-once-at-startup map from workflow kind to its entry.
///
/// After construction the registry is never mutated; lookups are pure and
/// safe under concurrent access from multiple workers.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    entries: BTreeMap<WorkflowKind, WorkflowEntry>,
}

impl WorkflowRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind with its config and machine.
    ///
    /// # Errors
    ///
    /// Fails fatally, leaving the registry unchanged, when the kind is
    /// already registered or the config does not validate against the
    /// machine.
    pub fn register(
        &mut self,
        config: WorkflowConfig,
        machine: StateMachine,
    ) -> Result<(), DefinitionError> {
        config.validate_against(&machine)?;
        if self.entries.contains_key(&config.kind) {
            return Err(DefinitionError::DuplicateRegistration(
                config.kind.to_string(),
            ));
        }
        self.entries
            .insert(config.kind, WorkflowEntry { config, machine });
        Ok(())
    }

    /// Looks up a registered kind.
    ///
    /// # Errors
    ///
    /// Returns a retryable [`EngineError::MissingConfiguration`]: the kind
    /// is known to the enumeration, so a deploy registering it may land
    /// before redelivery.
    pub fn lookup(&self, kind: WorkflowKind) -> Result<&WorkflowEntry, EngineError> {
        self.entries
            .get(&kind)
            .ok_or_else(|| EngineError::MissingConfiguration(kind.to_string()))
    }

    /// Resolves a wire-format kind name to its registered entry.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`EngineError::UnknownWorkflowKind`] for
    /// names outside the enumeration (such an event can never become
    /// valid) and a retryable error for known-but-unregistered kinds.
    pub fn resolve(&self, kind: &str) -> Result<(WorkflowKind, &WorkflowEntry), EngineError> {
        let kind = WorkflowKind::parse(kind)
            .ok_or_else(|| EngineError::UnknownWorkflowKind(kind.to_string()))?;
        Ok((kind, self.lookup(kind)?))
    }

    /// Returns the registered kinds in deterministic order.
    pub fn kinds(&self) -> impl Iterator<Item = WorkflowKind> + '_ {
        self.entries.keys().copied()
    }

    /// Returns the number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
