//! The server registry: an append-only list with tombstones.

use pairsync_protocol::{Priority, ServerIndex};

use crate::{DescriptorConfig, RegistryError, ServerDescriptor};

/// Ordered list of registered servers.
///
/// Indices are positions in `slots`. Removing a server leaves a `None`
/// tombstone behind so the index is never handed out again.
///
/// Like the other registries in this workspace this is a plain owned
/// value with `&mut self` mutators; callers that share it wrap it in a
/// lock at a higher level.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    slots: Vec<Option<ServerDescriptor>>,
}

impl ServerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from configs, in order.
    ///
    /// # Errors
    /// Fails on the first invalid descriptor; nothing is kept in that case.
    pub fn from_configs(
        configs: impl IntoIterator<Item = DescriptorConfig>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for config in configs {
            registry.add(config)?;
        }
        Ok(registry)
    }

    /// Validates `config` and registers it under the next unused index.
    ///
    /// # Errors
    /// [`RegistryError::InvalidDescriptor`] if validation fails. The
    /// index is not consumed in that case.
    pub fn add(&mut self, config: DescriptorConfig) -> Result<ServerIndex, RegistryError> {
        let raw = u32::try_from(self.slots.len()).map_err(|_| {
            RegistryError::InvalidDescriptor("server index space exhausted".into())
        })?;
        let index = ServerIndex(raw);

        let descriptor = config.into_descriptor(index)?;
        tracing::info!(
            server = %index,
            uri = %descriptor.uri,
            priority = %descriptor.priority,
            "server registered"
        );
        self.slots.push(Some(descriptor));
        Ok(index)
    }

    /// Tombstones `index` and returns the removed descriptor.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] if the index is unknown or already removed.
    pub fn remove(&mut self, index: ServerIndex) -> Result<ServerDescriptor, RegistryError> {
        let removed = self
            .slots
            .get_mut(index.0 as usize)
            .and_then(Option::take)
            .ok_or(RegistryError::NotFound(index))?;
        tracing::info!(server = %index, "server removed");
        Ok(removed)
    }

    /// Looks up a live descriptor.
    pub fn get(&self, index: ServerIndex) -> Result<&ServerDescriptor, RegistryError> {
        self.slots
            .get(index.0 as usize)
            .and_then(Option::as_ref)
            .ok_or(RegistryError::NotFound(index))
    }

    /// Changes a server's priority and returns the previous value.
    ///
    /// Locks already granted keep the priority they were granted at;
    /// only future arbitration requests see the new value.
    pub fn set_priority(
        &mut self,
        index: ServerIndex,
        priority: Priority,
    ) -> Result<Priority, RegistryError> {
        let descriptor = self.get_mut(index)?;
        let previous = std::mem::replace(&mut descriptor.priority, priority);
        tracing::info!(server = %index, %previous, %priority, "priority changed");
        Ok(previous)
    }

    /// Enables or disables a server and returns the previous flag.
    pub fn set_enabled(
        &mut self,
        index: ServerIndex,
        enabled: bool,
    ) -> Result<bool, RegistryError> {
        let descriptor = self.get_mut(index)?;
        let previous = std::mem::replace(&mut descriptor.enabled, enabled);
        tracing::debug!(server = %index, enabled, "enabled flag changed");
        Ok(previous)
    }

    /// Snapshot of every live descriptor, in index order.
    pub fn list(&self) -> Vec<ServerDescriptor> {
        self.slots.iter().flatten().cloned().collect()
    }

    /// Live descriptors that are enabled, in index order.
    pub fn enabled(&self) -> impl Iterator<Item = &ServerDescriptor> {
        self.slots.iter().flatten().filter(|d| d.enabled)
    }

    /// Number of live (non-removed) servers.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Returns `true` if no live servers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_mut(&mut self, index: ServerIndex) -> Result<&mut ServerDescriptor, RegistryError> {
        self.slots
            .get_mut(index.0 as usize)
            .and_then(Option::as_mut)
            .ok_or(RegistryError::NotFound(index))
    }
}
