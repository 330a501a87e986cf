//! Server descriptors: the operator-facing config and its validated form.

use std::fmt;

use pairsync_protocol::{Priority, ProtocolVersion, ServerIndex, SessionKind};
use serde::{Deserialize, Serialize};

use crate::RegistryError;

// ---------------------------------------------------------------------------
// CredentialRef
// ---------------------------------------------------------------------------

/// Opaque handle naming a credential held elsewhere.
///
/// The registry never sees the secret itself; the session resolves the
/// handle to a token right before the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// DescriptorConfig
// ---------------------------------------------------------------------------

/// Alternate endpoints for a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointOverrides {
    /// Dial this URI instead of the descriptor's `uri`.
    #[serde(default)]
    pub hub_uri: Option<String>,
}

/// A server as the operator configures it.
///
/// Everything except `uri` and `credential` has a default, so the
/// smallest valid JSON entry is
/// `{ "uri": "wss://sync.example/hub", "credential": "main" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorConfig {
    /// Where the server lives, e.g. `wss://sync.example/hub`.
    pub uri: String,

    /// Rank used when two servers want to write the same entity.
    #[serde(default)]
    pub priority: Priority,

    /// Which stored credential to present in the handshake.
    pub credential: CredentialRef,

    /// Display name. Defaults to the URI.
    #[serde(default)]
    pub name: Option<String>,

    /// Disabled servers stay registered but are skipped by connect-all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Pins the session protocol version. Defaults to the newest one.
    #[serde(default)]
    pub protocol: Option<ProtocolVersion>,

    #[serde(default)]
    pub overrides: EndpointOverrides,
}

fn default_enabled() -> bool {
    true
}

impl DescriptorConfig {
    /// Creates an enabled, priority-0 config for `uri`.
    pub fn new(uri: impl Into<String>, credential: CredentialRef) -> Self {
        Self {
            uri: uri.into(),
            priority: Priority::default(),
            credential,
            name: None,
            enabled: true,
            protocol: None,
            overrides: EndpointOverrides::default(),
        }
    }

    /// Sets the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = Priority(priority);
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pins the protocol version.
    pub fn protocol(mut self, version: u32) -> Self {
        self.protocol = Some(ProtocolVersion(version));
        self
    }

    /// Registers the server as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Checks the config and resolves its session kind.
    ///
    /// # Errors
    /// [`RegistryError::InvalidDescriptor`] for a malformed URI (or hub
    /// override) or a protocol version this client cannot speak.
    pub fn validate(&self) -> Result<&'static SessionKind, RegistryError> {
        validate_uri(&self.uri)?;
        if let Some(hub) = &self.overrides.hub_uri {
            validate_uri(hub)?;
        }

        match self.protocol {
            None => Ok(SessionKind::latest()),
            Some(version) => SessionKind::for_version(version).ok_or_else(|| {
                RegistryError::InvalidDescriptor(format!(
                    "unsupported protocol version {version}"
                ))
            }),
        }
    }

    /// Validates and turns the config into a descriptor with `index`.
    pub(crate) fn into_descriptor(
        self,
        index: ServerIndex,
    ) -> Result<ServerDescriptor, RegistryError> {
        let kind = self.validate()?;
        Ok(ServerDescriptor {
            index,
            name: self.name.unwrap_or_else(|| self.uri.clone()),
            uri: self.uri,
            priority: self.priority,
            credential: self.credential,
            enabled: self.enabled,
            kind,
            overrides: self.overrides,
        })
    }
}

/// Accepts `scheme://rest` where the scheme starts with a letter and
/// only contains letters, digits, `+`, `-` or `.`.
fn validate_uri(uri: &str) -> Result<(), RegistryError> {
    let invalid = |why: &str| {
        RegistryError::InvalidDescriptor(format!("uri {uri:?} {why}"))
    };

    let trimmed = uri.trim();
    if trimmed.is_empty() {
        return Err(invalid("is empty"));
    }
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| invalid("has no scheme"))?;

    let scheme_ok = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(invalid("has a malformed scheme"));
    }
    if rest.is_empty() {
        return Err(invalid("has no host"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ServerDescriptor
// ---------------------------------------------------------------------------

/// A registered server.
///
/// Only `priority` and `enabled` change after registration, and only
/// through [`ServerRegistry`](crate::ServerRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub index: ServerIndex,
    pub name: String,
    pub uri: String,
    pub priority: Priority,
    pub credential: CredentialRef,
    pub enabled: bool,
    /// Protocol version and capabilities the session will use.
    pub kind: &'static SessionKind,
    pub overrides: EndpointOverrides,
}

impl ServerDescriptor {
    /// The URI a session actually dials.
    pub fn connect_uri(&self) -> &str {
        self.overrides.hub_uri.as_deref().unwrap_or(&self.uri)
    }
}
