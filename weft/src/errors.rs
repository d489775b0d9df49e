//! Error types for the weft engine.
//!
//! Two families live here. [`BuildError`] is raised synchronously while a
//! pipeline is being assembled and never reaches execution. [`Fault`] is the
//! structured runtime failure that flows through error chains, `catch`
//! interceptors, and out to the caller of a failed run.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::Value;

/// Classification tag carried by every [`Fault`].
///
/// The engine only ever produces [`FaultKind::Fault`] on its own; the other
/// variants exist so that handlers and `catch` patterns can classify and
/// select failures. [`FaultKind::Handled`] is conventionally applied by a
/// handler that consumed a failure and wants downstream observers to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultKind {
    /// Default classification for any otherwise-unclassified failure.
    Fault,
    /// A malformed step declaration (build time only).
    InvalidStep,
    /// Options failed structural validation (build time only).
    InvalidConfig,
    /// A failure that was matched and consumed by a recovery handler.
    Handled,
    /// A user-defined classification tag.
    #[serde(untagged)]
    Tag(String),
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fault => write!(f, "fault"),
            Self::InvalidStep => write!(f, "invalid-step"),
            Self::InvalidConfig => write!(f, "invalid-config"),
            Self::Handled => write!(f, "handled"),
            Self::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

/// A structured runtime failure.
///
/// A fault carries enough state to diagnose a failed run without re-running
/// it: the classification, the id of the failing action, the threaded value
/// as of that action, an arbitrary structured payload for tag-matched
/// handlers, and the original cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Fault {
    /// The error classification.
    pub kind: FaultKind,
    /// Id of the failing action, once attributed by the runner.
    pub step: Option<String>,
    /// The threaded value as of the failing action.
    pub context: Option<Value>,
    /// Structured payload handed to tag-matched `catch` handlers.
    pub data: Value,
    /// Human-readable description.
    pub message: String,
    /// The originating error, when the fault wraps one.
    ///
    /// Kept behind an `Arc` so faults stay cheaply cloneable through
    /// recovery chains. Inspect it with [`Fault::cause_ref`] or
    /// [`Fault::cause_is`].
    pub cause: Option<Arc<anyhow::Error>>,
}

impl Fault {
    /// Creates a fault with an explicit classification.
    #[must_use]
    pub fn of_kind(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            step: None,
            context: None,
            data: Value::Null,
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a default-classified fault.
    #[must_use]
    pub fn fault(message: impl Into<String>) -> Self {
        Self::of_kind(FaultKind::Fault, message)
    }

    /// Creates a fault with a user-defined classification tag.
    #[must_use]
    pub fn tagged(tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self::of_kind(FaultKind::Tag(tag.into()), message)
    }

    /// Wraps an arbitrary error as a default-classified fault, preserving it
    /// as the cause.
    #[must_use]
    pub fn from_error(error: anyhow::Error) -> Self {
        let message = error.to_string();
        Self {
            cause: Some(Arc::new(error)),
            ..Self::fault(message)
        }
    }

    /// Sets the failing action id.
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Sets the threaded value as of the failure.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Sets the structured payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Replaces the classification.
    #[must_use]
    pub fn with_kind(mut self, kind: FaultKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns true when the cause chain bottoms out at an `E`.
    #[must_use]
    pub fn cause_is<E>(&self) -> bool
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause_ref::<E>().is_some()
    }

    /// Downcasts the cause to a concrete error type.
    #[must_use]
    pub fn cause_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause.as_deref().and_then(anyhow::Error::downcast_ref)
    }

    /// Serializes the fault into a JSON envelope for logging and diagnosis.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut envelope = serde_json::Map::new();
        envelope.insert("kind".to_string(), serde_json::json!(self.kind.to_string()));
        envelope.insert("message".to_string(), serde_json::json!(self.message));
        if let Some(ref step) = self.step {
            envelope.insert("step".to_string(), serde_json::json!(step));
        }
        if let Some(ref context) = self.context {
            envelope.insert("context".to_string(), context.clone());
        }
        if !self.data.is_null() {
            envelope.insert("data".to_string(), self.data.clone());
        }
        Value::Object(envelope)
    }
}

/// Error raised while assembling a pipeline.
///
/// Build errors are synchronous and stop construction before any
/// asynchronous work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A step declaration was structurally invalid.
    #[error("invalid step: {reason}")]
    InvalidStep {
        /// What was wrong with the declaration.
        reason: String,
    },

    /// Run options failed structural validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What was wrong with the options.
        reason: String,
    },
}

impl BuildError {
    /// Creates an invalid-step error.
    #[must_use]
    pub fn invalid_step(reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            reason: reason.into(),
        }
    }

    /// Creates an invalid-configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Converts the build error into an equivalently-classified fault.
    #[must_use]
    pub fn into_fault(self) -> Fault {
        let kind = match self {
            Self::InvalidStep { .. } => FaultKind::InvalidStep,
            Self::InvalidConfig { .. } => FaultKind::InvalidConfig,
        };
        Fault::of_kind(kind, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fault_kind_display() {
        assert_eq!(FaultKind::Fault.to_string(), "fault");
        assert_eq!(FaultKind::InvalidStep.to_string(), "invalid-step");
        assert_eq!(FaultKind::Tag("timeout".to_string()).to_string(), "timeout");
    }

    #[test]
    fn fault_builders() {
        let fault = Fault::tagged("db", "connection refused")
            .with_step("load")
            .with_context(serde_json::json!({"retries": 2}))
            .with_data(serde_json::json!({"host": "localhost"}));

        assert_eq!(fault.kind, FaultKind::Tag("db".to_string()));
        assert_eq!(fault.step.as_deref(), Some("load"));
        assert_eq!(fault.message, "connection refused");
        assert_eq!(fault.data["host"], "localhost");
    }

    #[test]
    fn fault_cause_downcast() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let fault = Fault::from_error(anyhow::Error::new(io));

        assert!(fault.cause_is::<std::io::Error>());
        assert!(!fault.cause_is::<std::fmt::Error>());
        assert_eq!(
            fault.cause_ref::<std::io::Error>().map(std::io::Error::kind),
            Some(std::io::ErrorKind::NotFound)
        );
    }

    #[test]
    fn fault_clone_shares_cause() {
        let fault = Fault::from_error(anyhow::anyhow!("boom"));
        let cloned = fault.clone();
        assert!(cloned.cause.is_some());
        assert_eq!(cloned.message, "boom");
    }

    #[test]
    fn fault_envelope() {
        let fault = Fault::fault("exploded")
            .with_step("detonate")
            .with_context(serde_json::json!(41));

        let envelope = fault.to_value();
        assert_eq!(envelope["kind"], "fault");
        assert_eq!(envelope["step"], "detonate");
        assert_eq!(envelope["context"], 41);
        assert!(envelope.get("data").is_none());
    }

    #[test]
    fn build_error_into_fault() {
        let fault = BuildError::invalid_step("no handlers").into_fault();
        assert_eq!(fault.kind, FaultKind::InvalidStep);
        assert!(fault.message.contains("no handlers"));

        let fault = BuildError::invalid_config("empty stages").into_fault();
        assert_eq!(fault.kind, FaultKind::InvalidConfig);
    }
}
