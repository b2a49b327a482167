//! Error types for component resolution and registration

use std::any::TypeId;
use thiserror::Error;

use crate::component::Capability;

/// Errors surfaced by registration and resolution operations
#[derive(Error, Debug, Clone)]
pub enum InjectError {
    /// A registration's capability set could not be accepted
    #[error("invalid registration: {reason}")]
    Configuration { reason: String },

    /// No cached component and no factory anywhere in the active scope chain
    #[error("component not registered: {type_name}")]
    Unregistered {
        type_name: &'static str,
        type_id: TypeId,
    },

    /// A deferred factory was reached through the synchronous resolution path
    #[error("deferred factory for {type_name} invoked synchronously; use get_component_async")]
    Usage { type_name: &'static str },
}

impl InjectError {
    /// Create an Unregistered error for a capability
    #[inline]
    pub fn unregistered<K: ?Sized + Capability>() -> Self {
        Self::Unregistered {
            type_name: K::name(),
            type_id: K::key(),
        }
    }

    /// Create a Usage error for a deferred factory hit synchronously
    #[inline]
    pub fn deferred_in_sync<K: ?Sized + Capability>() -> Self {
        Self::Usage {
            type_name: K::name(),
        }
    }

    /// Create a Configuration error
    #[inline]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }
}

/// Result type alias for injector operations
pub type Result<T> = std::result::Result<T, InjectError>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Widget;

    #[test]
    fn unregistered_carries_type_info() {
        let err = InjectError::unregistered::<Widget>();
        match err {
            InjectError::Unregistered { type_name, type_id } => {
                assert!(type_name.ends_with("Widget"));
                assert_eq!(type_id, TypeId::of::<Widget>());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_messages_name_the_type() {
        let msg = InjectError::deferred_in_sync::<Widget>().to_string();
        assert!(msg.contains("Widget"));
        assert!(msg.contains("get_component_async"));
    }
}
