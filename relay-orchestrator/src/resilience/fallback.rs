//! Tagging of locally computed substitutes

/// Value produced by a capability that has a local approximation
///
/// Consumers must be able to tell a degraded answer from a real one, so the
/// fallback variant keeps the reason the real call did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum Serviced<T> {
    Full(T),
    Fallback { value: T, reason: String },
}

impl<T> Serviced<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Serviced::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Serviced::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Serviced::Full(value) | Serviced::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Serviced::Full(value) | Serviced::Fallback { value, .. } => value,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Serviced::Full(_) => None,
            Serviced::Fallback { reason, .. } => Some(reason),
        }
    }
}
