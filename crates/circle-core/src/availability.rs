//! Username availability tri-state.

use serde::{Deserialize, Serialize};

/// Result of asking the backend whether a username is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsernameAvailability {
    /// No profile uses this name.
    Available,
    /// A profile already uses this name.
    Taken,
    /// The lookup failed; nothing is known about the name.
    Unknown,
}

impl UsernameAvailability {
    /// Whether the name may be claimed.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// `Some(true)` / `Some(false)` for a resolved lookup, `None` for `Unknown`.
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Self::Available => Some(true),
            Self::Taken => Some(false),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for UsernameAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Taken => "taken",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_available_is_claimable() {
        assert!(UsernameAvailability::Available.is_available());
        assert!(!UsernameAvailability::Taken.is_available());
        assert!(!UsernameAvailability::Unknown.is_available());
    }

    #[test]
    fn unknown_maps_to_none() {
        assert_eq!(UsernameAvailability::Available.as_option(), Some(true));
        assert_eq!(UsernameAvailability::Taken.as_option(), Some(false));
        assert_eq!(UsernameAvailability::Unknown.as_option(), None);
    }
}
