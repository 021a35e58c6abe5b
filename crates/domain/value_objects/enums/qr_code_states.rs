use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a QR code as seen by its owner at a point in time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QrCodeState {
    /// Usable right now.
    Active,
    /// Deadline passed. Free codes cannot be renewed from here.
    Expired,
    /// Deactivated, or premium without entitling billing.
    Inactive,
}

impl Display for QrCodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            QrCodeState::Active => "active",
            QrCodeState::Expired => "expired",
            QrCodeState::Inactive => "inactive",
        };
        write!(f, "{}", state)
    }
}
