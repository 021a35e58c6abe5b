use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QrType {
    Free,
    Premium,
}

impl QrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrType::Free => "free",
            QrType::Premium => "premium",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "free" => Some(QrType::Free),
            "premium" => Some(QrType::Premium),
            _ => None,
        }
    }
}

impl Display for QrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
