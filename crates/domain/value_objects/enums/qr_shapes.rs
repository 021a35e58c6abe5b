use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QrShape {
    #[default]
    Square,
    Circle,
}

impl QrShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrShape::Square => "square",
            QrShape::Circle => "circle",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "square" => Some(QrShape::Square),
            "circle" => Some(QrShape::Circle),
            _ => None,
        }
    }
}

impl Display for QrShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
