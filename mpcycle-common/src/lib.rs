pub mod duration;
pub mod error;

pub use duration::{format_duration, parse_duration};
pub use error::{ErrorReporting, MpcycleError, Result};

/// How slot positions are derived before the first rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arrangement {
    #[default]
    #[serde(alias = "")]
    None,   // Every window carries its own position
    Row,    // Windows stacked left to right
    Column, // Windows stacked top to bottom
}

impl std::fmt::Display for Arrangement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arrangement::None => write!(f, "none"),
            Arrangement::Row => write!(f, "row"),
            Arrangement::Column => write!(f, "column"),
        }
    }
}
