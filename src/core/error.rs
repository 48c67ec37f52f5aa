use thiserror::Error;

use crate::core::types::Tick;
use crate::entity::needs::NeedKind;

#[derive(Error, Debug)]
pub enum ArcError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Need {0:?} is referenced but has no configuration entry")]
    UnknownNeed(NeedKind),

    #[error("Tick went backwards: current {current}, requested {requested}")]
    TickRegression { current: Tick, requested: Tick },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ArcError>;
