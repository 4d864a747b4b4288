use thiserror::Error;

pub type BanditResult<T> = Result<T, BanditError>;

#[derive(Error, Debug)]
pub enum BanditError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Arm {index} does not exist (engine has {arms} arms)")]
    ArmOutOfRange { index: usize, arms: usize },

    #[error("Arm {0} has already been rated")]
    AlreadyRated(usize),

    #[error("Reward {reward} is outside the rating domain [{min}, {max}]")]
    RewardOutOfRange { reward: i32, min: i32, max: i32 },

    #[error("Feedback error: {0}")]
    Feedback(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BanditError {
    /// Caller-side programming errors. These end the run and are never retried.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            BanditError::ArmOutOfRange { .. }
                | BanditError::AlreadyRated(_)
                | BanditError::RewardOutOfRange { .. }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            BanditError::InvalidConfiguration(_) | BanditError::Config(_) | BanditError::Catalog(_)
        )
    }
}
