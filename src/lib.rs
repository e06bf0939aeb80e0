pub mod api;
pub mod cart;
pub mod catalog;
pub mod configuration;
pub mod orders;
pub mod pricing;
pub mod quotation;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Config Error:{0}")]
    ConfigError(String),

    #[error("Persistence error")]
    PersistenceError,
}
