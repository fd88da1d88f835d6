use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("invalid IPv4 address '{value}'")]
    InvalidAddress { value: String },
}
