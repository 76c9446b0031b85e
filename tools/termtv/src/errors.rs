use thiserror::Error;

#[derive(Debug, Error)]
pub enum TermtvError {
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid recording name: {0}")]
    InvalidName(String),
    #[error("cli error: {0}")]
    Cli(String),
    #[error("http error: {0}")]
    Http(String),
}
