use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlarmqError {
    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid alarm spec: {0}")]
    InvalidAlarm(String),
}
