use crate::AddressFamily;
use std::{process::ExitStatus, string::FromUtf8Error};

pub type Result<T> = std::result::Result<T, Error>;

/// Various errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("platform not supported: {0}")]
    PlatformNotSupported(String),
    #[error("no command given")]
    EmptyCommand,
    #[error("failed to execute {command}: {source}")]
    CommandSpawn {
        command: String,
        source: std::io::Error,
    },
    #[error("failed to write input to {command}: {source}")]
    CommandStdin {
        command: String,
        source: std::io::Error,
    },
    #[error("{command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{command} output not UTF-8")]
    CommandUtf8 {
        command: String,
        source: FromUtf8Error,
    },
    #[error("{0} gateway not available")]
    GatewayNotAvailable(AddressFamily),
    #[error("default interface not found")]
    DefaultInterfaceNotFound,
    #[error("no available network")]
    NoAvailableNetwork,
    #[error("JSON parsing error: {0}")]
    OutputParse(#[from] serde_json::Error),
    #[error("device IP not found for {0}")]
    DeviceIpNotFound(String),
    #[error("netmask not found for {0}")]
    NetmaskNotFound(String),
    #[error("netmask not valid: {0}")]
    NetmaskNotValid(String),
    #[error("prefix length not found for {0}")]
    PrefixLengthNotFound(String),
    #[error("prefix length not valid: {0}")]
    PrefixLengthNotValid(u32),
    #[error("{addr:?} is not a valid {family} address")]
    InvalidAddress { addr: String, family: AddressFamily },
}
