use std::num::ParseIntError;
use std::str::ParseBoolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemuxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("parser error: {0}")]
    Parser(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("no MPEG-TS sync pattern found in buffer")]
    NoSyncFound,

    #[error("no ADTS header found in AAC PES")]
    NoAdtsHeader,

    #[error("sample decryption failed: {0}")]
    Decrypt(String),

    #[error("parse int error: {0}")]
    ParseInt(#[from] ParseIntError),

    #[error("parse bool error: {0}")]
    ParseBool(#[from] ParseBoolError),
}

pub type Result<T> = std::result::Result<T, DemuxError>;
