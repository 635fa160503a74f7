//! Error taxonomy for the zpair core.
//!
//! Configuration errors are fatal at startup. Data-availability and venue
//! errors raised while processing a single pair are caught by the runner and
//! logged. [`Error::OutOfData`] is the normal end of a backtest replay.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("empty input: {0} requires at least one value")]
    EmptyInput(&'static str),

    #[error("not enough historical bars for {symbol}: expected {required}, got {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("historical series lengths do not match: long={long}, short={short}")]
    SeriesLengthMismatch { long: usize, short: usize },

    #[error("no price available for symbol {0}")]
    PriceUnavailable(String),

    #[error("cannot size position for {0} with zero price")]
    ZeroPrice(String),

    #[error("missing bar data for symbols: {}", .0.join(", "))]
    MissingSymbolData(Vec<String>),

    #[error("order quantity must be positive, got {0}")]
    InvalidQuantity(f64),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("cannot cancel order {0}: already filled")]
    OrderNotCancelable(String),

    #[error("backtest has not been started; call step() first")]
    NotStarted,

    #[error("no more bars available in backtest data")]
    OutOfData,

    #[error("data error: {0}")]
    Data(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn is_out_of_data(&self) -> bool {
        matches!(self, Error::OutOfData)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
