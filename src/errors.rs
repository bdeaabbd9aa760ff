//! Errors raised by the bond depository.
//!
//! The pricing, note and overlay modules return these as `Result`s so they can be exercised
//! off-ledger. The blueprint turns any `Err` into a ledger panic through [`OrAbort`], which
//! aborts the whole transaction and leaves no partial state behind.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondError {
    /// Non-positive capacity, price or intervals, or a conclusion that is already in the past.
    #[error("Depository: invalid market parameters")]
    InvalidMarketParameters,

    /// Deposit after conclusion, or into a closed or exhausted market.
    #[error("Depository: market concluded")]
    MarketConcluded,

    #[error("Depository: more than max price")]
    SlippageExceeded,

    /// Payout above the per-interval cap, above remaining capacity, or priced at zero.
    #[error("Depository: max size exceeded")]
    MaxSizeExceeded,

    /// Negative reward rate, or front-end and DAO rates summing above one.
    #[error("Depository: invalid reward rates")]
    InvalidRewardRates,

    #[error("Depository: unauthorized")]
    Unauthorized,

    /// Redemption referenced a note slot that does not exist.
    #[error("Depository: invalid note index")]
    InvalidIndex,

    #[error("Depository: unknown market")]
    UnknownMarket,

    #[error("Depository: unknown bond account")]
    UnknownAccount,

    #[error("Depository: wrong quote token")]
    WrongQuoteToken,

    #[error("Depository: not a leverage market")]
    NotLeverageMarket,

    #[error("Depository: math overflow")]
    MathOverflow,
}

/// Unwraps a depository result inside a blueprint method, panicking with the error message.
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T> OrAbort<T> for Result<T, BondError> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(error) => panic!("{}", error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_depository_prefix() {
        assert_eq!(BondError::MaxSizeExceeded.to_string(), "Depository: max size exceeded");
        assert_eq!(BondError::MarketConcluded.to_string(), "Depository: market concluded");
        assert_eq!(BondError::Unauthorized.to_string(), "Depository: unauthorized");
    }

    #[test]
    #[should_panic(expected = "Depository: invalid note index")]
    fn or_abort_panics_with_message() {
        let result: Result<(), BondError> = Err(BondError::InvalidIndex);
        result.or_abort();
    }
}
