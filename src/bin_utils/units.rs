use clap::ValueEnum;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::Amount;

/// Denomination amounts are written in, in CSV input and output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Unit {
    #[default]
    Ether,
    Gwei,
    Wei,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("Amount {amount} has more than {decimals} decimal places")]
    TooPrecise { amount: Decimal, decimals: u32 },
    #[error("Amount {0} is too large")]
    TooLarge(Decimal),
}

impl Unit {
    pub fn decimals(self) -> u32 {
        match self {
            Unit::Ether => 18,
            Unit::Gwei => 9,
            Unit::Wei => 0,
        }
    }

    /// Converts to wei without any rounding.
    pub fn to_base(self, amount: Decimal) -> Result<Amount, AmountError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(AmountError::Negative(amount));
        }
        let normalized = amount.normalize();
        let decimals = self.decimals();
        if normalized.scale() > decimals {
            return Err(AmountError::TooPrecise { amount, decimals });
        }
        let mantissa: Amount = normalized.mantissa().unsigned_abs();
        10u128
            .checked_pow(decimals - normalized.scale())
            .and_then(|factor| mantissa.checked_mul(factor))
            .ok_or(AmountError::TooLarge(amount))
    }

    /// Renders a wei amount in this unit, trailing zeros trimmed.
    pub fn format(self, amount: Amount) -> String {
        let decimals = self.decimals();
        if decimals == 0 {
            return amount.to_string();
        }
        let factor = 10u128.pow(decimals);
        let whole = amount / factor;
        let fraction = amount % factor;
        if fraction == 0 {
            return whole.to_string();
        }
        let fraction = format!("{fraction:0width$}", width = decimals as usize);
        format!("{whole}.{}", fraction.trim_end_matches('0'))
    }
}
