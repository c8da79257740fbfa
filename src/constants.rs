use rust_decimal::Decimal;

/// Number of satoshis in one whole bitcoin.
pub const SATS_PER_BTC: i64 = 100_000_000;

/// Converts an integer satoshi amount to a decimal BTC amount.
///
/// All fiat math in this crate goes through `rust_decimal` so repeated
/// multiplications do not accumulate binary floating point error.
pub fn sats_to_btc(sats: i64) -> Decimal {
    Decimal::from(sats) / Decimal::from(SATS_PER_BTC)
}
