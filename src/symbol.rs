/// Separator between base and quote in Gate.io contract names (`ETH_USDT`).
pub const CONTRACT_SEPARATOR: char = '_';

/// Rewrite a user symbol into the exchange contract name.
///
/// `ethusdt` and `ETHUSDT` become `ETH_USDT`; anything already carrying the separator is
/// returned untouched. Applying it twice gives the same result as applying it once.
pub fn normalize_symbol(symbol: &str) -> String {
    if symbol.contains(CONTRACT_SEPARATOR) {
        return symbol.to_string();
    }
    symbol.to_uppercase().replace("USDT", "_USDT")
}
