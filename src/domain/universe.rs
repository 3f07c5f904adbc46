//! The fixed ticker universe and symbol-list parsing.
//!
//! The dashboard only ever offers these five symbols; user selections are
//! parsed from comma-separated lists and checked against them.

use std::collections::HashSet;

pub const UNIVERSE: [&str; 5] = ["NVDA", "MSFT", "AMZN", "GOOGL", "META"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("unknown symbol: {0} (available: NVDA, MSFT, AMZN, GOOGL, META)")]
    UnknownSymbol(String),

    #[error("no symbols selected")]
    NoSymbols,
}

pub fn default_symbols() -> Vec<String> {
    UNIVERSE.iter().map(|s| s.to_string()).collect()
}

pub fn is_known(symbol: &str) -> bool {
    UNIVERSE.contains(&symbol)
}

/// Parse a comma-separated selection. Symbols are upper-cased and keep the
/// order they were given in.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    if input.trim().is_empty() {
        return Err(UniverseError::NoSymbols);
    }

    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !is_known(&symbol) {
            return Err(UniverseError::UnknownSymbol(symbol));
        }
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Validate a single forecast target.
pub fn parse_symbol(input: &str) -> Result<String, UniverseError> {
    let symbol = input.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(UniverseError::NoSymbols);
    }
    if !is_known(&symbol) {
        return Err(UniverseError::UnknownSymbol(symbol));
    }
    Ok(symbol)
}
