//! Instrument lists from configuration and command-line flags.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in instrument list")]
    EmptyToken,

    #[error("duplicate instrument: {0}")]
    DuplicateInstrument(String),
}

/// Parses `"IBE.MC, SAN.MC"` into trimmed ids.
///
/// Ids keep their case: file-backed stores are case sensitive.
pub fn parse_instruments(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut instruments = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let id = token.trim();
        if id.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(id.to_string()) {
            return Err(UniverseError::DuplicateInstrument(id.to_string()));
        }
        instruments.push(id.to_string());
    }

    Ok(instruments)
}
