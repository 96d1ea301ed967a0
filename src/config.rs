use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tag leading every canonical coin string.
pub const BANK_MARKER: &str = "ELECTRONIC_PIGGYBANK";

/// Prefix of the identity plaintext hidden in each left/right pair.
pub const IDENT_MARKER: &str = "IDENT-";

/// Number of identity rounds per coin.
pub const DEFAULT_RIS_LENGTH: usize = 20;

/// Width in bytes of each left/right secret.
pub const DEFAULT_SECRET_WIDTH: usize = 64;

/// Parameters shared by the bank, its payers and its merchants.
///
/// Passed explicitly to every protocol step, there is no global bank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub bank_marker: String,
    pub ident_marker: String,
    /// Security parameter k. A double spend escapes detection with
    /// probability 2^-k.
    pub ris_length: usize,
    pub secret_width: usize,
}

impl ProtocolConfig {
    pub fn with_ris_length(mut self, ris_length: usize) -> Self {
        self.ris_length = ris_length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.bank_marker.is_empty() {
            return Err(Error::InvalidConfig("bank marker is empty".to_string()));
        }
        // '-' separates canonical string fields, ',' separates hashes
        if self.bank_marker.contains(|c: char| c == '-' || c == ',') {
            return Err(Error::InvalidConfig(format!(
                "bank marker {:?} contains a separator",
                self.bank_marker
            )));
        }
        if self.ident_marker.is_empty() {
            return Err(Error::InvalidConfig("identity marker is empty".to_string()));
        }
        // identities are zero-padded, a NUL marker would be indistinguishable
        if self.ident_marker.contains('\0') {
            return Err(Error::InvalidConfig(format!(
                "identity marker {:?} contains NUL",
                self.ident_marker
            )));
        }
        if self.ris_length == 0 {
            return Err(Error::InvalidConfig("ris length must be at least 1".to_string()));
        }
        if self.secret_width <= self.ident_marker.len() {
            return Err(Error::InvalidConfig(format!(
                "secret width {} leaves no room after the identity marker",
                self.secret_width
            )));
        }
        Ok(())
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            bank_marker: BANK_MARKER.to_string(),
            ident_marker: IDENT_MARKER.to_string(),
            ris_length: DEFAULT_RIS_LENGTH,
            secret_width: DEFAULT_SECRET_WIDTH,
        }
    }
}
