use crate::commitment::{decode_identity, xor};
use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::merchant::RisRecord;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of comparing two deposits of the same coin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Two different halves of one round were disclosed, and together they
    /// decode to the payer's identity.
    DoubleSpendDetected { guid: String, identity: String },
    /// The halves differ but do not decode to an identity. The coin's
    /// secret material was inconsistent, or a merchant altered a record.
    AmbiguousCheater { guid: String },
    /// Every round matches. Either a merchant resubmitted the same
    /// record, or two merchants picked the same side in all k rounds
    /// (probability 2^-k). Inconclusive.
    SameRecordReused { guid: String },
}

impl Verdict {
    pub fn guid(&self) -> &str {
        match self {
            Verdict::DoubleSpendDetected { guid, .. }
            | Verdict::AmbiguousCheater { guid }
            | Verdict::SameRecordReused { guid } => guid,
        }
    }

    /// True only when the payer is proven to have spent the coin twice.
    pub fn is_payer_fraud(&self) -> bool {
        matches!(self, Verdict::DoubleSpendDetected { .. })
    }
}

/// Compares two RIS records taken from the same coin.
///
/// The first round where the records differ decides the verdict, later
/// rounds are not looked at.
pub fn determine_cheater(
    config: &ProtocolConfig,
    ris1: &RisRecord,
    ris2: &RisRecord,
) -> Result<Verdict> {
    if ris1.guid != ris2.guid {
        return Err(Error::IncomparableRecords(format!(
            "guid {} does not match guid {}",
            ris1.guid, ris2.guid
        )));
    }
    if ris1.len() != ris2.len() {
        return Err(Error::IncomparableRecords(format!(
            "{} rounds against {} rounds",
            ris1.len(),
            ris2.len()
        )));
    }

    let guid = ris1.guid.clone();
    for (index, (a, b)) in ris1.shares.iter().zip(&ris2.shares).enumerate() {
        if a == b {
            continue;
        }

        let revealed = xor(a, b).ok_or_else(|| {
            Error::IncomparableRecords(format!("shares of round {} differ in width", index))
        })?;

        return Ok(match decode_identity(&config.ident_marker, &revealed) {
            Some(identity) => {
                warn!("coin {} was double-spent by {}", guid, identity);
                Verdict::DoubleSpendDetected { guid, identity }
            }
            None => {
                warn!("coin {} was double-spent, one of the merchants is a cheater", guid);
                Verdict::AmbiguousCheater { guid }
            }
        });
    }

    info!("coin {} used twice with the same RIS", guid);
    Ok(Verdict::SameRecordReused { guid })
}

/// The bank's record of deposited coins.
///
/// Keeps the first RIS record seen for each guid and runs the detector
/// against it whenever the guid is deposited again.
#[derive(Debug)]
pub struct DepositLedger {
    config: ProtocolConfig,
    first_deposits: HashMap<String, RisRecord>,
}

impl DepositLedger {
    pub fn new(config: ProtocolConfig) -> Self {
        Self {
            config,
            first_deposits: HashMap::new(),
        }
    }

    pub fn deposit(&mut self, record: RisRecord) -> Result<Option<Verdict>> {
        if let Some(first) = self.first_deposits.get(&record.guid) {
            return determine_cheater(&self.config, first, &record).map(Some);
        }
        self.first_deposits.insert(record.guid.clone(), record);
        Ok(None)
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.first_deposits.contains_key(guid)
    }

    pub fn len(&self) -> usize {
        self.first_deposits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_deposits.is_empty()
    }
}
