use crate::coin::{parse_coin, Coin, Side};
use crate::commitment::hash;
use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::utils::verify_signature;
use blsttc::PublicKey;
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Supplies the merchant's left/right choice for each round.
pub trait SideSource {
    fn next_side(&mut self) -> Side;
}

/// Unbiased coin flips from any rng.
pub struct RandomSides<R>(pub R);

impl<R: Rng> SideSource for RandomSides<R> {
    fn next_side(&mut self) -> Side {
        if self.0.gen_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }
}

/// Replays a fixed sequence of choices, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct FixedSides {
    sides: Vec<Side>,
    next: usize,
}

impl FixedSides {
    pub fn new(sides: Vec<Side>) -> Self {
        Self { sides, next: 0 }
    }
}

impl SideSource for FixedSides {
    fn next_side(&mut self) -> Side {
        let side = self.sides.get(self.next).copied().unwrap_or(Side::Left);
        self.next = (self.next + 1) % self.sides.len().max(1);
        side
    }
}

/// The identity halves a payer disclosed during one spend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RisRecord {
    pub guid: String,
    pub shares: Vec<Vec<u8>>,
}

impl RisRecord {
    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// Validates a coin offered as payment and collects one RIS record.
///
/// The signature is checked before anything else, then the canonical
/// string is parsed, then each round's disclosed half is checked against
/// its commitment. The first failing round aborts the spend.
pub fn accept_coin<S: SideSource>(
    config: &ProtocolConfig,
    coin: &Coin,
    sides: &mut S,
) -> Result<RisRecord> {
    config.validate()?;
    let canonical = coin.canonical_string();

    let signature = coin.signature().ok_or(Error::InvalidSignature)?;
    verify_signature(canonical.as_bytes(), signature, coin.bank_public_key()).map_err(|e| {
        warn!("coin {} carries an invalid signature", coin.guid());
        e
    })?;

    let parsed = parse_coin(&canonical, &config.bank_marker)?;
    debug!(
        "coin {} valued at {} has {} rounds",
        parsed.guid,
        parsed.amount,
        parsed.left_hashes.len()
    );

    let mut shares = Vec::with_capacity(parsed.left_hashes.len());
    for (index, (left_hash, right_hash)) in parsed
        .left_hashes
        .iter()
        .zip(&parsed.right_hashes)
        .enumerate()
    {
        let side = sides.next_side();
        let value = coin.reveal(side, index)?;
        let expected = match side {
            Side::Left => left_hash,
            Side::Right => right_hash,
        };

        if &hash(value) != expected {
            warn!("coin {} failed its commitment at round {}", parsed.guid, index);
            return Err(Error::CommitmentMismatch { index });
        }
        shares.push(value.to_vec());
    }

    info!("accepted coin {} for {}", parsed.guid, parsed.amount);
    Ok(RisRecord {
        guid: parsed.guid,
        shares,
    })
}

/// A merchant that only takes coins from one bank.
pub struct Merchant {
    config: ProtocolConfig,
    trusted_bank: PublicKey,
}

impl Merchant {
    pub fn new(config: ProtocolConfig, trusted_bank: PublicKey) -> Self {
        Self {
            config,
            trusted_bank,
        }
    }

    pub fn accept<S: SideSource>(&self, coin: &Coin, sides: &mut S) -> Result<RisRecord> {
        if coin.bank_public_key() != &self.trusted_bank {
            return Err(Error::UntrustedBank);
        }
        accept_coin(&self.config, coin, sides)
    }
}
