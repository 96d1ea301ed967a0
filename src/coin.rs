use crate::blind_sigs::{Envelope, SignedEnvelope, SlipPreparer};
use crate::commitment::{encode_identity, hash};
use crate::config::ProtocolConfig;
use crate::error::{Error, Result};
use crate::utils::verify_signature;
use blsttc::pairing::bls12_381::Fr;
use blsttc::{PublicKey, Signature};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of a round's secret pair is disclosed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// An anonymous token issued by the bank.
///
/// For every round `i` the coin holds two secrets with
/// `left[i] XOR right[i] == IDENT_MARKER || owner_identity` (zero padded).
/// Only their hashes appear in the canonical string, so the bank signs the
/// commitments without learning the identity. A merchant asks for one half
/// per round; answering both halves of a round, which happens when the coin
/// is spent twice, gives away the identity.
#[derive(Clone)]
pub struct Coin {
    pub(crate) guid: String,
    pub(crate) amount: u64,
    pub(crate) owner_identity: String,
    pub(crate) bank_public_key: PublicKey,
    pub(crate) bank_marker: String,
    pub(crate) left: Vec<Vec<u8>>,
    pub(crate) right: Vec<Vec<u8>>,
    pub(crate) left_hashes: Vec<String>,
    pub(crate) right_hashes: Vec<String>,
    preparer: Option<SlipPreparer>,
    pub(crate) signature: Option<Signature>,
}

impl Coin {
    pub fn new<R: RngCore>(
        config: &ProtocolConfig,
        owner_identity: &str,
        amount: u64,
        bank_public_key: PublicKey,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }

        let identity = encode_identity(&config.ident_marker, owner_identity, config.secret_width)?;

        let mut guid = [0u8; 16];
        rng.fill_bytes(&mut guid);

        let k = config.ris_length;
        let mut left = Vec::with_capacity(k);
        let mut right = Vec::with_capacity(k);
        let mut left_hashes = Vec::with_capacity(k);
        let mut right_hashes = Vec::with_capacity(k);

        while left.len() < k {
            let mut l = vec![0u8; config.secret_width];
            rng.fill_bytes(&mut l);
            let r: Vec<u8> = l.iter().zip(&identity).map(|(a, b)| a ^ b).collect();

            let (lh, rh) = (hash(&l), hash(&r));
            if lh == rh {
                continue;
            }
            left.push(l);
            right.push(r);
            left_hashes.push(lh);
            right_hashes.push(rh);
        }

        Ok(Self {
            guid: hex::encode(guid),
            amount,
            owner_identity: owner_identity.to_string(),
            bank_public_key,
            bank_marker: config.bank_marker.clone(),
            left,
            right,
            left_hashes,
            right_hashes,
            preparer: None,
            signature: None,
        })
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn owner_identity(&self) -> &str {
        &self.owner_identity
    }

    pub fn bank_public_key(&self) -> &PublicKey {
        &self.bank_public_key
    }

    pub fn rounds(&self) -> usize {
        self.left.len()
    }

    pub fn left_hashes(&self) -> &[String] {
        &self.left_hashes
    }

    pub fn right_hashes(&self) -> &[String] {
        &self.right_hashes
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    /// `BANK_MARKER-amount-guid-leftHashes-rightHashes`, the signed slip.
    pub fn canonical_string(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.bank_marker,
            self.amount,
            self.guid,
            self.left_hashes.join(","),
            self.right_hashes.join(",")
        )
    }

    /// Blinds the canonical string with a fresh factor from `rng`.
    pub fn blind<R: RngCore>(&mut self, rng: &mut R) -> Result<Envelope> {
        self.blind_with(SlipPreparer::random(rng))
    }

    pub fn blind_with(&mut self, preparer: SlipPreparer) -> Result<Envelope> {
        if self.signature.is_some() {
            return Err(Error::SignatureAlreadySet);
        }
        let envelope = preparer.place_slip_in_envelope(self.canonical_string().as_bytes())?;
        self.preparer = Some(preparer);
        Ok(envelope)
    }

    /// The factor retained between [`Coin::blind`] and [`Coin::unblind`].
    pub fn blinding_factor(&self) -> Option<Fr> {
        self.preparer.as_ref().map(SlipPreparer::blinding_factor)
    }

    /// Unblinds the bank's signature and attaches it.
    ///
    /// The signature must verify against the bank key before it is kept.
    /// The blinding factor is dropped once the signature is attached.
    pub fn unblind(&mut self, signed: &SignedEnvelope) -> Result<()> {
        if self.signature.is_some() {
            return Err(Error::SignatureAlreadySet);
        }
        let preparer = self.preparer.as_ref().ok_or(Error::NotBlinded)?;

        let signature = signed.signature_for_slip(preparer.blinding_factor())?;
        verify_signature(
            self.canonical_string().as_bytes(),
            &signature,
            &self.bank_public_key,
        )?;

        self.signature = Some(signature);
        self.preparer = None;
        Ok(())
    }

    /// The owner's answer to a merchant asking for one half of a round.
    pub fn reveal(&self, side: Side, round: usize) -> Result<&[u8]> {
        let halves = match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        };
        halves
            .get(round)
            .map(Vec::as_slice)
            .ok_or(Error::RoundOutOfRange {
                index: round,
                rounds: self.rounds(),
            })
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

// secrets and the owner stay out of debug output
impl fmt::Debug for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coin")
            .field("guid", &self.guid)
            .field("amount", &self.amount)
            .field("rounds", &self.rounds())
            .field("signed", &self.signature.is_some())
            .finish()
    }
}

/// The public fields of a canonical coin string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCoin {
    pub amount: u64,
    pub guid: String,
    pub left_hashes: Vec<String>,
    pub right_hashes: Vec<String>,
}

pub fn parse_coin(s: &str, expected_marker: &str) -> Result<ParsedCoin> {
    let fields: Vec<&str> = s.split('-').collect();
    let (marker, amount, guid, left, right) = match fields.as_slice() {
        [marker, amount, guid, left, right] => (*marker, *amount, *guid, *left, *right),
        _ => {
            return Err(Error::MalformedCoin(format!(
                "expected 5 fields, found {}",
                fields.len()
            )))
        }
    };

    if marker != expected_marker {
        return Err(Error::MalformedCoin(format!(
            "{} received, but {} expected",
            marker, expected_marker
        )));
    }

    let amount = amount
        .parse::<u64>()
        .map_err(|e| Error::MalformedCoin(format!("bad amount {:?}: {}", amount, e)))?;
    if guid.is_empty() {
        return Err(Error::MalformedCoin("empty guid".to_string()));
    }

    let left_hashes: Vec<String> = left.split(',').map(str::to_string).collect();
    let right_hashes: Vec<String> = right.split(',').map(str::to_string).collect();
    if left_hashes.len() != right_hashes.len() {
        return Err(Error::MalformedCoin(format!(
            "{} left hashes but {} right hashes",
            left_hashes.len(),
            right_hashes.len()
        )));
    }
    if left_hashes.iter().chain(&right_hashes).any(String::is_empty) {
        return Err(Error::MalformedCoin("empty commitment hash".to_string()));
    }

    Ok(ParsedCoin {
        amount,
        guid: guid.to_string(),
        left_hashes,
        right_hashes,
    })
}
