use crate::blind_sigs::{BlindSigner, Envelope, SignedEnvelope};
use crate::coin::{parse_coin, Coin};
use crate::config::ProtocolConfig;
use crate::cut_and_choose::{CutAndChoose, Opening};
use crate::detector::{DepositLedger, Verdict};
use crate::error::{Error, Result};
use crate::merchant::RisRecord;
use blsttc::PublicKey;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::Rng;
use rand::RngCore;
use rand::SeedableRng;
use std::cell::RefCell;
use std::str;

/// Builds a coin, has it blindly signed by `sign` and unblinds the result.
///
/// `sign` plays the bank. It only ever sees the blinded envelope.
pub fn issue_coin<R, F>(
    config: &ProtocolConfig,
    owner_identity: &str,
    amount: u64,
    bank_public_key: PublicKey,
    rng: &mut R,
    sign: F,
) -> Result<Coin>
where
    R: RngCore,
    F: FnOnce(Envelope) -> Result<SignedEnvelope>,
{
    let mut coin = Coin::new(config, owner_identity, amount, bank_public_key, &mut *rng)?;
    let envelope = coin.blind(rng)?;

    let signed = sign(envelope)?;
    coin.unblind(&signed)?;

    info!("issued coin {} for {}", coin.guid(), amount);
    Ok(coin)
}

/// Issues a coin through cut-and-choose.
///
/// The payer prepares `candidates` coins for the same identity and amount.
/// The bank signs one of them blindly and opens all the others, checking
/// that each re-derives and carries the requested amount under the bank's
/// marker with the configured number of rounds.
///
/// `rng` is the payer's and only builds and blinds the candidates. The
/// bank picks the sealed candidate with its own randomness.
pub fn issue_coin_audited<R: Rng>(
    bank: &Bank,
    owner_identity: &str,
    amount: u64,
    candidates: usize,
    rng: &mut R,
) -> Result<Coin> {
    let config = bank.config();

    let mut coins = Vec::with_capacity(candidates);
    for _ in 0..candidates {
        coins.push(Coin::new(
            config,
            owner_identity,
            amount,
            bank.public_key(),
            &mut *rng,
        )?);
    }
    let envelopes = coins
        .iter_mut()
        .map(|coin| coin.blind(&mut *rng))
        .collect::<Result<Vec<_>>>()?;

    let round = bank.cut_and_choose(envelopes)?;
    let selected = round.selected();

    let openings: Vec<Option<Opening>> = coins
        .iter()
        .enumerate()
        .map(|(i, coin)| {
            if i == selected {
                return None;
            }
            coin.blinding_factor()
                .map(|r| Opening::new(r, coin.canonical_string().into_bytes()))
        })
        .collect();

    let signed = round.prove_and_sign_with(openings, |_, slip| {
        bank.slip_is_acceptable(slip, amount)
    })?;

    let mut coin = coins.swap_remove(selected);
    coin.unblind(&signed)?;

    info!(
        "issued coin {} for {} after auditing {} candidates",
        coin.guid(),
        amount,
        candidates - 1
    );
    Ok(coin)
}

/// The signer role for coins, and the place deposits end up.
pub struct Bank {
    signer: BlindSigner,
    config: ProtocolConfig,
    refusing: bool,
    ledger: DepositLedger,
    selector_rng: RefCell<StdRng>,
}

impl Bank {
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        Self::from_signer(BlindSigner::new(), config)
    }

    pub fn from_signer(signer: BlindSigner, config: ProtocolConfig) -> Result<Self> {
        Self::from_signer_with_rng(signer, config, StdRng::from_entropy())
    }

    /// `selector_rng` drives cut-and-choose selection and never leaves the bank.
    pub fn from_signer_with_rng(
        signer: BlindSigner,
        config: ProtocolConfig,
        selector_rng: StdRng,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            signer,
            ledger: DepositLedger::new(config.clone()),
            config,
            refusing: false,
            selector_rng: RefCell::new(selector_rng),
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// While refusing, every signing request fails with `SigningDenied`.
    pub fn set_refusing(&mut self, refusing: bool) {
        self.refusing = refusing;
    }

    pub fn sign_coin(&self, envelope: Envelope) -> Result<SignedEnvelope> {
        if self.refusing {
            return Err(Error::SigningDenied);
        }
        self.signer.sign_envelope(envelope)
    }

    /// Selection happens here, after every candidate is held.
    pub fn cut_and_choose(&self, candidates: Vec<Envelope>) -> Result<CutAndChoose<'_>> {
        if self.refusing {
            return Err(Error::SigningDenied);
        }
        let mut rng = self.selector_rng.borrow_mut();
        self.signer.cut_and_choose(candidates, &mut *rng)
    }

    /// Records a merchant's deposit. From the second deposit of a guid on,
    /// returns the detector's verdict against the first one.
    pub fn deposit(&mut self, record: RisRecord) -> Result<Option<Verdict>> {
        self.ledger.deposit(record)
    }

    fn slip_is_acceptable(&self, slip: &[u8], amount: u64) -> bool {
        let parsed = match str::from_utf8(slip)
            .ok()
            .and_then(|s| parse_coin(s, &self.config.bank_marker).ok())
        {
            Some(parsed) => parsed,
            None => return false,
        };
        debug!("inspecting opened coin {}", parsed.guid);

        parsed.amount == amount && parsed.left_hashes.len() == self.config.ris_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Side::{Left as L, Right as R};
    use crate::merchant::{accept_coin, FixedSides, Merchant, RandomSides};
    use crate::utils::verify_signature;
    use std::convert::TryFrom;

    fn bank() -> Bank {
        let signer = BlindSigner::try_from(*b"********************************").unwrap();
        Bank::from_signer_with_rng(
            signer,
            ProtocolConfig::default().with_ris_length(6),
            StdRng::seed_from_u64(99),
        )
        .unwrap()
    }

    #[test]
    fn issued_coin_verifies() -> Result<()> {
        let bank = bank();
        let mut rng = StdRng::seed_from_u64(1);

        let coin = issue_coin(bank.config(), "alice", 20, bank.public_key(), &mut rng, |e| {
            bank.sign_coin(e)
        })?;

        let sig = coin.signature().ok_or(Error::InvalidSignature)?;
        verify_signature(coin.canonical_string().as_bytes(), sig, &bank.public_key())?;
        assert_eq!(coin.owner_identity(), "alice");
        assert_eq!(coin.rounds(), 6);
        Ok(())
    }

    #[test]
    fn refusing_bank_denies_signing() {
        let mut bank = bank();
        bank.set_refusing(true);
        let mut rng = StdRng::seed_from_u64(2);

        let result = issue_coin(bank.config(), "alice", 20, bank.public_key(), &mut rng, |e| {
            bank.sign_coin(e)
        });
        assert!(matches!(result, Err(Error::SigningDenied)));

        let result = issue_coin_audited(&bank, "alice", 20, 3, &mut rng);
        assert!(matches!(result, Err(Error::SigningDenied)));
    }

    #[test]
    fn signature_from_another_key_is_rejected() -> Result<()> {
        let bank = bank();
        let impostor = BlindSigner::try_from(*b"11111111111111111111111111111111")?;
        let mut rng = StdRng::seed_from_u64(3);

        let result = issue_coin(bank.config(), "alice", 20, bank.public_key(), &mut rng, |e| {
            impostor.sign_envelope(e)
        });
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn audited_coin_is_spendable() -> Result<()> {
        let bank = bank();
        let mut rng = StdRng::seed_from_u64(4);

        let coin = issue_coin_audited(&bank, "alice", 20, 5, &mut rng)?;

        assert_eq!(coin.amount(), 20);
        let ris = accept_coin(bank.config(), &coin, &mut RandomSides(rng))?;
        assert_eq!(ris.len(), 6);
        Ok(())
    }

    #[test]
    fn audit_needs_two_candidates() {
        let bank = bank();
        let result = issue_coin_audited(&bank, "alice", 20, 1, &mut StdRng::seed_from_u64(5));
        assert!(matches!(result, Err(Error::NotEnoughCandidates(1))));
    }

    #[test]
    fn bank_only_accepts_the_requested_amount() -> Result<()> {
        let bank = bank();
        let mut rng = StdRng::seed_from_u64(6);
        let coin = Coin::new(bank.config(), "alice", 20, bank.public_key(), &mut rng)?;
        let slip = coin.canonical_string().into_bytes();

        assert!(bank.slip_is_acceptable(&slip, 20));
        assert!(!bank.slip_is_acceptable(&slip, 1000));
        assert!(!bank.slip_is_acceptable(b"not a coin", 20));
        Ok(())
    }

    #[test]
    fn inflated_candidate_is_caught_when_opened() -> Result<()> {
        let bank = bank();
        let mut caught = 0;

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut coins = vec![
                Coin::new(bank.config(), "mallory", 20, bank.public_key(), &mut rng)?,
                Coin::new(bank.config(), "mallory", 1000, bank.public_key(), &mut rng)?,
            ];
            let envelopes = coins
                .iter_mut()
                .map(|c| c.blind(&mut rng))
                .collect::<Result<Vec<_>>>()?;

            let round = bank.cut_and_choose(envelopes)?;
            let selected = round.selected();
            let openings = coins
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    if i == selected {
                        None
                    } else {
                        c.blinding_factor()
                            .map(|r| Opening::new(r, c.canonical_string().into_bytes()))
                    }
                })
                .collect();

            match round.prove_and_sign_with(openings, |_, slip| bank.slip_is_acceptable(slip, 20)) {
                Err(Error::AuditFailure { index: 1 }) => caught += 1,
                Ok(_) => assert_eq!(selected, 1),
                Err(e) => return Err(e),
            }
        }
        assert!(caught > 0);
        Ok(())
    }

    #[test]
    fn bank_catches_a_double_deposit() -> Result<()> {
        let mut bank = bank();
        let mut rng = StdRng::seed_from_u64(7);
        let coin = issue_coin_audited(&bank, "alice", 20, 3, &mut rng)?;

        let shop = Merchant::new(bank.config().clone(), bank.public_key());
        let cafe = Merchant::new(bank.config().clone(), bank.public_key());
        let ris1 = shop.accept(&coin, &mut FixedSides::new(vec![L, L, L, L, L, R]))?;
        let ris2 = cafe.accept(&coin, &mut FixedSides::new(vec![L, L, L, L, L, L]))?;

        assert_eq!(bank.deposit(ris1)?, None);
        assert_eq!(
            bank.deposit(ris2)?,
            Some(Verdict::DoubleSpendDetected {
                guid: coin.guid().to_string(),
                identity: "alice".to_string(),
            })
        );
        Ok(())
    }

    #[test]
    fn payer_cannot_steer_the_selection() -> Result<()> {
        let bank = bank();
        let mut signed_inflated = 0;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            // the payer knows its own rng and tries to guess the sealed slot
            let guess = rng.clone().gen_range(0, 3);

            let mut coins = (0..3)
                .map(|i| {
                    let amount = if i == guess { 1000 } else { 20 };
                    Coin::new(bank.config(), "mallory", amount, bank.public_key(), &mut rng)
                })
                .collect::<Result<Vec<_>>>()?;
            let envelopes = coins
                .iter_mut()
                .map(|c| c.blind(&mut rng))
                .collect::<Result<Vec<_>>>()?;

            let round = bank.cut_and_choose(envelopes)?;
            let selected = round.selected();
            let openings = coins
                .iter()
                .enumerate()
                .map(|(i, c)| {
                    if i == selected {
                        None
                    } else {
                        c.blinding_factor()
                            .map(|r| Opening::new(r, c.canonical_string().into_bytes()))
                    }
                })
                .collect();

            if round
                .prove_and_sign_with(openings, |_, slip| bank.slip_is_acceptable(slip, 20))
                .is_ok()
            {
                signed_inflated += 1;
            }
        }
        assert!(signed_inflated < 20);
        Ok(())
    }
}
