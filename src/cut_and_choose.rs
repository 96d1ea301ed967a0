use crate::blind_sigs::{BlindSigner, Envelope, SignedEnvelope, Slip, SlipPreparer};
use crate::error::{Error, Result};
use blsttc::pairing::bls12_381::Fr;
use log::{debug, warn};
use rand::Rng;

/// Everything the signer needs to rebuild one candidate envelope.
#[derive(Clone, Debug)]
pub struct Opening {
    pub blinding_factor: Fr,
    pub slip: Slip,
}

impl Opening {
    pub fn new(blinding_factor: Fr, slip: Slip) -> Self {
        Self {
            blinding_factor,
            slip,
        }
    }
}

/// A cut-and-choose round in progress at the signer.
///
/// The signer has committed to one candidate it will sign without looking
/// inside. Every other candidate has to be opened and must re-derive to the
/// exact envelope that was submitted.
pub struct CutAndChoose<'a> {
    signer: &'a BlindSigner,
    candidates: Vec<Envelope>,
    selected: usize,
}

impl BlindSigner {
    /// Picks the candidate to sign, uniformly, after all candidates are held.
    ///
    /// `rng` belongs to the signer. Callers outside the crate go through
    /// [`crate::Bank`] or [`crate::Agency`], which keep their own.
    pub(crate) fn cut_and_choose<R: Rng>(
        &self,
        candidates: Vec<Envelope>,
        rng: &mut R,
    ) -> Result<CutAndChoose<'_>> {
        if candidates.len() < 2 {
            return Err(Error::NotEnoughCandidates(candidates.len()));
        }
        let selected = rng.gen_range(0, candidates.len());
        debug!(
            "cut-and-choose over {} candidates, selected {}",
            candidates.len(),
            selected
        );

        Ok(CutAndChoose {
            signer: self,
            candidates,
            selected,
        })
    }
}

impl<'a> CutAndChoose<'a> {
    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Audits every candidate except the selected one and, if all of them
    /// re-derive, signs the selected envelope.
    ///
    /// `openings[selected]` is never read and may be `None`.
    pub fn prove_and_sign(self, openings: Vec<Option<Opening>>) -> Result<SignedEnvelope> {
        self.prove_and_sign_with(openings, |_, _| true)
    }

    /// Like [`CutAndChoose::prove_and_sign`], with an extra content check
    /// on every opened slip.
    pub fn prove_and_sign_with<F>(
        self,
        openings: Vec<Option<Opening>>,
        inspect: F,
    ) -> Result<SignedEnvelope>
    where
        F: Fn(usize, &[u8]) -> bool,
    {
        if openings.len() != self.candidates.len() {
            return Err(Error::OpeningCount {
                expected: self.candidates.len(),
                got: openings.len(),
            });
        }

        for (index, (candidate, opening)) in self.candidates.iter().zip(&openings).enumerate() {
            if index == self.selected {
                continue;
            }
            let opening = match opening {
                Some(opening) => opening,
                None => {
                    warn!("candidate {} was not opened", index);
                    return Err(Error::AuditFailure { index });
                }
            };

            let rebuilt = match SlipPreparer::from(opening.blinding_factor)
                .place_slip_in_envelope(&opening.slip)
            {
                Ok(rebuilt) => rebuilt,
                Err(e) => {
                    warn!("candidate {} could not be rebuilt: {}", index, e);
                    return Err(Error::AuditFailure { index });
                }
            };
            if rebuilt.to_bytes()[..] != candidate.to_bytes()[..] {
                warn!("candidate {} does not re-derive from its opening", index);
                return Err(Error::AuditFailure { index });
            }
            if !inspect(index, &opening.slip) {
                warn!("candidate {} was rejected on inspection", index);
                return Err(Error::AuditFailure { index });
            }
        }

        let mut candidates = self.candidates;
        let envelope = candidates.swap_remove(self.selected);
        self.signer.sign_envelope(envelope)
    }
}
