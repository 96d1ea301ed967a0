use crate::blind_sigs::{BlindSigner, Envelope};
use crate::cut_and_choose::CutAndChoose;
use crate::error::Result;
use crate::utils::verify_signature;
use blsttc::{PublicKey, Signature};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::cell::RefCell;

/// The cover document an agent asks the agency to certify.
pub fn make_document(cover_name: &str) -> String {
    format!(
        "The bearer of this signed document, {}, has full diplomatic immunity.",
        cover_name
    )
}

/// Certifies one of several blinded cover documents for an agent.
pub struct Agency {
    signer: BlindSigner,
    selector_rng: RefCell<StdRng>,
}

impl Agency {
    pub fn new() -> Self {
        Self::from(BlindSigner::new())
    }

    pub fn with_rng(signer: BlindSigner, selector_rng: StdRng) -> Self {
        Self {
            signer,
            selector_rng: RefCell::new(selector_rng),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    /// Starts certification. The agent learns which document stays sealed
    /// and must open every other one.
    pub fn sign_document(&self, blinded_docs: Vec<Envelope>) -> Result<CutAndChoose<'_>> {
        let mut rng = self.selector_rng.borrow_mut();
        self.signer.cut_and_choose(blinded_docs, &mut *rng)
    }

    pub fn verify_document(&self, document: &str, signature: &Signature) -> Result<()> {
        verify_signature(document.as_bytes(), signature, &self.public_key())
    }
}

impl Default for Agency {
    fn default() -> Self {
        Self::new()
    }
}

impl From<BlindSigner> for Agency {
    fn from(signer: BlindSigner) -> Self {
        Self::with_rng(signer, StdRng::from_entropy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blind_sigs::SlipPreparer;
    use crate::cut_and_choose::Opening;
    use crate::error::Error;
    use rand::Rng;
    use std::convert::TryFrom;

    const COVER_NAMES: [&str; 10] = [
        "John Doe",
        "Jane Smith",
        "James Bond",
        "Ethan Hunt",
        "Natasha Romanoff",
        "Jason Bourne",
        "Jack Ryan",
        "Sydney Bristow",
        "Harry Hart",
        "George Smiley",
    ];

    fn agency() -> Agency {
        Agency::with_rng(
            BlindSigner::try_from(*b"********************************").unwrap(),
            StdRng::seed_from_u64(7),
        )
    }

    fn blind_covers(
        documents: &[String],
        rng: &mut StdRng,
    ) -> Result<(Vec<SlipPreparer>, Vec<Envelope>)> {
        let preparers: Vec<SlipPreparer> =
            documents.iter().map(|_| SlipPreparer::random(&mut *rng)).collect();
        let blinded = documents
            .iter()
            .zip(&preparers)
            .map(|(doc, p)| p.place_slip_in_envelope(doc.as_bytes()))
            .collect::<Result<Vec<_>>>()?;
        Ok((preparers, blinded))
    }

    #[test]
    fn agent_gets_one_cover_certified() -> Result<()> {
        let agency = agency();
        let mut rng = StdRng::seed_from_u64(42);

        let documents: Vec<String> = COVER_NAMES.iter().map(|n| make_document(n)).collect();
        let (preparers, blinded) = blind_covers(&documents, &mut rng)?;

        let round = agency.sign_document(blinded)?;
        let selected = round.selected();
        let openings = documents
            .iter()
            .zip(&preparers)
            .enumerate()
            .map(|(i, (doc, p))| {
                if i == selected {
                    None
                } else {
                    Some(Opening::new(p.blinding_factor(), doc.as_bytes().to_vec()))
                }
            })
            .collect();

        let signed = round.prove_and_sign(openings)?;
        let signature = signed.signature_for_slip(preparers[selected].blinding_factor())?;

        agency.verify_document(&documents[selected], &signature)?;
        let other = (selected + 1) % documents.len();
        assert!(matches!(
            agency.verify_document(&documents[other], &signature),
            Err(Error::InvalidSignature)
        ));
        Ok(())
    }

    #[test]
    fn agent_rng_does_not_pick_the_sealed_cover() -> Result<()> {
        let agency = agency();
        let documents: Vec<String> = COVER_NAMES.iter().map(|n| make_document(n)).collect();
        let mut matches = 0;

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let guess = rng.clone().gen_range(0, documents.len());
            let (_, blinded) = blind_covers(&documents, &mut rng)?;

            if agency.sign_document(blinded)?.selected() == guess {
                matches += 1;
            }
        }
        assert!(matches < 20);
        Ok(())
    }

    #[test]
    fn document_text() {
        assert_eq!(
            make_document("James Bond"),
            "The bearer of this signed document, James Bond, has full diplomatic immunity."
        );
    }
}
