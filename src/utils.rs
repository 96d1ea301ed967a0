use crate::error::{Error, Result};
use blst::{blst_hash_to_g2, blst_p2, blst_p2_compress};
use blsttc::ff::{Field, PrimeField}; // for Fr trait
use blsttc::group::{CurveAffine, CurveProjective, EncodedPoint};
use blsttc::pairing::bls12_381::{Fr, FrRepr, G2Affine, G2};
use blsttc::{PublicKey, Signature};
use std::borrow::Borrow;

/// Checks a BLS signature over arbitrary message bytes.
///
/// The message is mapped onto G2 with `hash_g2_with_dst`, the same way the
/// slip preparer does before blinding, so an unblinded signature verifies
/// here exactly like a signature made directly over the message.
pub(crate) fn verify_signature(data: &[u8], sig: &Signature, pk: &PublicKey) -> Result<()> {
    let data_g2 = hash_g2_with_dst(data)?;

    if pk.verify_g2(sig, data_g2) {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

// blst equivalent of threshold_crypto hash_g2
pub(crate) fn hash_g2_with_dst(msg: &[u8]) -> Result<G2> {
    let mut msg_hash: blst_p2 = Default::default();
    let dst = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";
    let aug = b"";
    unsafe {
        blst_hash_to_g2(
            &mut msg_hash,
            msg.as_ptr(),
            msg.len(),
            dst.as_ptr(),
            dst.len(),
            aug.as_ptr(),
            aug.len(),
        )
    };
    let mut msg_g2_bytes = [0u8; 96];
    unsafe { blst_p2_compress(&mut msg_g2_bytes[0], &msg_hash) }
    be_bytes_to_g2(msg_g2_bytes)
}

// see blsttc util.rs
pub(crate) fn fr_from_be_bytes(bytes: [u8; 32]) -> Result<Fr> {
    let mut le_bytes = bytes;
    le_bytes.reverse();
    let mut fr_u64s = [0u64; 4];
    for (i, chunk) in le_bytes.chunks(8).enumerate() {
        let mut next_u64_bytes = [0u8; 8];
        next_u64_bytes.copy_from_slice(chunk);
        fr_u64s[i] = u64::from_le_bytes(next_u64_bytes);
    }
    Fr::from_repr(FrRepr(fr_u64s))
        .map_err(|_| Error::BlindingError("scalar is not below the field modulus".to_string()))
}

/// Clears the top bits so any 32 bytes decode to a scalar below the modulus.
pub(crate) fn scalar_bytes_from_random(mut bytes: [u8; 32]) -> [u8; 32] {
    bytes[0] &= 0x3f;
    bytes
}

// y = x * r
pub(crate) fn blind(g2: G2, r: Fr) -> G2 {
    g2.into_affine().mul(r)
}

// x = y * 1/r
pub(crate) fn unblind(g2: G2, r: Fr) -> Result<G2> {
    let r_inv: Option<Fr> = Option::from(r.inverse());
    let r_inv = r_inv
        .ok_or_else(|| Error::BlindingError("blinding factor has no inverse".to_string()))?;
    Ok(g2.into_affine().mul(r_inv))
}

// see blsttc Signature from_bytes
pub(crate) fn be_bytes_to_g2(bytes: [u8; 96]) -> Result<G2> {
    let mut compressed: <G2Affine as CurveAffine>::Compressed = EncodedPoint::empty();
    compressed.as_mut().copy_from_slice(bytes.borrow());
    let affine = compressed.into_affine().ok().ok_or_else(|| {
        Error::BlindingError("bytes do not encode a G2 point".to_string())
    })?;
    Ok(affine.into_projective())
}

// see blsttc Signature to_bytes
pub(crate) fn g2_to_be_bytes(g2: G2) -> [u8; 96] {
    let mut bytes = [0u8; 96];
    bytes.copy_from_slice(g2.into_affine().into_compressed().as_ref());
    bytes
}

// Equivalent of blsttc SecretKey::sign_g2, kept standalone so the blinding
// factor and the secret key stay at the same level of abstraction.
pub(crate) fn sign_g2(g2: G2, fr: Fr) -> G2 {
    g2.into_affine().mul(fr)
}
