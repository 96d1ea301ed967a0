use blsttc::error::FromBytesError;
use std::array::TryFromSliceError;
use thiserror::Error;

/// Specialisation of `std::Result`.
pub type Result<T, E = BlindSignatureError> = std::result::Result<T, E>;
pub type Error = BlindSignatureError;

#[derive(Error, Debug)]
/// error variants.
pub enum BlindSignatureError {
    #[error("deserialization from bytes failed")]
    BlsttcFromBytes(#[from] FromBytesError),

    #[error("deserialization from bytes failed")]
    InvalidBytes(#[from] TryFromSliceError),

    #[error("blinding failed: {0}")]
    BlindingError(String),

    #[error("the signer declined to sign")]
    SigningDenied,

    #[error("cut-and-choose needs at least 2 candidates, got {0}")]
    NotEnoughCandidates(usize),

    #[error("expected {expected} openings, got {got}")]
    OpeningCount { expected: usize, got: usize },

    #[error("candidate {index} failed the audit")]
    AuditFailure { index: usize },

    #[error("coin signature does not verify")]
    InvalidSignature,

    #[error("malformed coin: {0}")]
    MalformedCoin(String),

    #[error("revealed secret does not match its commitment at round {index}")]
    CommitmentMismatch { index: usize },

    #[error("coin is already signed")]
    SignatureAlreadySet,

    #[error("coin has not been blinded")]
    NotBlinded,

    #[error("round {index} out of range for {rounds} rounds")]
    RoundOutOfRange { index: usize, rounds: usize },

    #[error("identity needs {needed} bytes but the secret width is {width}")]
    IdentityTooLong { needed: usize, width: usize },

    #[error("identity {0:?} cannot survive zero padding")]
    InvalidIdentity(String),

    #[error("coin amount must be positive")]
    InvalidAmount,

    #[error("invalid protocol config: {0}")]
    InvalidConfig(String),

    #[error("RIS records are not comparable: {0}")]
    IncomparableRecords(String),

    #[error("coin was not issued by the trusted bank")]
    UntrustedBank,
}

