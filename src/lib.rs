//! Cut-and-choose blind signatures over BLS12-381.
//!
//! Two protocols share one blind signer:
//!
//! * an [`Agency`] certifies one of several blinded documents after
//!   auditing all the others,
//! * a [`Bank`] issues anonymous [`Coin`]s whose owner stays hidden unless
//!   the coin is spent twice, in which case [`determine_cheater`] recovers
//!   the owner's identity from the two merchants' [`RisRecord`]s.

mod blind_sigs;
pub mod coin;
pub mod commitment;
pub mod config;
pub mod cut_and_choose;
pub mod detector;
pub mod document;
mod error;
pub mod issuance;
pub mod merchant;
mod utils;

pub use crate::blind_sigs::{BlindSigner, Envelope, SignedEnvelope, Slip, SlipPreparer};
pub use crate::coin::{parse_coin, Coin, ParsedCoin, Side};
pub use crate::config::ProtocolConfig;
pub use crate::cut_and_choose::{CutAndChoose, Opening};
pub use crate::detector::{determine_cheater, DepositLedger, Verdict};
pub use crate::document::{make_document, Agency};
pub use crate::error::{Error, Result};
pub use crate::issuance::{issue_coin, issue_coin_audited, Bank};
pub use crate::merchant::{accept_coin, FixedSides, Merchant, RandomSides, RisRecord, SideSource};
