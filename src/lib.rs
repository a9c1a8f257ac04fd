//! Circlet - Circle STARK proof generation and verification
//!
//! A STARK prover and verifier over the Mersenne-31 prime field using a
//! circle-curve evaluation domain. Columns are committed in lifted Merkle
//! trees over a blown-up canonic circle domain, opened at out-of-domain
//! points through per-row quotients, and bound by a circle-to-line FRI
//! low-degree test driven by a Blake2s Fiat-Shamir channel.
//!
//! # Components
//!
//! - `m31`, `cm31`, `qm31` - the base field, its complex extension and the
//!   degree-4 secure field
//! - `circle` - circle group points, cosets and canonic evaluation domains
//! - `poly`, `twiddles`, `line` - circle FFT, cached twiddle trees and the
//!   line polynomials used by FRI
//! - `merkle` - the lifted Merkle vector commitment (Blake2s)
//! - `channel` - the Fiat-Shamir transcript
//! - `pcs` - the polynomial commitment scheme (prover and verifier)
//! - `fri` - the FRI prover and verifier
//! - `air`, `prover`, `verifier` - the component contract and the top-level
//!   prove/verify entry points
//! - `wire` - deterministic JSON and binary proof transports

pub mod air;
pub mod channel;
pub mod circle;
pub mod cm31;
pub mod fields;
pub mod fri;
pub mod line;
pub mod m31;
pub mod merkle;
pub mod pcs;
pub mod poly;
pub mod prover;
pub mod qm31;
pub mod quotients;
pub mod treevec;
pub mod twiddles;
pub mod utils;
pub mod verifier;
pub mod wire;

// Re-exports for convenience
pub use channel::{Blake2sChannel, Channel, MerkleChannel};
pub use circle::{
    secure_field_circle_gen, CanonicCoset, CircleDomain, CirclePoint, CirclePointIndex, Coset,
    M31_CIRCLE_GEN,
};
pub use cm31::CM31;
pub use fields::{batch_inverse, Field, FieldError};
pub use fri::{FriConfig, FriProof, FriProver, FriVerifier};
pub use m31::{M31, P};
pub use merkle::{Blake2sMerkleHasher, MerkleHasher};
pub use pcs::{CommitmentSchemeProver, CommitmentSchemeVerifier, PcsConfig};
pub use prover::{prove, StarkProof};
pub use qm31::{SecureField, QM31};
pub use treevec::TreeVec;
pub use verifier::{verify, VerificationError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::air::{Component, ComponentProver};
    pub use crate::channel::{Blake2sChannel, Channel, MerkleChannel};
    pub use crate::circle::{CanonicCoset, CirclePoint};
    pub use crate::fields::Field;
    pub use crate::fri::FriConfig;
    pub use crate::m31::M31;
    pub use crate::pcs::{CommitmentSchemeProver, CommitmentSchemeVerifier, PcsConfig};
    pub use crate::prover::{prove, StarkProof};
    pub use crate::qm31::QM31;
    pub use crate::treevec::TreeVec;
    pub use crate::verifier::verify;
}
