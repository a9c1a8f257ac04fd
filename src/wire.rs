//! Deterministic proof transports
//!
//! Two byte-level encodings of a proof with identical semantics: a JSON
//! field-for-field dump of `ProofWire` and a compact length-prefixed binary
//! layout behind the `STWOPRW1` magic. Both reject non-canonical field
//! elements on decode, and both re-encode decoded proofs byte-for-byte.

use serde::{Deserialize, Serialize};

use crate::fri::{FriConfig, FriLayerProof, FriProof};
use crate::line::LinePoly;
use crate::m31::{M31, P};
use crate::merkle::MerkleDecommitmentLifted;
use crate::pcs::{CommitmentSchemeProof, PcsConfig};
use crate::prover::StarkProof;
use crate::qm31::QM31;
use crate::treevec::TreeVec;

/// Magic prefix of the binary transport; the trailing digit is the version.
pub const BINARY_MAGIC: &[u8; 8] = b"STWOPRW1";

/// Interop artifact schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Interop artifact exchange mode identifier.
pub const EXCHANGE_MODE: &str = "proof_exchange_json_wire_v1";

/// Errors surfaced while encoding or decoding proofs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    NonCanonicalM31,
    ValueOutOfRange,
    InvalidHexLength,
    InvalidHexDigit,
    InvalidBinaryProof,
    UnsupportedBinaryVersion,
    InvalidJsonProof,
}

impl core::fmt::Display for CodecError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NonCanonicalM31 => write!(f, "non-canonical m31 value"),
            Self::ValueOutOfRange => write!(f, "value out of range"),
            Self::InvalidHexLength => write!(f, "invalid hex length"),
            Self::InvalidHexDigit => write!(f, "invalid hex digit"),
            Self::InvalidBinaryProof => write!(f, "invalid binary proof"),
            Self::UnsupportedBinaryVersion => write!(f, "unsupported binary version"),
            Self::InvalidJsonProof => write!(f, "invalid json proof"),
        }
    }
}

impl std::error::Error for CodecError {}

pub type HashWire = [u8; 32];
pub type Qm31Wire = [u32; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriConfigWire {
    pub log_blowup_factor: u32,
    pub log_last_layer_degree_bound: u32,
    pub n_queries: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcsConfigWire {
    pub pow_bits: u32,
    pub fri_config: FriConfigWire,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleDecommitmentWire {
    pub hash_witness: Vec<HashWire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriLayerWire {
    pub fri_witness: Vec<Qm31Wire>,
    pub decommitment: MerkleDecommitmentWire,
    pub commitment: HashWire,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriProofWire {
    pub first_layer: FriLayerWire,
    pub inner_layers: Vec<FriLayerWire>,
    pub last_layer_poly: Vec<Qm31Wire>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofWire {
    pub config: PcsConfigWire,
    pub commitments: Vec<HashWire>,
    pub sampled_values: Vec<Vec<Vec<Qm31Wire>>>,
    pub decommitments: Vec<MerkleDecommitmentWire>,
    pub queried_values: Vec<Vec<Vec<u32>>>,
    pub proof_of_work: u64,
    pub fri_proof: FriProofWire,
}

fn checked_m31(value: u32) -> Result<M31, CodecError> {
    if value >= P {
        return Err(CodecError::NonCanonicalM31);
    }
    Ok(M31::from_u32_unchecked(value))
}

fn qm31_to_wire(value: QM31) -> Qm31Wire {
    let coords = value.to_m31_array();
    [coords[0].0, coords[1].0, coords[2].0, coords[3].0]
}

fn qm31_from_wire(wire: Qm31Wire) -> Result<QM31, CodecError> {
    Ok(QM31::from_m31(
        checked_m31(wire[0])?,
        checked_m31(wire[1])?,
        checked_m31(wire[2])?,
        checked_m31(wire[3])?,
    ))
}

pub fn pcs_config_to_wire(config: PcsConfig) -> PcsConfigWire {
    PcsConfigWire {
        pow_bits: config.pow_bits,
        fri_config: FriConfigWire {
            log_blowup_factor: config.fri_config.log_blowup_factor,
            log_last_layer_degree_bound: config.fri_config.log_last_layer_degree_bound,
            n_queries: config.fri_config.n_queries as u64,
        },
    }
}

pub fn pcs_config_from_wire(wire: &PcsConfigWire) -> Result<PcsConfig, CodecError> {
    let n_queries: usize = wire
        .fri_config
        .n_queries
        .try_into()
        .map_err(|_| CodecError::ValueOutOfRange)?;
    if wire.fri_config.log_last_layer_degree_bound + wire.fri_config.log_blowup_factor > 31 {
        return Err(CodecError::ValueOutOfRange);
    }
    Ok(PcsConfig {
        pow_bits: wire.pow_bits,
        fri_config: FriConfig {
            log_blowup_factor: wire.fri_config.log_blowup_factor,
            log_last_layer_degree_bound: wire.fri_config.log_last_layer_degree_bound,
            n_queries,
        },
    })
}

fn fri_layer_to_wire(layer: &FriLayerProof) -> FriLayerWire {
    FriLayerWire {
        fri_witness: layer.fri_witness.iter().copied().map(qm31_to_wire).collect(),
        decommitment: MerkleDecommitmentWire {
            hash_witness: layer.decommitment.hash_witness.clone(),
        },
        commitment: layer.commitment,
    }
}

fn fri_layer_from_wire(wire: FriLayerWire) -> Result<FriLayerProof, CodecError> {
    Ok(FriLayerProof {
        fri_witness: wire
            .fri_witness
            .into_iter()
            .map(qm31_from_wire)
            .collect::<Result<Vec<_>, _>>()?,
        decommitment: MerkleDecommitmentLifted {
            hash_witness: wire.decommitment.hash_witness,
        },
        commitment: wire.commitment,
    })
}

/// Converts a proof into the transport representation.
pub fn proof_to_wire(proof: &StarkProof) -> ProofWire {
    let pcs_proof = &proof.0;
    ProofWire {
        config: pcs_config_to_wire(pcs_proof.config),
        commitments: pcs_proof.commitments.0.clone(),
        sampled_values: pcs_proof
            .sampled_values
            .0
            .iter()
            .map(|tree| {
                tree.iter()
                    .map(|column| column.iter().copied().map(qm31_to_wire).collect())
                    .collect()
            })
            .collect(),
        decommitments: pcs_proof
            .decommitments
            .0
            .iter()
            .map(|decommitment| MerkleDecommitmentWire {
                hash_witness: decommitment.hash_witness.clone(),
            })
            .collect(),
        queried_values: pcs_proof
            .queried_values
            .0
            .iter()
            .map(|tree| {
                tree.iter()
                    .map(|column| column.iter().map(|v| v.0).collect())
                    .collect()
            })
            .collect(),
        proof_of_work: pcs_proof.proof_of_work,
        fri_proof: FriProofWire {
            first_layer: fri_layer_to_wire(&pcs_proof.fri_proof.first_layer),
            inner_layers: pcs_proof
                .fri_proof
                .inner_layers
                .iter()
                .map(fri_layer_to_wire)
                .collect(),
            last_layer_poly: pcs_proof
                .fri_proof
                .last_layer_poly
                .coefficients()
                .iter()
                .copied()
                .map(qm31_to_wire)
                .collect(),
        },
    }
}

/// Rebuilds a proof from the transport representation, rejecting
/// non-canonical field elements.
pub fn wire_to_proof(wire: ProofWire) -> Result<StarkProof, CodecError> {
    let config = pcs_config_from_wire(&wire.config)?;

    let sampled_values = wire
        .sampled_values
        .into_iter()
        .map(|tree| {
            tree.into_iter()
                .map(|column| {
                    column
                        .into_iter()
                        .map(qm31_from_wire)
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let queried_values = wire
        .queried_values
        .into_iter()
        .map(|tree| {
            tree.into_iter()
                .map(|column| {
                    column
                        .into_iter()
                        .map(checked_m31)
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    let last_layer_coeffs = wire
        .fri_proof
        .last_layer_poly
        .into_iter()
        .map(qm31_from_wire)
        .collect::<Result<Vec<_>, _>>()?;
    if last_layer_coeffs.is_empty() || !last_layer_coeffs.len().is_power_of_two() {
        return Err(CodecError::ValueOutOfRange);
    }

    let fri_proof = FriProof {
        first_layer: fri_layer_from_wire(wire.fri_proof.first_layer)?,
        inner_layers: wire
            .fri_proof
            .inner_layers
            .into_iter()
            .map(fri_layer_from_wire)
            .collect::<Result<Vec<_>, _>>()?,
        last_layer_poly: LinePoly::from_ordered_coefficients(last_layer_coeffs),
    };

    Ok(StarkProof(CommitmentSchemeProof {
        config,
        commitments: TreeVec::new(wire.commitments),
        sampled_values: TreeVec::new(sampled_values),
        decommitments: TreeVec::new(
            wire.decommitments
                .into_iter()
                .map(|decommitment| MerkleDecommitmentLifted {
                    hash_witness: decommitment.hash_witness,
                })
                .collect(),
        ),
        queried_values: TreeVec::new(queried_values),
        proof_of_work: wire.proof_of_work,
        fri_proof,
    }))
}

/// Encodes a proof as JSON-wire bytes.
pub fn encode_json(proof: &StarkProof) -> Vec<u8> {
    serde_json::to_vec(&proof_to_wire(proof)).expect("proof wire serialization cannot fail")
}

/// Decodes a proof from JSON-wire bytes.
pub fn decode_json(bytes: &[u8]) -> Result<StarkProof, CodecError> {
    let wire: ProofWire =
        serde_json::from_slice(bytes).map_err(|_| CodecError::InvalidJsonProof)?;
    wire_to_proof(wire)
}

struct BinaryWriter {
    bytes: Vec<u8>,
}

impl BinaryWriter {
    fn new() -> Self {
        Self {
            bytes: BINARY_MAGIC.to_vec(),
        }
    }

    fn put_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn put_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn put_len(&mut self, len: usize) {
        self.put_u32(len.try_into().expect("vector too long for the wire"));
    }

    fn put_hash(&mut self, hash: &HashWire) {
        self.bytes.extend_from_slice(hash);
    }

    fn put_qm31(&mut self, value: &Qm31Wire) {
        for coord in value {
            self.put_u32(*coord);
        }
    }

    fn put_decommitment(&mut self, decommitment: &MerkleDecommitmentWire) {
        self.put_len(decommitment.hash_witness.len());
        for hash in &decommitment.hash_witness {
            self.put_hash(hash);
        }
    }

    fn put_fri_layer(&mut self, layer: &FriLayerWire) {
        self.put_len(layer.fri_witness.len());
        for value in &layer.fri_witness {
            self.put_qm31(value);
        }
        self.put_decommitment(&layer.decommitment);
        self.put_hash(&layer.commitment);
    }
}

/// Encodes a proof in the compact binary layout.
pub fn encode_binary(proof: &StarkProof) -> Vec<u8> {
    let wire = proof_to_wire(proof);
    let mut writer = BinaryWriter::new();

    writer.put_u32(wire.config.pow_bits);
    writer.put_u32(wire.config.fri_config.log_blowup_factor);
    writer.put_u32(wire.config.fri_config.log_last_layer_degree_bound);
    writer.put_u64(wire.config.fri_config.n_queries);

    writer.put_len(wire.commitments.len());
    for hash in &wire.commitments {
        writer.put_hash(hash);
    }

    writer.put_len(wire.sampled_values.len());
    for tree in &wire.sampled_values {
        writer.put_len(tree.len());
        for column in tree {
            writer.put_len(column.len());
            for value in column {
                writer.put_qm31(value);
            }
        }
    }

    writer.put_len(wire.decommitments.len());
    for decommitment in &wire.decommitments {
        writer.put_decommitment(decommitment);
    }

    writer.put_len(wire.queried_values.len());
    for tree in &wire.queried_values {
        writer.put_len(tree.len());
        for column in tree {
            writer.put_len(column.len());
            for value in column {
                writer.put_u32(*value);
            }
        }
    }

    writer.put_u64(wire.proof_of_work);

    writer.put_fri_layer(&wire.fri_proof.first_layer);
    writer.put_len(wire.fri_proof.inner_layers.len());
    for layer in &wire.fri_proof.inner_layers {
        writer.put_fri_layer(layer);
    }
    writer.put_len(wire.fri_proof.last_layer_poly.len());
    for value in &wire.fri_proof.last_layer_poly {
        writer.put_qm31(value);
    }

    writer.bytes
}

struct BinaryReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .position
            .checked_add(n)
            .ok_or(CodecError::InvalidBinaryProof)?;
        if end > self.bytes.len() {
            return Err(CodecError::InvalidBinaryProof);
        }
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Reads a length prefix; the remaining bytes must fit at least `len`
    /// items of `min_item_size` bytes.
    fn read_len(&mut self, min_item_size: usize) -> Result<usize, CodecError> {
        let len = self.read_u32()? as usize;
        let remaining = self.bytes.len() - self.position;
        if min_item_size != 0 && len > remaining / min_item_size {
            return Err(CodecError::InvalidBinaryProof);
        }
        Ok(len)
    }

    fn read_hash(&mut self) -> Result<HashWire, CodecError> {
        Ok(self.take(32)?.try_into().unwrap())
    }

    fn read_qm31(&mut self) -> Result<Qm31Wire, CodecError> {
        Ok([
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
            self.read_u32()?,
        ])
    }

    fn read_decommitment(&mut self) -> Result<MerkleDecommitmentWire, CodecError> {
        let len = self.read_len(32)?;
        let mut hash_witness = Vec::with_capacity(len);
        for _ in 0..len {
            hash_witness.push(self.read_hash()?);
        }
        Ok(MerkleDecommitmentWire { hash_witness })
    }

    fn read_fri_layer(&mut self) -> Result<FriLayerWire, CodecError> {
        let witness_len = self.read_len(16)?;
        let mut fri_witness = Vec::with_capacity(witness_len);
        for _ in 0..witness_len {
            fri_witness.push(self.read_qm31()?);
        }
        let decommitment = self.read_decommitment()?;
        let commitment = self.read_hash()?;
        Ok(FriLayerWire {
            fri_witness,
            decommitment,
            commitment,
        })
    }
}

/// Decodes a proof from the compact binary layout.
pub fn decode_binary(bytes: &[u8]) -> Result<StarkProof, CodecError> {
    if bytes.len() < BINARY_MAGIC.len() {
        return Err(CodecError::InvalidBinaryProof);
    }
    let (magic, rest) = bytes.split_at(BINARY_MAGIC.len());
    if magic != BINARY_MAGIC {
        if magic[..7] == BINARY_MAGIC[..7] {
            return Err(CodecError::UnsupportedBinaryVersion);
        }
        return Err(CodecError::InvalidBinaryProof);
    }

    let mut reader = BinaryReader {
        bytes: rest,
        position: 0,
    };

    let pow_bits = reader.read_u32()?;
    let log_blowup_factor = reader.read_u32()?;
    let log_last_layer_degree_bound = reader.read_u32()?;
    let n_queries = reader.read_u64()?;
    let config = PcsConfigWire {
        pow_bits,
        fri_config: FriConfigWire {
            log_blowup_factor,
            log_last_layer_degree_bound,
            n_queries,
        },
    };

    let commitments_len = reader.read_len(32)?;
    let mut commitments = Vec::with_capacity(commitments_len);
    for _ in 0..commitments_len {
        commitments.push(reader.read_hash()?);
    }

    let trees_len = reader.read_len(4)?;
    let mut sampled_values = Vec::with_capacity(trees_len);
    for _ in 0..trees_len {
        let columns_len = reader.read_len(4)?;
        let mut tree = Vec::with_capacity(columns_len);
        for _ in 0..columns_len {
            let samples_len = reader.read_len(16)?;
            let mut column = Vec::with_capacity(samples_len);
            for _ in 0..samples_len {
                column.push(reader.read_qm31()?);
            }
            tree.push(column);
        }
        sampled_values.push(tree);
    }

    let decommitments_len = reader.read_len(4)?;
    let mut decommitments = Vec::with_capacity(decommitments_len);
    for _ in 0..decommitments_len {
        decommitments.push(reader.read_decommitment()?);
    }

    let trees_len = reader.read_len(4)?;
    let mut queried_values = Vec::with_capacity(trees_len);
    for _ in 0..trees_len {
        let columns_len = reader.read_len(4)?;
        let mut tree = Vec::with_capacity(columns_len);
        for _ in 0..columns_len {
            let rows_len = reader.read_len(4)?;
            let mut column = Vec::with_capacity(rows_len);
            for _ in 0..rows_len {
                column.push(reader.read_u32()?);
            }
            tree.push(column);
        }
        queried_values.push(tree);
    }

    let proof_of_work = reader.read_u64()?;

    let first_layer = reader.read_fri_layer()?;
    let inner_len = reader.read_len(4)?;
    let mut inner_layers = Vec::with_capacity(inner_len);
    for _ in 0..inner_len {
        inner_layers.push(reader.read_fri_layer()?);
    }
    let poly_len = reader.read_len(16)?;
    let mut last_layer_poly = Vec::with_capacity(poly_len);
    for _ in 0..poly_len {
        last_layer_poly.push(reader.read_qm31()?);
    }

    if reader.position != reader.bytes.len() {
        return Err(CodecError::InvalidBinaryProof);
    }

    wire_to_proof(ProofWire {
        config,
        commitments,
        sampled_values,
        decommitments,
        queried_values,
        proof_of_work,
        fri_proof: FriProofWire {
            first_layer,
            inner_layers,
            last_layer_poly,
        },
    })
}

/// Hex-encodes bytes.
pub fn hex_encode(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Hex-decodes a string, rejecting odd lengths and non-hex characters.
pub fn hex_decode(input: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(input).map_err(|e| match e {
        hex::FromHexError::OddLength | hex::FromHexError::InvalidStringLength => {
            CodecError::InvalidHexLength
        }
        hex::FromHexError::InvalidHexCharacter { .. } => CodecError::InvalidHexDigit,
    })
}

/// Errors surfaced by the interop artifact reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactError {
    SchemaVersionMismatch,
    ExchangeModeMismatch,
    ExampleMismatch,
    ConfigMismatch,
    InvalidJson,
    Codec(CodecError),
}

impl core::fmt::Display for ArtifactError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SchemaVersionMismatch => write!(f, "unsupported schema version"),
            Self::ExchangeModeMismatch => write!(f, "unsupported exchange mode"),
            Self::ExampleMismatch => write!(f, "artifact is for a different example"),
            Self::ConfigMismatch => write!(f, "artifact config mismatch"),
            Self::InvalidJson => write!(f, "invalid artifact json"),
            Self::Codec(e) => write!(f, "codec error: {e}"),
        }
    }
}

impl std::error::Error for ArtifactError {}

impl From<CodecError> for ArtifactError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Cross-implementation proof exchange artifact: JSON metadata plus the
/// JSON-wire proof bytes in hex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteropArtifact {
    pub schema_version: u32,
    pub upstream_commit: String,
    pub exchange_mode: String,
    pub generator: String,
    pub example: String,
    pub pcs_config: PcsConfigWire,
    pub statement: serde_json::Value,
    pub proof_bytes_hex: String,
}

impl InteropArtifact {
    pub fn new(
        example: &str,
        generator: &str,
        upstream_commit: &str,
        pcs_config: PcsConfig,
        statement: serde_json::Value,
        proof: &StarkProof,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            upstream_commit: upstream_commit.to_string(),
            exchange_mode: EXCHANGE_MODE.to_string(),
            generator: generator.to_string(),
            example: example.to_string(),
            pcs_config: pcs_config_to_wire(pcs_config),
            statement,
            proof_bytes_hex: hex_encode(&encode_json(proof)),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).expect("artifact serialization cannot fail")
    }

    pub fn from_json(input: &str) -> Result<Self, ArtifactError> {
        serde_json::from_str(input).map_err(|_| ArtifactError::InvalidJson)
    }

    /// Validates the metadata and decodes the embedded proof.
    pub fn decode_proof(
        &self,
        expected_example: &str,
        expected_config: PcsConfig,
    ) -> Result<StarkProof, ArtifactError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ArtifactError::SchemaVersionMismatch);
        }
        if self.exchange_mode != EXCHANGE_MODE {
            return Err(ArtifactError::ExchangeModeMismatch);
        }
        if self.example != expected_example {
            return Err(ArtifactError::ExampleMismatch);
        }
        if self.pcs_config != pcs_config_to_wire(expected_config) {
            return Err(ArtifactError::ConfigMismatch);
        }
        let bytes = hex_decode(&self.proof_bytes_hex)?;
        Ok(decode_json(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_m31_bounds() {
        assert!(checked_m31(P - 1).is_ok());
        assert_eq!(checked_m31(P), Err(CodecError::NonCanonicalM31));
        assert_eq!(checked_m31(u32::MAX), Err(CodecError::NonCanonicalM31));
    }

    #[test]
    fn test_hex_rejections() {
        assert_eq!(hex_decode("abc"), Err(CodecError::InvalidHexLength));
        assert_eq!(hex_decode("zz"), Err(CodecError::InvalidHexDigit));
        assert_eq!(hex_decode("00ff").unwrap(), vec![0, 255]);
        assert_eq!(hex_encode(&[0, 255]), "00ff");
    }

    #[test]
    fn test_binary_magic_rejections() {
        assert_eq!(decode_binary(b"short").err(), Some(CodecError::InvalidBinaryProof));
        assert_eq!(
            decode_binary(b"STWOPRW2trailing").err(),
            Some(CodecError::UnsupportedBinaryVersion)
        );
        assert_eq!(
            decode_binary(b"NOTMAGIC").err(),
            Some(CodecError::InvalidBinaryProof)
        );
        // Correct magic but truncated body.
        assert_eq!(
            decode_binary(b"STWOPRW1").err(),
            Some(CodecError::InvalidBinaryProof)
        );
    }

    #[test]
    fn test_config_wire_round_trip() {
        let config = PcsConfig {
            pow_bits: 5,
            fri_config: FriConfig::new(2, 1, 9),
        };
        let wire = pcs_config_to_wire(config);
        assert_eq!(pcs_config_from_wire(&wire).unwrap(), config);

        let bad = PcsConfigWire {
            pow_bits: 0,
            fri_config: FriConfigWire {
                log_blowup_factor: 16,
                log_last_layer_degree_bound: 20,
                n_queries: 3,
            },
        };
        assert_eq!(pcs_config_from_wire(&bad), Err(CodecError::ValueOutOfRange));
    }
}
