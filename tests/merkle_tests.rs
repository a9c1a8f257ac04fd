//! Soundness tests for the lifted Merkle commitment

use circlet::m31::M31;
use circlet::merkle::{
    Blake2sMerkleHasher, MerkleTreeLifted, MerkleVerificationError, MerkleVerifierLifted,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Tree = MerkleTreeLifted<Blake2sMerkleHasher>;
type Verifier = MerkleVerifierLifted<Blake2sMerkleHasher>;

fn random_columns(rng: &mut StdRng, log_size: u32, n_cols: usize) -> Vec<Vec<M31>> {
    (0..n_cols)
        .map(|_| {
            (0..(1usize << log_size))
                .map(|_| M31::from_u32_unchecked(rng.gen_range(0..circlet::m31::P)))
                .collect()
        })
        .collect()
}

fn queried(columns: &[Vec<M31>], positions: &[usize]) -> Vec<Vec<M31>> {
    columns
        .iter()
        .map(|col| positions.iter().map(|&p| col[p]).collect())
        .collect()
}

#[test]
fn test_random_query_sets_verify() {
    let mut rng = StdRng::seed_from_u64(91);
    for log_size in 1..=8u32 {
        let columns = random_columns(&mut rng, log_size, 3);
        let refs: Vec<&[M31]> = columns.iter().map(|c| c.as_slice()).collect();
        let tree = Tree::build(&refs);
        let verifier = Verifier::new(tree.root(), vec![log_size; 3]);

        let n = 1usize << log_size;
        let mut positions: Vec<usize> = (0..n).filter(|_| rng.gen_bool(0.4)).collect();
        if positions.is_empty() {
            positions.push(rng.gen_range(0..n));
        }
        let decommitment = tree.decommit(&positions);
        let values = queried(&columns, &positions);
        assert!(
            verifier.verify(&positions, &values, &decommitment).is_ok(),
            "log size {log_size} failed"
        );
    }
}

#[test]
fn test_every_witness_byte_flip_is_caught() {
    let mut rng = StdRng::seed_from_u64(92);
    let columns = random_columns(&mut rng, 5, 2);
    let refs: Vec<&[M31]> = columns.iter().map(|c| c.as_slice()).collect();
    let tree = Tree::build(&refs);
    let verifier = Verifier::new(tree.root(), vec![5, 5]);

    let positions = vec![1, 8, 9, 30];
    let decommitment = tree.decommit(&positions);
    let values = queried(&columns, &positions);

    for witness_index in 0..decommitment.hash_witness.len() {
        for byte_index in [0usize, 13, 31] {
            let mut tampered = decommitment.clone();
            tampered.hash_witness[witness_index][byte_index] ^= 0x40;
            assert_eq!(
                verifier.verify(&positions, &values, &tampered),
                Err(MerkleVerificationError::RootMismatch),
                "witness {witness_index} byte {byte_index} not caught"
            );
        }
    }
}

#[test]
fn test_every_queried_value_mutation_is_caught() {
    let mut rng = StdRng::seed_from_u64(93);
    let columns = random_columns(&mut rng, 4, 2);
    let refs: Vec<&[M31]> = columns.iter().map(|c| c.as_slice()).collect();
    let tree = Tree::build(&refs);
    let verifier = Verifier::new(tree.root(), vec![4, 4]);

    let positions = vec![0, 7, 12];
    let decommitment = tree.decommit(&positions);
    let values = queried(&columns, &positions);

    for col in 0..values.len() {
        for row in 0..values[col].len() {
            let mut tampered = values.clone();
            tampered[col][row] += M31::ONE;
            assert_eq!(
                verifier.verify(&positions, &tampered, &decommitment),
                Err(MerkleVerificationError::RootMismatch),
                "value ({col}, {row}) not caught"
            );
        }
    }
}

#[test]
fn test_length_mutations_are_caught() {
    let mut rng = StdRng::seed_from_u64(94);
    let columns = random_columns(&mut rng, 4, 1);
    let refs: Vec<&[M31]> = columns.iter().map(|c| c.as_slice()).collect();
    let tree = Tree::build(&refs);
    let verifier = Verifier::new(tree.root(), vec![4]);

    let positions = vec![3, 10];
    let decommitment = tree.decommit(&positions);
    let values = queried(&columns, &positions);

    let mut missing_hash = decommitment.clone();
    missing_hash.hash_witness.pop();
    assert_eq!(
        verifier.verify(&positions, &values, &missing_hash),
        Err(MerkleVerificationError::WitnessTooShort)
    );

    let mut extra_hash = decommitment.clone();
    extra_hash.hash_witness.push([0xab; 32]);
    assert_eq!(
        verifier.verify(&positions, &values, &extra_hash),
        Err(MerkleVerificationError::WitnessTooLong)
    );

    let mut missing_value = values.clone();
    missing_value[0].pop();
    assert_eq!(
        verifier.verify(&positions, &missing_value, &missing_hash),
        Err(MerkleVerificationError::WitnessTooShort)
    );
}

#[test]
fn test_root_substitution_fails() {
    let mut rng = StdRng::seed_from_u64(95);
    let columns_a = random_columns(&mut rng, 4, 1);
    let columns_b = random_columns(&mut rng, 4, 1);
    let refs_a: Vec<&[M31]> = columns_a.iter().map(|c| c.as_slice()).collect();
    let refs_b: Vec<&[M31]> = columns_b.iter().map(|c| c.as_slice()).collect();
    let tree_a = Tree::build(&refs_a);
    let tree_b = Tree::build(&refs_b);

    let verifier = Verifier::new(tree_b.root(), vec![4]);
    let positions = vec![2, 5];
    let decommitment = tree_a.decommit(&positions);
    let values = queried(&columns_a, &positions);
    assert_eq!(
        verifier.verify(&positions, &values, &decommitment),
        Err(MerkleVerificationError::RootMismatch)
    );
}
