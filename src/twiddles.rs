//! Precomputed twiddle factors for the circle FFT
//!
//! A twiddle tree built over a root coset serves every domain whose half
//! coset is a doubling-descendant of that root: each FFT layer's twiddles are
//! a suffix slice of the shared buffer. Forward and inverse twiddles are kept
//! side by side so interpolation never inverts on the hot path.

use crate::circle::{CircleDomain, Coset};
use crate::fields::{batch_inverse, batch_inverse_chunked};
use crate::m31::M31;
use crate::utils::bit_reverse;

/// Twiddle inversion switches to the chunked batch inverse above this size.
pub const CHUNK_LOG_SIZE: u32 = 12;

/// Forward and inverse twiddles aligned with a root coset.
///
/// Invariant: `twiddles[i] * itwiddles[i] = 1` for every index.
#[derive(Clone, Debug)]
pub struct TwiddleTree {
    pub root_coset: Coset,
    pub twiddles: Vec<M31>,
    pub itwiddles: Vec<M31>,
}

/// Builds the twiddle tree for `root_coset`.
///
/// Layer `k` holds the x-coordinates of the first half of the `k`-times
/// doubled coset, bit-reversed; layers are concatenated and the buffer is
/// padded with a trailing one so its length is exactly `root_coset.size()`.
pub fn precompute_twiddles(root_coset: Coset) -> TwiddleTree {
    let mut twiddles = Vec::with_capacity(root_coset.size());
    let mut coset = root_coset;
    for _ in 0..root_coset.log_size {
        let layer_start = twiddles.len();
        twiddles.extend(coset.iter().take(coset.size() / 2).map(|p| p.x));
        bit_reverse(&mut twiddles[layer_start..]);
        coset = coset.double();
    }
    twiddles.push(M31::ONE);

    let itwiddles = if twiddles.len() > (1 << CHUNK_LOG_SIZE) {
        batch_inverse_chunked(&twiddles, 1 << CHUNK_LOG_SIZE)
    } else {
        batch_inverse(&twiddles)
    }
    .expect("coset twiddles are non-zero");

    TwiddleTree {
        root_coset,
        twiddles,
        itwiddles,
    }
}

/// Slices the per-layer line twiddles for `domain` off the tail of a tree
/// buffer. Works for any doubling-descendant of the tree's root coset, since
/// smaller layers are shared suffixes.
pub fn domain_line_twiddles_from_tree<T>(domain: CircleDomain, buffer: &[T]) -> Vec<&[T]> {
    (0..domain.half_coset.log_size)
        .map(|i| {
            let len = 1 << i;
            &buffer[buffer.len() - len * 2..buffer.len() - len]
        })
        .rev()
        .collect()
}
