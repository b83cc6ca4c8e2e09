//! Maps a payload-byte count to one of [`N`] size-bucket indices.
//!
//! Bucket 0 holds sizes in `(0, C]`. Bucket `k` in `1..N-1` holds sizes in `(C*2^(k-1), C*2^k]`.
//! The last bucket holds everything above that. The split point is chosen so doubling size
//! classes fall on power-of-two boundaries, which is what makes the closed form below just a
//! floor-log2 of a rescaled size — ported straight from the reference implementation's
//! `getBucket`/`mylog2`.

/// Number of free-list buckets.
pub const N: usize = 32;

/// Upper bound (inclusive) of bucket 0, in payload bytes.
pub const FIRST_BUCKET_CEILING: usize = 16;

/// Pure, total, deterministic: maps a payload size (`s > 0`) to a bucket index in `0..N`.
pub(crate) fn bucket_index(s: usize) -> usize {
	debug_assert!(s > 0);

	let last_ceiling = FIRST_BUCKET_CEILING << (N - 2);
	if s > last_ceiling {
		return N - 1;
	}

	let p = 2 * (s - 1) / FIRST_BUCKET_CEILING;
	if p == 0 {
		0
	} else {
		// floor(log2(p)) for p >= 1.
		(usize::BITS - 1 - p.leading_zeros()) as usize
	}
}
