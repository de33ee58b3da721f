//! Determinism checks.
//!
//! Runs a producer several times and compares the bytes it returns.

use std::fmt;

/// Result of a determinism verification.
#[derive(Debug, Clone)]
pub struct DeterminismResult {
    /// Whether all runs produced identical output.
    pub is_deterministic: bool,
    /// Number of runs performed.
    pub runs: usize,
    /// Size of the first run's output in bytes.
    pub output_size: usize,
    /// BLAKE3 hash of the first run's output.
    pub hash: String,
    /// First differing run and byte offset, if any.
    pub first_difference: Option<(usize, usize)>,
}

impl fmt::Display for DeterminismResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.first_difference {
            None => write!(f, "{} runs identical ({} bytes, {})", self.runs, self.output_size, self.hash),
            Some((run, offset)) => write!(f, "run {} differs from run 0 at byte {}", run, offset),
        }
    }
}

/// BLAKE3 hash of `bytes` as hex.
pub fn compute_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Runs `produce` `runs` times and compares every output with the first.
pub fn verify_determinism<F>(produce: F, runs: usize) -> DeterminismResult
where
    F: Fn() -> Vec<u8>,
{
    let first = produce();
    let mut first_difference = None;
    for run in 1..runs.max(1) {
        let next = produce();
        if next != first {
            let offset = first
                .iter()
                .zip(&next)
                .position(|(a, b)| a != b)
                .unwrap_or(first.len().min(next.len()));
            first_difference = Some((run, offset));
            break;
        }
    }
    DeterminismResult {
        is_deterministic: first_difference.is_none(),
        runs: runs.max(1),
        output_size: first.len(),
        hash: compute_hash(&first),
        first_difference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_constant_producer_is_deterministic() {
        let result = verify_determinism(|| vec![1, 2, 3], 4);
        assert!(result.is_deterministic);
        assert_eq!(result.runs, 4);
        assert_eq!(result.hash, compute_hash(&[1, 2, 3]));
    }

    #[test]
    fn test_changing_producer_is_caught() {
        let counter = Cell::new(0u8);
        let result = verify_determinism(
            || {
                counter.set(counter.get() + 1);
                vec![0, 0, counter.get()]
            },
            3,
        );
        assert!(!result.is_deterministic);
        assert_eq!(result.first_difference, Some((1, 2)));
    }
}
