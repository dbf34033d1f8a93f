//! Locally generated record ids.

use rand::Rng;

const RANDOM_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates an id of the form `prefix_timestamp_random`.
///
/// The random suffix is nine lowercase base36 characters.
pub fn generate_id(prefix: &str, now_ms: i64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{prefix}_{now_ms}_{suffix}")
}
