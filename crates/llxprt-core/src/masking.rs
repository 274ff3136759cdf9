const MASK_PREFIX_LEN: usize = 3;
const MASK_SUFFIX_LEN: usize = 2;
const MASK_MIN_LEN_FOR_AFFIXES: usize = MASK_PREFIX_LEN + MASK_SUFFIX_LEN + 1;

/// Masks a secret value for display, keeping a short prefix and suffix and
/// replacing everything else with asterisks. Short values are masked
/// entirely so the affixes never leak the whole secret.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    if len == 0 {
        return String::new();
    }
    if len < MASK_MIN_LEN_FOR_AFFIXES {
        return "*".repeat(len);
    }

    let prefix: String = chars[..MASK_PREFIX_LEN].iter().collect();
    let suffix: String = chars[len - MASK_SUFFIX_LEN..].iter().collect();
    let masked_middle = "*".repeat(len - MASK_PREFIX_LEN - MASK_SUFFIX_LEN);
    format!("{prefix}{masked_middle}{suffix}")
}

/// Hashes a key string into a short, non-reversible identifier safe to log.
pub fn short_digest(value: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().take(8).map(|byte| format!("{byte:02x}")).collect()
}
