//! Record id generation.

use rand::Rng;

/// Characters of a base-32 digit, lowercase.
const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Length of a generated id.
pub const ID_LENGTH: usize = 5;

/// Generate a short random id.
///
/// Ids are five base-32 characters (about 33 million values). They are not
/// checked against existing records, so collisions become likely once a
/// namespace holds a few thousand records.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::thread_rng();
    (0..ID_LENGTH)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_id_shape() {
        for _ in 0..100 {
            let id = generate_id();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_ids_vary() {
        let ids: std::collections::HashSet<String> = (0..50).map(|_| generate_id()).collect();
        assert!(ids.len() > 1);
    }
}
