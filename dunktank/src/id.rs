use nanoid::nanoid;
use uuid::Uuid;

/// Alphabet for user identifiers (no ambiguous glyphs).
const USER_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
const USER_ID_LENGTH: usize = 20;

/// Generates a post identifier. Posts use random v4 UUIDs so clients can mint them offline.
pub fn generate_post_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn generate_user_id() -> String {
    nanoid!(USER_ID_LENGTH, USER_ID_ALPHABET)
}
