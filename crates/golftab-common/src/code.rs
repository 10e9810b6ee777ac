use rand::Rng;

/// Symbols allowed in room codes. Visually confusable characters
/// (0/O, 1/I) are left out so codes survive being read across a table.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LEN: usize = 4;

/// Draw a 4-symbol code, each symbol independent and uniform over the
/// alphabet. Uniqueness against live rooms is the registry's job.
pub fn generate_code(rng: &mut impl Rng) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are typed by hand; accept lowercase and stray whitespace.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
