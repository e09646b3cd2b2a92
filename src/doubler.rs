//! Self-concatenation of text values

/// Returns `input` followed by itself
pub fn double_string(input: &str) -> String {
    input.repeat(2)
}

/// Byte-level variant used at the C boundary, where input may not be UTF-8
pub fn double_bytes(input: &[u8]) -> Vec<u8> {
    input.repeat(2)
}
