/// Decode little-endian UTF-16 bytes, stopping at the first NUL.
///
/// Unpaired surrogates become U+FFFD and a trailing odd byte is ignored, so
/// corrupt registry or cache data never aborts decoding.
pub fn utf16le_to_string(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode a `REG_MULTI_SZ` payload: NUL-separated strings ending in a double NUL.
pub fn utf16le_to_strings(data: &[u8]) -> Vec<String> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    units
        .split(|unit| *unit == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(String::from_utf16_lossy)
        .collect()
}
