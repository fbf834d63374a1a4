//! Tolerant text decoding for game-shipped files (user.cfg, global.ini, profiles).

/// Decode bytes with BOM detection (UTF-8 / UTF-16LE / UTF-16BE) and a lossy UTF-8 fallback.
/// A leading BOM and embedded NULs are stripped from the result.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut out = if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        String::from_utf8_lossy(rest).into_owned()
    } else if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        utf16(rest, u16::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        utf16(rest, u16::from_be_bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    };

    if out.starts_with('\u{feff}') {
        out.remove(0);
    }
    if out.contains('\0') {
        out.retain(|c| c != '\0');
    }
    out
}

fn utf16(data: &[u8], word: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|ch| word([ch[0], ch[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// True when the bytes look like a textual XML document (after any BOM and leading whitespace).
pub fn looks_like_xml(bytes: &[u8]) -> bool {
    decode_text(bytes).trim_start().starts_with('<')
}
