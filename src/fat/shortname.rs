//! Short-name (8.3) encoding (spec §4.2.1), grounded in
//! `original_source/emFile/FS/FS_FAT_Open.c`'s `FS_FAT_StoreShortName` /
//! `FS_FAT_StoreShortNameMB` / `FS_FAT_MakeShortName`.

use super::charset::CharSet;
use crate::error::{Error, Result};

/// An 11-byte `FS_83NAME`: 8 bytes name + 3 bytes extension, upper-case,
/// space-padded (spec §3.1).
pub type ShortName = [u8; 11];

const MAX_SCAN_BYTES: usize = 13;

/// Encodes `input` into an 8.3 short name using `charset` for decode and
/// character-validity decisions (spec §4.2.1 rules 1, 6), folding to
/// upper-case and substituting `0xE5` -> `0x05` per rule 5.
///
/// `accept_multiple_dots`: legacy compatibility flag (rule 2).
pub fn encode_short_name(
    input: &[u8],
    charset: &dyn CharSet,
    accept_multiple_dots: bool,
) -> Result<ShortName> {
    // Dots are not stored here; only the non-dot characters scanned so
    // far, in order. `split_at` is the count of those characters at the
    // moment the most recently seen dot was scanned, so a later dot
    // always wins and folds everything before it (previously-classified
    // extension bytes included) back into the name -- rule 2.
    let mut chars = [0u8; MAX_SCAN_BYTES];
    let mut char_count = 0usize;
    let mut dot_count = 0usize;
    let mut split_at = 0usize;

    let mut scanned_bytes = 0usize;
    let mut rest = input;

    while scanned_bytes < MAX_SCAN_BYTES && !rest.is_empty() {
        let decoded = charset.decode(rest).ok_or(Error::InvalidPara)?;
        scanned_bytes += decoded.len;
        rest = &rest[decoded.len..];

        if decoded.ch == b'.' {
            dot_count += 1;
            if dot_count > 1 && !accept_multiple_dots {
                return Err(Error::InvalidPara);
            }
            split_at = char_count;
            continue;
        }

        let folded = fold_upper(decoded.ch);
        if !charset.is_valid_short_name_char(folded) {
            return Err(Error::InvalidPara);
        }

        if char_count >= chars.len() {
            return Err(Error::InvalidPara);
        }
        chars[char_count] = folded;
        char_count += 1;
    }

    let name_len = if dot_count == 0 { char_count } else { split_at };
    let ext_len = char_count - name_len;

    if !(1..=8).contains(&name_len) {
        return Err(Error::InvalidPara);
    }
    if ext_len > 3 {
        return Err(Error::InvalidPara);
    }

    let mut out = [b' '; 11];
    out[..name_len].copy_from_slice(&chars[..name_len]);
    out[8..8 + ext_len].copy_from_slice(&chars[name_len..name_len + ext_len]);

    if out[0] == 0xE5 {
        out[0] = 0x05;
    }

    Ok(out)
}

fn fold_upper(ch: u8) -> u8 {
    match ch {
        b'a'..=b'z' => ch - b'a' + b'A',
        other => other,
    }
}

/// Decodes a `ShortName` back into a display string written into `out`,
/// returning the used length. Reverses the padding/substitution of
/// `encode_short_name`, satisfying invariant 5
/// (`short_name_encode(decode(x)) = x`).
pub fn decode_short_name(name: &ShortName, out: &mut [u8; 13]) -> usize {
    let mut first = name[0];
    if first == 0x05 {
        first = 0xE5;
    }

    let mut len = 0;
    out[len] = first;
    len += 1;
    for &b in &name[1..8] {
        if b == b' ' {
            break;
        }
        out[len] = b;
        len += 1;
    }

    let ext_len = name[8..11].iter().take_while(|&&b| b != b' ').count();
    if ext_len > 0 {
        out[len] = b'.';
        len += 1;
        out[len..len + ext_len].copy_from_slice(&name[8..8 + ext_len]);
        len += ext_len;
    }

    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fat::charset::AsciiCharSet;

    #[test]
    fn encodes_simple_name() {
        let n = encode_short_name(b"readme.txt", &AsciiCharSet, false).unwrap();
        assert_eq!(&n, b"README  TXT");
    }

    #[test]
    fn rejects_empty_name() {
        assert!(encode_short_name(b".txt", &AsciiCharSet, false).is_err());
    }

    #[test]
    fn rejects_second_dot_by_default() {
        assert!(encode_short_name(b"a.b.c", &AsciiCharSet, false).is_err());
    }

    #[test]
    fn accepts_second_dot_with_legacy_flag() {
        let n = encode_short_name(b"a.b.c", &AsciiCharSet, true).unwrap();
        // second dot folds into the name per rule 2; `c` becomes the ext.
        assert_eq!(&n[8..], b"C  ");
    }

    #[test]
    fn substitutes_e5_first_byte() {
        // 0xE5 is not itself a valid ASCII short-name char via our table,
        // so exercise the substitution through a name that legitimately
        // starts at the boundary via direct short-name round trip instead.
        let mut sn: ShortName = *b"\x05ILE    TXT";
        sn.copy_from_slice(b"\x05ILE    TXT");
        let mut buf = [0u8; 13];
        let len = decode_short_name(&sn, &mut buf);
        assert_eq!(&buf[..len], b"\xE5ILE.TXT");
    }

    #[test]
    fn round_trips_extension_only_stem() {
        let n = encode_short_name(b"a", &AsciiCharSet, false).unwrap();
        let mut buf = [0u8; 13];
        let len = decode_short_name(&n, &mut buf);
        assert_eq!(&buf[..len], b"A");
    }
}
