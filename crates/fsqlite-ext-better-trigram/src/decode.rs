//! Total UTF-8 decoding with byte-exact offsets.
//!
//! Every byte of the input belongs to exactly one [`DecodedUnit`]. Anything
//! that is not a well-formed scalar value (stray continuation bytes, overlong
//! forms, surrogates, values above U+10FFFF, the 5..8 byte extension forms,
//! sequences truncated by a non-continuation byte or by the end of the
//! buffer) becomes one unit carrying [`SENTINEL`].
//!
//! A lead byte claims every continuation byte that follows it. When that run
//! is longer or shorter than the length the lead byte announces, the whole
//! run is one malformed unit.

/// Codepoint assigned to malformed byte sequences.
///
/// Lies outside the Unicode scalar range, so it can never equal a character
/// taken from a pattern or a query string.
pub const SENTINEL: u32 = 0x11_0000;

/// Smallest scalar value that needs an `n`-byte encoding, indexed by `n`.
const MIN_FOR_LEN: [u32; 5] = [0, 0, 0x80, 0x800, 0x1_0000];

/// One decoded character and the bytes it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedUnit {
    /// Scalar value, or [`SENTINEL`] for a malformed sequence.
    pub codepoint: u32,
    /// Offset of the first byte in the source buffer.
    pub byte_offset: usize,
    /// Number of source bytes consumed, at least 1.
    pub byte_len: usize,
}

impl DecodedUnit {
    /// Exclusive end offset of this unit's bytes.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.byte_offset + self.byte_len
    }

    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        self.codepoint == SENTINEL
    }

    /// The unit as a `char`, if it decoded to a scalar value.
    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        char::from_u32(self.codepoint)
    }
}

/// Iterator over the [`DecodedUnit`]s of a byte buffer.
#[derive(Debug, Clone)]
pub struct Utf8Units<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Utf8Units<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl Iterator for Utf8Units<'_> {
    type Item = DecodedUnit;

    fn next(&mut self) -> Option<DecodedUnit> {
        let start = self.pos;
        let lead = *self.bytes.get(start)?;

        let (codepoint, len) = match lead {
            0x00..=0x7F => (u32::from(lead), 1),
            0x80..=0xBF => (SENTINEL, 1),
            _ => decode_sequence(&self.bytes[start..], lead),
        };

        self.pos = start + len;
        Some(DecodedUnit {
            codepoint,
            byte_offset: start,
            byte_len: len,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.bytes.len() - self.pos;
        (usize::from(remaining > 0), Some(remaining))
    }
}

/// Decode a multi-byte sequence starting at `seq[0] == lead` (`lead >= 0xC0`).
///
/// All continuation bytes after `lead` are consumed. The sequence is valid
/// only when their count plus one equals the number of leading one bits in
/// `lead`. Returns the codepoint (or [`SENTINEL`]) and the number of bytes
/// consumed.
fn decode_sequence(seq: &[u8], lead: u8) -> (u32, usize) {
    let expected = lead.leading_ones() as usize;
    let len = 1 + seq
        .iter()
        .skip(1)
        .take_while(|&&b| b & 0xC0 == 0x80)
        .count();
    if len != expected || expected > 4 {
        return (SENTINEL, len);
    }

    let payload_bits = 7 - lead.leading_ones();
    let value = seq[1..len].iter().fold(
        u32::from(lead) & ((1_u32 << payload_bits) - 1),
        |acc, &b| (acc << 6) | u32::from(b & 0x3F),
    );

    if value < MIN_FOR_LEN[expected]
        || value < MIN_FOR_LEN[expected]
        || value > 0x10_FFFF
        || (0xD800..=0xDFFF).contains(&value)
    {
        return (SENTINEL, len);
    }
    (value, len)
}

/// Decode a whole buffer.
#[must_use]
pub fn decode(bytes: &[u8]) -> Vec<DecodedUnit> {
    Utf8Units::new(bytes).collect()
}
