use std::borrow::Cow;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

use crate::constants::ENCODING_SAMPLE_BYTES;

/// Share of NUL bytes in one lane before a file is treated as UTF-16
const UTF16_MIN_LANE_SHARE: f32 = 0.3;

/// Share of NUL bytes tolerated in the other lane
const UTF16_MAX_OTHER_LANE_SHARE: f32 = 0.05;

const CHARDET_CONFIDENT: f32 = 0.75;
const CHARDET_UNSURE: f32 = 0.25;

/// Outcome of encoding detection for one file
#[derive(Debug, Clone, Copy)]
pub struct DetectedEncoding {
    pub encoding: &'static Encoding,
    pub confidence: f32,
    /// Length of the byte order mark to skip before decoding
    pub bom_len: usize,
}

impl DetectedEncoding {
    fn certain(encoding: &'static Encoding, bom_len: usize) -> Self {
        Self {
            encoding,
            confidence: 1.0,
            bom_len,
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Detect the text encoding of raw evidence bytes.
///
/// Order: byte order mark, UTF-16 lane heuristic, strict UTF-8, then a
/// statistical guess.
pub fn detect_encoding(bytes: &[u8]) -> DetectedEncoding {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return DetectedEncoding::certain(encoding, bom_len);
    }

    if let Some(detected) = detect_utf16(bytes) {
        return detected;
    }

    if std::str::from_utf8(bytes).is_ok() {
        return DetectedEncoding::certain(UTF_8, 0);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (encoding, confident) = detector.guess_assess(None, false);
    DetectedEncoding {
        encoding,
        confidence: if confident { CHARDET_CONFIDENT } else { CHARDET_UNSURE },
        bom_len: 0,
    }
}

/// BOM-less UTF-16 of mostly-ASCII text has a NUL in every other byte
fn detect_utf16(bytes: &[u8]) -> Option<DetectedEncoding> {
    let sample = &bytes[..bytes.len().min(ENCODING_SAMPLE_BYTES)];
    let pairs = sample.len() / 2;
    if pairs == 0 {
        return None;
    }

    let (mut even_nuls, mut odd_nuls) = (0usize, 0usize);
    for pair in sample.chunks_exact(2) {
        if pair[0] == 0 {
            even_nuls += 1;
        }
        if pair[1] == 0 {
            odd_nuls += 1;
        }
    }

    let even = even_nuls as f32 / pairs as f32;
    let odd = odd_nuls as f32 / pairs as f32;

    if odd >= UTF16_MIN_LANE_SHARE && even <= UTF16_MAX_OTHER_LANE_SHARE {
        Some(DetectedEncoding {
            encoding: UTF_16LE,
            confidence: odd,
            bom_len: 0,
        })
    } else if even >= UTF16_MIN_LANE_SHARE && odd <= UTF16_MAX_OTHER_LANE_SHARE {
        Some(DetectedEncoding {
            encoding: UTF_16BE,
            confidence: even,
            bom_len: 0,
        })
    } else {
        None
    }
}

/// Strictly decode `bytes`; `None` when any sequence is malformed
pub fn decode<'a>(bytes: &'a [u8], detected: &DetectedEncoding) -> Option<Cow<'a, str>> {
    let body = &bytes[detected.bom_len.min(bytes.len())..];
    detected
        .encoding
        .decode_without_bom_handling_and_without_replacement(body)
}
