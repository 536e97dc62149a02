use crate::error::CapfetchError;
use crate::parsers::{Captcha, OutputParser};

/// Common prefix of the GIF87a/GIF89a signatures.
pub const GIF_MAGIC: &[u8] = b"GIF8";

/// Conventional challenge length. The signature scan does not assume it;
/// only the fixed-offset fallback does.
pub const CHALLENGE_LEN: usize = 5;

/// Splits generator stdout of the form `[challenge bytes][GIF stream]`.
///
/// Strategy, in priority order:
/// 1. Scan for the GIF signature. A hit at offset >= 5 is authoritative:
///    the image start is self-identifying, so the text is whatever
///    precedes it, fixed-length or not.
/// 2. If the signature is absent (or implausibly early, which would leave
///    less than a full challenge of text), fall back to a hard split at
///    offset 5 — the conventional challenge length.
/// 3. Fewer than 5 bytes can satisfy neither strategy.
pub struct GifParser;

impl OutputParser for GifParser {
    fn parse(&self, stdout: &[u8]) -> Result<Captcha, CapfetchError> {
        if stdout.len() < CHALLENGE_LEN {
            return Err(CapfetchError::Parse("insufficient data".to_string()));
        }

        let split_at = match find_signature(stdout) {
            Some(pos) if pos >= CHALLENGE_LEN => pos,
            _ => CHALLENGE_LEN,
        };

        Ok(Captcha {
            text: stdout[..split_at].to_vec(),
            image: stdout[split_at..].to_vec(),
        })
    }
}

/// Byte offset of the first GIF signature occurrence, if any.
fn find_signature(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(GIF_MAGIC.len())
        .position(|w| w == GIF_MAGIC)
}
