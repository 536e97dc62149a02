pub mod gif;

pub use gif::GifParser;

use crate::error::CapfetchError;

/// A parsed captcha: the challenge the human must transcribe, plus the
/// rendered image bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captcha {
    /// Raw challenge bytes as emitted by the generator, conventionally
    /// exactly 5 lowercase ASCII letters.
    pub text: Vec<u8>,
    /// Image container bytes (GIF), starting at the detected boundary.
    pub image: Vec<u8>,
}

impl Captcha {
    /// Challenge text as a displayable string. Lossy: the generator
    /// contract says lowercase ASCII, but the split itself is bytewise.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

/// Trait for splitting generator stdout into challenge text and image.
/// One implementation per image container format.
pub trait OutputParser: Send + Sync {
    /// Split raw stdout bytes into a `Captcha`. Pure: the same input
    /// always yields the same split.
    fn parse(&self, stdout: &[u8]) -> Result<Captcha, CapfetchError>;
}
