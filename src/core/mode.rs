//! # Encryption Modes
//!
//! The three payload-encryption framings negotiated with the voice server.
//!
//! Each mode fixes the trailer appended after the ciphertext:
//!
//! ```text
//! xsalsa20_poly1305         [Header(12)] [Ciphertext(N)]
//! xsalsa20_poly1305_suffix  [Header(12)] [Ciphertext(N)] [Nonce(24)]
//! xsalsa20_poly1305_lite    [Header(12)] [Ciphertext(N)] [Counter(4)]
//! ```
//!
//! Modes enter the program as wire names (from the session description) or
//! numeric tags (from configuration). Both conversions are the only place an
//! unsupported mode can be reported.

use crate::error::{constants, Result, VoiceError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Size of the full cipher nonce, and of the suffix-mode trailer
pub const NONCE_SIZE: usize = 24;

/// Size of the lite-mode nonce counter trailer
pub const LITE_NONCE_SIZE: usize = 4;

/// Payload encryption framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EncryptionMode {
    /// Nonce is derived from the header; no trailer
    Base,
    /// Random 24-byte nonce appended after the ciphertext
    Suffix,
    /// 4-byte incrementing counter appended after the ciphertext
    #[default]
    Lite,
}

impl EncryptionMode {
    /// All modes, in order of preference when negotiating
    pub const PREFERENCE: [EncryptionMode; 3] = [
        EncryptionMode::Lite,
        EncryptionMode::Suffix,
        EncryptionMode::Base,
    ];

    /// Bytes appended after the ciphertext in this mode
    #[inline]
    pub const fn trailer_size(self) -> usize {
        match self {
            EncryptionMode::Base => 0,
            EncryptionMode::Suffix => NONCE_SIZE,
            EncryptionMode::Lite => LITE_NONCE_SIZE,
        }
    }

    /// Name used for this mode in the session description
    pub const fn name(self) -> &'static str {
        match self {
            EncryptionMode::Base => "xsalsa20_poly1305",
            EncryptionMode::Suffix => "xsalsa20_poly1305_suffix",
            EncryptionMode::Lite => "xsalsa20_poly1305_lite",
        }
    }

    /// Numeric tag used in configuration
    pub const fn tag(self) -> u8 {
        match self {
            EncryptionMode::Base => 0,
            EncryptionMode::Suffix => 1,
            EncryptionMode::Lite => 2,
        }
    }

    /// Pick the most preferred mode out of those the server offers.
    ///
    /// Unknown names in `offered` are ignored. Fails with
    /// [`VoiceError::UnsupportedMode`] when nothing offered is supported.
    pub fn select<'a, I>(offered: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let offered: Vec<&str> = offered.into_iter().collect();

        Self::PREFERENCE
            .into_iter()
            .find(|mode| offered.contains(&mode.name()))
            .inspect(|mode| debug!(mode = mode.name(), "Selected encryption mode"))
            .ok_or_else(|| {
                VoiceError::UnsupportedMode(format!(
                    "{}: [{}]",
                    constants::ERR_NO_COMMON_MODE,
                    offered.join(", ")
                ))
            })
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EncryptionMode {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::PREFERENCE
            .into_iter()
            .find(|mode| mode.name() == s)
            .ok_or_else(|| VoiceError::UnsupportedMode(s.to_string()))
    }
}

impl TryFrom<u8> for EncryptionMode {
    type Error = VoiceError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(EncryptionMode::Base),
            1 => Ok(EncryptionMode::Suffix),
            2 => Ok(EncryptionMode::Lite),
            other => Err(VoiceError::UnsupportedMode(format!(
                "{} (tag {other})",
                constants::ERR_UNSUPPORTED_MODE
            ))),
        }
    }
}

impl Serialize for EncryptionMode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.name().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncryptionMode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailer_sizes() {
        assert_eq!(EncryptionMode::Base.trailer_size(), 0);
        assert_eq!(EncryptionMode::Suffix.trailer_size(), 24);
        assert_eq!(EncryptionMode::Lite.trailer_size(), 4);
    }

    #[test]
    fn test_name_parsing() {
        for mode in EncryptionMode::PREFERENCE {
            assert_eq!(mode.name().parse::<EncryptionMode>().ok(), Some(mode));
        }

        let err = "aead_aes256_gcm".parse::<EncryptionMode>();
        assert!(matches!(err, Err(VoiceError::UnsupportedMode(name)) if name == "aead_aes256_gcm"));
    }

    #[test]
    fn test_tag_conversion() {
        for mode in EncryptionMode::PREFERENCE {
            assert_eq!(EncryptionMode::try_from(mode.tag()).ok(), Some(mode));
        }
        assert!(matches!(
            EncryptionMode::try_from(7),
            Err(VoiceError::UnsupportedMode(_))
        ));
    }

    #[test]
    fn test_select_prefers_lite() {
        let offered = ["xsalsa20_poly1305", "xsalsa20_poly1305_lite", "xsalsa20_poly1305_suffix"];
        assert_eq!(EncryptionMode::select(offered).ok(), Some(EncryptionMode::Lite));

        let offered = ["aead_aes256_gcm", "xsalsa20_poly1305"];
        assert_eq!(EncryptionMode::select(offered).ok(), Some(EncryptionMode::Base));
    }

    #[test]
    fn test_select_without_common_mode() {
        let result = EncryptionMode::select(["aead_aes256_gcm_rtpsize"]);
        assert!(matches!(result, Err(VoiceError::UnsupportedMode(_))));
    }
}
