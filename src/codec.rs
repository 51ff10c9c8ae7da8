//! Transport encodings and canonical payload serialization.
//!
//! Every wire format in the crate (tokens, credential hashes, signed
//! messages, cipher texts) is built from segments rendered with an
//! [`Encoding`]. None of the supported alphabets contain `.` or `:`, so
//! those characters stay free to act as segment separators.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::Serialize;

use crate::error::{CryptError, Result};

/// Text encoding used for every wire segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase hexadecimal.
    #[default]
    Hex,
    /// Standard base64 with padding.
    Base64,
    /// URL-safe base64 without padding.
    Base64Url,
}

impl Encoding {
    /// Renders `bytes` as text. Never fails; empty input gives an empty string.
    pub fn encode(&self, bytes: impl AsRef<[u8]>) -> String {
        match self {
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
        }
    }

    /// Parses text produced by [`Encoding::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptError::MalformedEncoding`] when the input contains
    /// characters outside the alphabet or has an impossible length.
    pub fn decode(&self, text: &str) -> Result<Vec<u8>> {
        let decoded = match self {
            Encoding::Hex => hex::decode(text).map_err(|e| e.to_string()),
            Encoding::Base64 => STANDARD.decode(text).map_err(|e| e.to_string()),
            Encoding::Base64Url => URL_SAFE_NO_PAD.decode(text).map_err(|e| e.to_string()),
        };
        decoded.map_err(|reason| CryptError::MalformedEncoding(format!("{self}: {reason}")))
    }

    /// Decodes and requires the result to be UTF-8.
    pub fn decode_utf8(&self, text: &str) -> Result<String> {
        String::from_utf8(self.decode(text)?)
            .map_err(|_| CryptError::MalformedEncoding(format!("{self}: not valid UTF-8")))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Hex => "hex",
            Encoding::Base64 => "base64",
            Encoding::Base64Url => "base64url",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = CryptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(Encoding::Hex),
            "base64" => Ok(Encoding::Base64),
            "base64url" => Ok(Encoding::Base64Url),
            other => Err(CryptError::MalformedEncoding(format!(
                "unknown encoding '{other}'"
            ))),
        }
    }
}

/// Serializes any payload to its canonical JSON text.
///
/// Strings are JSON-encoded like every other value, so `"abc"` becomes
/// `"\"abc\""`. This is the single rule used by signing, tokens and ciphers.
pub fn serialize<T: Serialize + ?Sized>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALL: [Encoding; 3] = [Encoding::Hex, Encoding::Base64, Encoding::Base64Url];

    #[test]
    fn empty_input_round_trips() {
        for enc in ALL {
            assert_eq!(enc.encode([0u8; 0]), "");
            assert_eq!(enc.decode("").unwrap(), Vec::<u8>::new());
        }
    }

    #[test]
    fn hex_is_lowercase() {
        assert_eq!(Encoding::Hex.encode([0xABu8, 0x01]), "ab01");
    }

    #[test]
    fn encoded_text_never_contains_separators() {
        let bytes: Vec<u8> = (0..=255).collect();
        for enc in ALL {
            let text = enc.encode(&bytes);
            assert!(!text.contains('.'), "{enc} produced '.'");
            assert!(!text.contains(':'), "{enc} produced ':'");
        }
    }

    #[test]
    fn invalid_hex_is_malformed() {
        assert!(matches!(
            Encoding::Hex.decode("zz"),
            Err(CryptError::MalformedEncoding(_))
        ));
        assert!(matches!(
            Encoding::Hex.decode("abc"),
            Err(CryptError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn invalid_base64_is_malformed() {
        assert!(Encoding::Base64.decode("@@@@").is_err());
        assert!(Encoding::Base64Url.decode("a+b/").is_err());
    }

    #[test]
    fn decode_utf8_rejects_binary() {
        let text = Encoding::Hex.encode([0xffu8, 0xfe]);
        assert!(Encoding::Hex.decode_utf8(&text).is_err());
    }

    #[test]
    fn encoding_parses_case_insensitively() {
        assert_eq!("HEX".parse::<Encoding>().unwrap(), Encoding::Hex);
        assert_eq!("base64url".parse::<Encoding>().unwrap(), Encoding::Base64Url);
        assert!("latin1".parse::<Encoding>().is_err());
    }

    #[test]
    fn strings_are_always_json_encoded() {
        assert_eq!(serialize("abc").unwrap(), "\"abc\"");
        assert_eq!(serialize(&json!({"id": "abc"})).unwrap(), r#"{"id":"abc"}"#);
        assert_eq!(serialize(&42).unwrap(), "42");
    }
}
