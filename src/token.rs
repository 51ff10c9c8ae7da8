//! Expiring bearer tokens.
//!
//! A token is `encodedPayload.signature[.encodedExpiry]`. Each segment is
//! rendered with the same [`Encoding`]; the signature covers the serialized
//! payload text, not its encoded segment. The optional third segment is an
//! RFC 3339 UTC timestamp.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec::{self, Encoding};
use crate::error::{CryptError, Result};
use crate::expiry::{self, ExpirySpec};
use crate::key::Key;
use crate::sign::{self, Algorithm};

/// Separator between token segments.
pub const TOKEN_SEPARATOR: char = '.';

/// Options for [`create_token`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenOptions {
    /// `None` issues a token that never expires.
    pub expiry: Option<ExpirySpec>,
    pub algorithm: Algorithm,
    pub encoding: Encoding,
}

/// Where the verifier takes the signed payload from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PayloadSource {
    /// Decode the token's own payload segment.
    #[default]
    Embedded,
    /// Use this serialized payload instead; the embedded segment is ignored
    /// for the signature check.
    Detached(String),
}

impl PayloadSource {
    /// Serializes `payload` the same way [`create_token`] does.
    pub fn detached<T: Serialize + ?Sized>(payload: &T) -> Result<Self> {
        Ok(PayloadSource::Detached(codec::serialize(payload)?))
    }
}

/// Options for [`verify_token`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    pub algorithm: Algorithm,
    pub encoding: Encoding,
    pub payload: PayloadSource,
}

/// The parsed parts of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken {
    payload: String,
    signature: Vec<u8>,
    expiry: Option<DateTime<Utc>>,
}

impl BearerToken {
    /// Serialized payload text, exactly as it was signed.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    pub fn encode(&self, encoding: Encoding) -> String {
        let mut token = format!(
            "{}{TOKEN_SEPARATOR}{}",
            encoding.encode(self.payload.as_bytes()),
            encoding.encode(&self.signature)
        );
        if let Some(expiry) = &self.expiry {
            token.push(TOKEN_SEPARATOR);
            token.push_str(&encoding.encode(expiry::format_timestamp(expiry)));
        }
        token
    }

    /// Splits and decodes a token.
    ///
    /// # Errors
    ///
    /// [`CryptError::MalformedToken`] unless there are exactly two or three
    /// segments, each decodable; the payload must be UTF-8 and the expiry a
    /// valid timestamp.
    pub fn parse(token: &str, encoding: Encoding) -> Result<Self> {
        let segments: Vec<&str> = token.split(TOKEN_SEPARATOR).collect();
        if !(2..=3).contains(&segments.len()) {
            return Err(CryptError::MalformedToken(format!(
                "expected 2 or 3 segments, got {}",
                segments.len()
            )));
        }

        let payload = encoding
            .decode_utf8(segments[0])
            .map_err(|e| CryptError::MalformedToken(format!("payload segment: {e}")))?;
        let signature = encoding
            .decode(segments[1])
            .map_err(|e| CryptError::MalformedToken(format!("signature segment: {e}")))?;
        let expiry = match segments.get(2) {
            Some(segment) => {
                let text = encoding
                    .decode_utf8(segment)
                    .map_err(|e| CryptError::MalformedToken(format!("expiry segment: {e}")))?;
                let at = expiry::parse_timestamp(&text).ok_or_else(|| {
                    CryptError::MalformedToken(format!("expiry segment is not a timestamp: {text:?}"))
                })?;
                Some(at)
            }
            None => None,
        };

        Ok(Self {
            payload,
            signature,
            expiry,
        })
    }
}

/// Outcome of [`verify_token`].
///
/// `verified` and `expired` are independent: a token may carry a valid
/// signature and still be expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenVerification {
    pub expiry: Option<DateTime<Utc>>,
    pub expired: bool,
    pub verified: bool,
    /// Serialized payload the signature was checked against.
    pub payload: String,
}

impl TokenVerification {
    /// Signature good and not expired.
    pub fn is_valid(&self) -> bool {
        self.verified && !self.expired
    }

    /// Deserializes the payload.
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Issues a token for `payload`, signed with `key`.
pub fn create_token<T: Serialize + ?Sized>(
    payload: &T,
    key: &Key,
    options: &TokenOptions,
) -> Result<String> {
    create_token_with_clock(payload, key, options, &SystemClock)
}

pub fn create_token_with_clock<T: Serialize + ?Sized>(
    payload: &T,
    key: &Key,
    options: &TokenOptions,
    clock: &dyn Clock,
) -> Result<String> {
    let expiry = options
        .expiry
        .map(|spec| spec.resolve(clock.now()))
        .transpose()?;
    let payload = codec::serialize(payload)?;
    let signature = sign::sign(payload.as_bytes(), key, options.algorithm)?;

    let token = BearerToken {
        payload,
        signature,
        expiry,
    };
    debug!(
        algorithm = %options.algorithm,
        encoding = %options.encoding,
        expires = ?token.expiry,
        "created token"
    );
    Ok(token.encode(options.encoding))
}

/// Checks a token's signature and expiry.
///
/// A well-formed token that fails the signature check is reported with
/// `verified == false`, not as an error.
pub fn verify_token(token: &str, key: &Key, options: &VerifyOptions) -> Result<TokenVerification> {
    verify_token_with_clock(token, key, options, &SystemClock)
}

pub fn verify_token_with_clock(
    token: &str,
    key: &Key,
    options: &VerifyOptions,
    clock: &dyn Clock,
) -> Result<TokenVerification> {
    let parsed = BearerToken::parse(token, options.encoding)?;
    let payload = match &options.payload {
        PayloadSource::Embedded => parsed.payload,
        PayloadSource::Detached(serialized) => serialized.clone(),
    };

    let verified = sign::verify(
        payload.as_bytes(),
        &parsed.signature,
        key,
        options.algorithm,
    )?;
    let expired = parsed.expiry.is_some_and(|at| clock.now() > at);

    if !verified {
        warn!(algorithm = %options.algorithm, "token signature did not verify");
    } else if expired {
        debug!(expiry = ?parsed.expiry, "token signature valid but expired");
    }

    Ok(TokenVerification {
        expiry: parsed.expiry,
        expired,
        verified,
        payload,
    })
}
