use std::sync::OnceLock;

use chrono::{TimeDelta, TimeZone, Utc};
use proptest::prelude::*;
use sealkit::crypto::{KeyPair, KeyPairAlgorithm, KeyPairOptions, generate_key_pair};
use sealkit::kdf::{Kdf, ScryptParams};
use sealkit::sign::{self, SignedMessage};
use sealkit::token::{create_token_with_clock, verify_token_with_clock};
use sealkit::{
    Algorithm, BearerToken, CryptError, Encoding, ExpirySpec, HashOptions, Key, ManualClock,
    SignOptions, TokenOptions, VerifyOptions, compare, create_token, hash, verify_token,
};
use serde_json::{Value, json};

fn rsa_pair() -> &'static KeyPair {
    static PAIR: OnceLock<KeyPair> = OnceLock::new();
    PAIR.get_or_init(|| {
        generate_key_pair(&KeyPairOptions {
            algorithm: KeyPairAlgorithm::Rsa { bits: 1024 },
            ..KeyPairOptions::default()
        })
        .unwrap()
    })
}

fn hmac_key() -> Key {
    Key::secret(b"integration-secret-integration-secret".to_vec())
}

fn hmac_token_options() -> TokenOptions {
    TokenOptions {
        algorithm: Algorithm::HmacSha256,
        ..TokenOptions::default()
    }
}

fn hmac_verify_options() -> VerifyOptions {
    VerifyOptions {
        algorithm: Algorithm::HmacSha256,
        ..VerifyOptions::default()
    }
}

fn fast_hash() -> HashOptions {
    HashOptions {
        kdf: Kdf::Scrypt(ScryptParams::new(10, 8, 1).unwrap()),
        ..HashOptions::default()
    }
}

fn any_encoding() -> impl Strategy<Value = Encoding> {
    prop_oneof![
        Just(Encoding::Hex),
        Just(Encoding::Base64),
        Just(Encoding::Base64Url),
    ]
}

fn json_payload() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        ".{0,24}".prop_map(Value::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

#[test]
fn rsa_token_for_id_payload() {
    let pair = rsa_pair();
    let payload = json!({"id": "abc"});

    let plain = create_token(&payload, &pair.signing_key(), &TokenOptions::default()).unwrap();
    assert_eq!(plain.split('.').count(), 2);

    let options = TokenOptions {
        expiry: Some("24hrs".parse().unwrap()),
        ..TokenOptions::default()
    };
    let expiring = create_token(&payload, &pair.signing_key(), &options).unwrap();
    assert_eq!(expiring.split('.').count(), 3);

    let result = verify_token(&expiring, &pair.verifying_key(), &VerifyOptions::default()).unwrap();
    assert!(result.verified);
    assert!(!result.expired);
    let expected = Utc::now() + TimeDelta::hours(24);
    assert!((result.expiry.unwrap() - expected).num_milliseconds().abs() < 1_000);
}

#[test]
fn private_key_also_verifies() {
    let pair = rsa_pair();
    let token = create_token("abc", &pair.signing_key(), &TokenOptions::default()).unwrap();
    let result = verify_token(&token, &pair.signing_key(), &VerifyOptions::default()).unwrap();
    assert!(result.verified);
}

#[test]
fn token_from_another_key_is_unverified() {
    let pair = rsa_pair();
    let other = generate_key_pair(&KeyPairOptions {
        algorithm: KeyPairAlgorithm::Rsa { bits: 1024 },
        ..KeyPairOptions::default()
    })
    .unwrap();

    let token = create_token("abc", &other.signing_key(), &TokenOptions::default()).unwrap();
    let result = verify_token(&token, &pair.verifying_key(), &VerifyOptions::default()).unwrap();
    assert!(!result.verified);
}

#[test]
fn expiry_window_with_manual_clock() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
    let options = TokenOptions {
        expiry: Some("1hrs".parse().unwrap()),
        ..hmac_token_options()
    };
    let token =
        create_token_with_clock(&json!({"sid": 42}), &hmac_key(), &options, &clock).unwrap();

    let first = verify_token_with_clock(&token, &hmac_key(), &hmac_verify_options(), &clock).unwrap();
    assert!(first.is_valid());

    clock.advance(TimeDelta::hours(1) + TimeDelta::seconds(1));
    let later = verify_token_with_clock(&token, &hmac_key(), &hmac_verify_options(), &clock).unwrap();
    assert!(later.verified);
    assert!(later.expired);
    assert_eq!(later.expiry, first.expiry);
}

#[test]
fn absolute_expiry_dates_are_honoured() {
    let options = TokenOptions {
        expiry: Some("2000-01-01".parse().unwrap()),
        ..hmac_token_options()
    };
    let token = create_token("old", &hmac_key(), &options).unwrap();
    let result = verify_token(&token, &hmac_key(), &hmac_verify_options()).unwrap();
    assert!(result.expired);
    assert_eq!(
        result.expiry,
        Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
    );

    assert!(matches!(
        "whenever".parse::<ExpirySpec>(),
        Err(CryptError::InvalidExpirySpec(_))
    ));
}

#[test]
fn credential_hash_scenario() {
    let stored = hash("myPassword_", &fast_hash()).unwrap().to_string();
    assert!(compare(&stored, "myPassword_", &fast_hash()).unwrap());
    assert!(!compare(&stored, "wrongPassword", &fast_hash()).unwrap());
}

#[test]
fn signed_cookie_scenario() {
    let options = SignOptions {
        algorithm: Algorithm::HmacSha256,
        encoding: Encoding::Base64Url,
    };
    let cookie = sign::sign_text("session=1234", &hmac_key(), options)
        .unwrap()
        .encode(options.encoding);

    assert!(sign::verify_signed(&cookie, &hmac_key(), options).unwrap());
    let parsed = SignedMessage::parse(&cookie, options).unwrap();
    assert_eq!(parsed.payload(), "session=1234");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn encodings_are_lossless(bytes in prop::collection::vec(any::<u8>(), 0..256), enc in any_encoding()) {
        let text = enc.encode(&bytes);
        prop_assert!(!text.contains('.') && !text.contains(':'));
        prop_assert_eq!(enc.decode(&text).unwrap(), bytes);
    }

    #[test]
    fn tokens_verify_for_any_payload(payload in json_payload(), enc in any_encoding()) {
        let options = TokenOptions { encoding: enc, ..hmac_token_options() };
        let token = create_token(&payload, &hmac_key(), &options).unwrap();

        let verify = VerifyOptions { encoding: enc, ..hmac_verify_options() };
        let result = verify_token(&token, &hmac_key(), &verify).unwrap();
        prop_assert!(result.verified);
        prop_assert!(!result.expired);
        prop_assert_eq!(result.claims::<Value>().unwrap(), payload);
    }

    #[test]
    fn any_signature_bit_flip_is_detected(
        payload in json_payload(),
        index in any::<prop::sample::Index>(),
        bit in 0u8..8,
        seconds in -3_600i64..3_600,
    ) {
        let options = TokenOptions {
            expiry: Some(ExpirySpec::seconds(seconds).unwrap()),
            ..hmac_token_options()
        };
        let token = create_token(&payload, &hmac_key(), &options).unwrap();
        let original = verify_token(&token, &hmac_key(), &hmac_verify_options()).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let mut signature = Encoding::Hex.decode(parts[1]).unwrap();
        let i = index.index(signature.len());
        signature[i] ^= 1 << bit;
        let tampered = format!("{}.{}.{}", parts[0], Encoding::Hex.encode(&signature), parts[2]);

        let result = verify_token(&tampered, &hmac_key(), &hmac_verify_options()).unwrap();
        prop_assert!(!result.verified);
        prop_assert_eq!(result.expired, original.expired);
        prop_assert_eq!(result.expiry, original.expiry);
    }

    #[test]
    fn parsed_tokens_re_encode_identically(payload in json_payload(), enc in any_encoding()) {
        let options = TokenOptions {
            expiry: Some(ExpirySpec::seconds(60).unwrap()),
            encoding: enc,
            ..hmac_token_options()
        };
        let token = create_token(&payload, &hmac_key(), &options).unwrap();
        prop_assert_eq!(BearerToken::parse(&token, enc).unwrap().encode(enc), token);
    }
}
