use backend_lib::auth::{ManualClock, SystemClock, TokenCodec, TokenError};
use backend_lib::config::TokenSettings;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

fn settings(secret: &str) -> TokenSettings {
    TokenSettings {
        secret: secret.to_string(),
        algorithm: "HS256".to_string(),
        expire_minutes: 30,
    }
}

#[test]
fn test_token_from_settings_roundtrip() {
    let settings = settings("integration-secret");
    let codec = TokenCodec::from_settings(&settings, Arc::new(SystemClock)).unwrap();

    let token = codec.mint("alice", settings.ttl()).unwrap();
    assert_eq!(token.split('.').count(), 3);
    assert_eq!(codec.validate(&token).unwrap(), "alice");
}

#[test]
fn test_token_from_other_secret_is_bad_signature() {
    let ours = TokenCodec::from_settings(&settings("ours"), Arc::new(SystemClock)).unwrap();
    let theirs = TokenCodec::from_settings(&settings("theirs"), Arc::new(SystemClock)).unwrap();

    let token = theirs.mint("alice", Duration::from_secs(60)).unwrap();
    assert_eq!(ours.validate(&token), Err(TokenError::BadSignature));
}

#[test]
fn test_token_expires_with_clock() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let codec = TokenCodec::from_settings(&settings("secret"), clock.clone()).unwrap();

    let token = codec.mint("alice", Duration::from_secs(60)).unwrap();
    clock.advance(Duration::from_secs(59));
    assert!(codec.validate(&token).is_ok());

    clock.advance(Duration::from_secs(1));
    assert_eq!(codec.validate(&token), Err(TokenError::Expired));
}

#[test]
fn test_asymmetric_algorithm_rejected_in_settings() {
    let mut settings = settings("secret");
    settings.algorithm = "RS256".to_string();
    assert!(TokenCodec::from_settings(&settings, Arc::new(SystemClock)).is_err());
}
