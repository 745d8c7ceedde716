//! Passkey ceremonies against a scripted server and authenticator.

mod common;

use common::{harness, session_body};
use passkey_session::error::PREVIOUSLY_REGISTERED;
use passkey_session::session::{self, Credentials};
use passkey_session::transport::Method;
use passkey_session::webauthn::{
    authenticate_with_assertion, register_credential, AuthenticatorError, Ceremony, CeremonyKind,
    Enrollment,
};
use passkey_session::AuthErrorKind;
use serde_json::{json, Value};

fn authentication_options() -> Value {
    json!({
        "challenge": "c2VydmVyLW5vbmNl",
        "allowCredentials": [{ "id": "cred-1", "type": "public-key" }],
        "timeout": 60000,
        "rpId": "example.com",
    })
}

fn registration_options() -> Value {
    json!({
        "challenge": "cmVnLW5vbmNl",
        "rp": { "name": "Example", "id": "example.com" },
        "user": { "id": "dXNlci0x", "name": "alice", "displayName": "Alice" },
        "pubKeyCredParams": [{ "alg": -7, "type": "public-key" }],
    })
}

fn assertion() -> Value {
    json!({
        "id": "cred-1",
        "rawId": "cred-1",
        "type": "public-key",
        "response": {
            "clientDataJSON": "e30",
            "authenticatorData": "YXV0aA",
            "signature": "c2ln",
        },
        "clientExtensionResults": {},
    })
}

fn attestation() -> Value {
    json!({
        "id": "cred-2",
        "rawId": "cred-2",
        "type": "public-key",
        "response": {
            "clientDataJSON": "e30",
            "attestationObject": "YXR0",
            "transports": ["internal"],
            "authenticatorData": "YXV0aA",
            "publicKey": "cGs",
            "publicKeyAlgorithm": -7,
        },
        "clientExtensionResults": { "credProps": { "rk": true } },
    })
}

#[tokio::test]
async fn test_authentication_installs_session() {
    let h = harness();
    let mut verified = session_body(1, "alice");
    verified["credentialId"] = json!("cred-1");
    h.transport
        .respond(authentication_options())
        .respond(verified);
    h.authenticator.produce(assertion());

    let user = authenticate_with_assertion(&h.ctx, "alice").await.unwrap();

    assert_eq!(user.user_id.as_str(), "1");
    assert_eq!(h.ctx.current_session(), Some(user));

    let options = h.transport.request(0);
    assert_eq!(options.method, Method::Get);
    assert_eq!(options.path, "/auth/generate-authentication-options");
    assert_eq!(options.query, vec![("user".to_string(), "alice".to_string())]);

    let challenge = &h.authenticator.challenges()[0];
    assert_eq!(challenge.kind, CeremonyKind::Authentication);
    assert_eq!(challenge.server_nonce, "c2VydmVyLW5vbmNl");
    assert_eq!(challenge.subject_username, "alice");

    let submitted = h.transport.request(1);
    assert_eq!(submitted.path, "/auth/verify-authentication");
    let body = submitted.body.unwrap();
    assert!(body.get("clientExtensionResults").is_none());
    assert_eq!(body["response"]["authenticatorData"], "YXV0aA");
}

#[tokio::test]
async fn test_authentication_response_with_both_id_fields() {
    let h = harness();
    let mut verified = session_body(4, "dana");
    verified["user_id"] = json!(4);
    verified["credentialId"] = json!("cred-1");
    h.transport
        .respond(authentication_options())
        .respond(verified);
    h.authenticator.produce(assertion());

    let user = authenticate_with_assertion(&h.ctx, "dana").await.unwrap();

    assert_eq!(user.user_id.as_str(), "4");
    assert!(h.ctx.is_authenticated());
}

#[tokio::test]
async fn test_authentication_without_challenge_skips_authenticator() {
    let h = harness();
    h.transport.respond(json!({ "timeout": 60000 }));

    let err = authenticate_with_assertion(&h.ctx, "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyProtocol);
    assert_eq!(h.authenticator.call_count(), 0);
    assert_eq!(h.transport.request_count(), 1);
    assert!(!h.ctx.is_authenticated());
}

#[tokio::test]
async fn test_authentication_without_credential_id_is_not_verified() {
    let h = harness();
    h.transport
        .respond(authentication_options())
        .respond(session_body(1, "alice"));
    h.authenticator.produce(assertion());

    let err = authenticate_with_assertion(&h.ctx, "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyProtocol);
    assert_eq!(err.detail().text(), "Not verified!");
    assert!(!h.ctx.is_authenticated());
}

#[tokio::test]
async fn test_authentication_cancelled_by_user() {
    let h = harness();
    h.transport.respond(authentication_options());
    h.authenticator
        .reject(AuthenticatorError::new("The operation was cancelled").with_code("ERROR_CANCELLED"));

    let err = authenticate_with_assertion(&h.ctx, "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyAborted);
    assert_eq!(err.detail().text(), "The operation was cancelled");
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn test_authentication_failure_keeps_existing_session() {
    let h = harness();
    h.transport
        .respond(session_body(1, "alice"))
        .respond(authentication_options())
        .fail(400, json!({ "detail": "Challenge expired" }));
    h.authenticator.produce(assertion());

    let alice = session::login(&h.ctx, &Credentials::new("alice", "secret"))
        .await
        .unwrap();
    let err = authenticate_with_assertion(&h.ctx, "bob").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::Network);
    assert_eq!(err.status(), Some(400));
    assert_eq!(h.ctx.current_session(), Some(alice));
}

#[tokio::test]
async fn test_registration_succeeds_with_stripped_attestation() {
    let h = harness();
    h.transport
        .respond(session_body(1, "alice"))
        .respond(registration_options())
        .respond(json!({ "userVerified": true, "credentialId": "cred-2" }));
    h.authenticator.produce(attestation());

    session::login(&h.ctx, &Credentials::new("alice", "secret"))
        .await
        .unwrap();
    let enrollment = register_credential(&h.ctx, "alice").await.unwrap();

    match &enrollment {
        Enrollment::Registered(result) => {
            assert!(result.verified);
            assert_eq!(result.credential_id.as_deref(), Some("cred-2"));
        }
        other => panic!("unexpected enrollment: {other:?}"),
    }
    assert!(enrollment.warning().is_none());

    let options = h.transport.request(1);
    assert_eq!(options.path, "/auth/generate-registration-options");
    assert_eq!(options.bearer.as_deref(), Some("access-alice"));

    let submitted = h.transport.request(2);
    assert_eq!(submitted.path, "/auth/verify-registration");
    assert_eq!(submitted.bearer.as_deref(), Some("access-alice"));
    let body = submitted.body.unwrap();
    assert!(body.get("clientExtensionResults").is_none());
    let response = &body["response"];
    assert!(response.get("authenticatorData").is_none());
    assert!(response.get("publicKey").is_none());
    assert!(response.get("publicKeyAlgorithm").is_none());
    assert_eq!(response["attestationObject"], "YXR0");
    assert_eq!(response["transports"], json!(["internal"]));
}

#[tokio::test]
async fn test_registration_does_not_touch_session() {
    let h = harness();
    h.transport
        .respond(registration_options())
        .respond(json!({ "userVerified": true, "id": 99 }));
    h.authenticator.produce(attestation());

    register_credential(&h.ctx, "alice").await.unwrap();

    assert!(!h.ctx.is_authenticated());
    assert_eq!(h.transport.request(0).bearer, None);
}

#[tokio::test]
async fn test_registration_without_user_skips_authenticator() {
    let h = harness();
    h.transport.respond(json!({ "challenge": "cmVnLW5vbmNl" }));

    let err = register_credential(&h.ctx, "alice").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyProtocol);
    assert_eq!(h.authenticator.call_count(), 0);
}

#[tokio::test]
async fn test_registration_options_failure_is_returned_verbatim() {
    let h = harness();
    h.transport
        .fail(403, json!({ "detail": "Registration closed", "code": "CLOSED" }));

    let err = register_credential(&h.ctx, "alice").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::Network);
    assert_eq!(err.status(), Some(403));
    assert_eq!(
        err.detail().as_value(),
        &json!({ "detail": "Registration closed", "code": "CLOSED" })
    );
    assert_eq!(h.authenticator.call_count(), 0);
}

#[tokio::test]
async fn test_registration_not_verified() {
    let h = harness();
    h.transport
        .respond(registration_options())
        .respond(json!({ "userVerified": false }));
    h.authenticator.produce(attestation());

    let err = register_credential(&h.ctx, "alice").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyProtocol);
    assert_eq!(err.detail().text(), "Not verified!");
}

#[tokio::test]
async fn test_previously_registered_authenticator_is_success() {
    let h = harness();
    h.transport.respond(registration_options());
    h.authenticator.reject(
        AuthenticatorError::new("The authenticator was previously registered")
            .with_code(PREVIOUSLY_REGISTERED),
    );

    let enrollment = register_credential(&h.ctx, "alice").await.unwrap();

    assert!(matches!(enrollment, Enrollment::AlreadyRegistered(_)));
    let warning = enrollment.warning().unwrap();
    assert_eq!(warning.kind(), AuthErrorKind::BenignReenrollment);
    assert!(!warning.is_failure());
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn test_previously_registered_reported_by_server() {
    let h = harness();
    h.transport
        .respond(registration_options())
        .fail(
            400,
            json!({ "detail": "Already registered", "code": PREVIOUSLY_REGISTERED }),
        );
    h.authenticator.produce(attestation());

    let enrollment = register_credential(&h.ctx, "alice").await.unwrap();

    assert!(matches!(enrollment, Enrollment::AlreadyRegistered(_)));
}

#[tokio::test]
async fn test_reenrollment_code_on_options_is_network_error() {
    let h = harness();
    h.transport
        .fail(409, json!({ "detail": "Already registered", "code": PREVIOUSLY_REGISTERED }));

    let err = register_credential(&h.ctx, "alice").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::Network);
    assert!(err.is_failure());
    assert_eq!(h.authenticator.call_count(), 0);
}

#[tokio::test]
async fn test_reenrollment_code_during_authentication_is_network_error() {
    let h = harness();
    h.transport
        .respond(authentication_options())
        .fail(400, json!({ "code": PREVIOUSLY_REGISTERED }));
    h.authenticator.produce(assertion());

    let err = authenticate_with_assertion(&h.ctx, "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::Network);
    assert!(err.is_failure());
    assert!(!h.ctx.is_authenticated());
}

#[tokio::test]
async fn test_reenrollment_code_from_authenticator_during_authentication_is_abort() {
    let h = harness();
    h.transport.respond(authentication_options());
    h.authenticator.reject(
        AuthenticatorError::new("previously registered").with_code(PREVIOUSLY_REGISTERED),
    );

    let err = authenticate_with_assertion(&h.ctx, "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyAborted);
}

#[tokio::test]
async fn test_registration_cancelled_by_user() {
    let h = harness();
    h.transport.respond(registration_options());
    h.authenticator
        .reject(AuthenticatorError::new("User cancelled").with_code("ERROR_CANCELLED"));

    let err = register_credential(&h.ctx, "alice").await.unwrap_err();

    assert_eq!(err.kind(), AuthErrorKind::CeremonyAborted);
    assert_eq!(h.transport.request_count(), 1);
}

#[tokio::test]
async fn test_ceremony_steps_can_be_driven_by_hand() {
    let h = harness();
    h.transport
        .respond(authentication_options())
        .respond(json!({ "credentialId": "cred-1", "id": 1 }));
    h.authenticator.produce(assertion());

    let received = Ceremony::new(CeremonyKind::Authentication, "alice")
        .request_challenge(h.ctx.transport())
        .await
        .unwrap();
    assert_eq!(received.challenge().server_nonce, "c2VydmVyLW5vbmNl");

    let produced = received
        .produce_assertion(h.ctx.authenticator())
        .await
        .unwrap();
    assert!(produced
        .assertion()
        .payload()
        .get("clientExtensionResults")
        .is_some());

    let result = produced.verify(h.ctx.transport()).await.unwrap();
    assert!(result.verified);
    // Driving the steps directly never installs a session.
    assert!(!h.ctx.is_authenticated());
}
