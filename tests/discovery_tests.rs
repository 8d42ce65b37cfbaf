use kokoro_bridge::discovery::{discover, Discoverer};
use kokoro_bridge::fingerprint::Endpoint;
use mockito::Matcher;
use std::time::Duration;

#[tokio::test]
async fn test_discovers_models_and_personas() {
    let mut server = mockito::Server::new_async().await;
    let models = server
        .mock("GET", "/v1/models")
        .match_header("authorization", "Bearer sk-abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"object":"list","data":[{"id":"kokoro","object":"model"},{"id":"tts-1-hd"}]}"#)
        .create_async()
        .await;
    let voices = server
        .mock("GET", "/v1/audio/voices")
        .match_header("authorization", "Bearer sk-abc")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"voices":["af_heart","bm_george"]}"#)
        .create_async()
        .await;

    let endpoint = Endpoint::parse(&server.url(), Some("sk-abc")).unwrap();
    let found = discover(&endpoint).await;
    assert_eq!(found.models, vec!["kokoro", "tts-1-hd"]);
    assert_eq!(found.personas, vec!["af_heart", "bm_george"]);
    models.assert_async().await;
    voices.assert_async().await;
}

#[tokio::test]
async fn test_placeholder_key_sends_no_auth() {
    let mut server = mockito::Server::new_async().await;
    let models = server
        .mock("GET", "/v1/models")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"models":["kokoro"]}"#)
        .create_async()
        .await;

    let endpoint = Endpoint::parse(&server.url(), Some("not-needed")).unwrap();
    let found = Discoverer::new(endpoint).models().await;
    assert_eq!(found, vec!["kokoro"]);
    models.assert_async().await;
}

#[tokio::test]
async fn test_failed_lookup_does_not_affect_the_other() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/models")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;
    server
        .mock("GET", "/v1/audio/voices")
        .with_status(200)
        .with_body(r#"["jm_kumo", 42, "ff_siwis"]"#)
        .create_async()
        .await;

    let endpoint = Endpoint::parse(&server.url(), None).unwrap();
    let found = discover(&endpoint).await;
    assert!(found.models.is_empty());
    assert_eq!(found.personas, vec!["jm_kumo", "ff_siwis"]);

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/models")
        .with_status(200)
        .with_body(r#"{"data":[{"id":"kokoro"}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/v1/audio/voices")
        .with_status(200)
        .with_body("{ truncated")
        .create_async()
        .await;

    let endpoint = Endpoint::parse(&server.url(), None).unwrap();
    let found = discover(&endpoint).await;
    assert_eq!(found.models, vec!["kokoro"]);
    assert!(found.personas.is_empty());
}

#[tokio::test]
async fn test_alternate_personas_path() {
    let mut server = mockito::Server::new_async().await;
    let personas = server
        .mock("GET", "/v1/audio/personas")
        .with_status(200)
        .with_body(r#"{"personas":[{"id":"if_sara"},{"id":"im_nicola"}]}"#)
        .create_async()
        .await;

    let endpoint = Endpoint::parse(&server.url(), None).unwrap();
    let found = Discoverer::new(endpoint)
        .with_personas_path("/v1/audio/personas")
        .with_timeout(Duration::from_secs(2))
        .personas()
        .await;
    assert_eq!(found, vec!["if_sara", "im_nicola"]);
    personas.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_server_yields_empty_lists() {
    let endpoint = Endpoint::parse("http://127.0.0.1:9", None).unwrap();
    let found = Discoverer::new(endpoint)
        .with_timeout(Duration::from_secs(2))
        .discover()
        .await;
    assert!(found.models.is_empty());
    assert!(found.personas.is_empty());
    let filled = found.with_fallbacks();
    assert_eq!(filled.models, vec!["kokoro"]);
    assert!(!filled.personas.is_empty());
}
