// Exercises the SDK-backed SSM client and startup wiring against an
// in-process mock of the parameter store's JSON endpoint.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use notification_service::{
    aws::SsmClient,
    bootstrap::{StartupError, bootstrap},
    config::{AppSettings, AwsConfig},
    parameter_store::{ParameterStore, ParameterStoreError},
};
use serde::Deserialize;
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq)]
struct RecordedCall {
    name: String,
    with_decryption: bool,
    security_token: Option<String>,
}

#[derive(Default)]
struct MockSsm {
    values: HashMap<String, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetParameterBody {
    name: String,
    #[serde(default)]
    with_decryption: bool,
}

async fn get_parameter(
    State(mock): State<Arc<MockSsm>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    if header("x-amz-target").as_deref() != Some("AmazonSSM.GetParameter")
        || header("content-type").as_deref() != Some("application/x-amz-json-1.1")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"__type": "UnknownOperationException"})),
        )
            .into_response();
    }
    let authorized = header("authorization").is_some_and(|auth| {
        auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDTEST/")
            && auth.contains("/eu-west-1/ssm/aws4_request")
    }) && header("x-amz-date").is_some();
    if !authorized {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"__type": "MissingAuthenticationTokenException", "message": "unsigned"})),
        )
            .into_response();
    }

    let Ok(request) = serde_json::from_str::<GetParameterBody>(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"__type": "SerializationException"})),
        )
            .into_response();
    };
    mock.calls.lock().unwrap().push(RecordedCall {
        name: request.name.clone(),
        with_decryption: request.with_decryption,
        security_token: header("x-amz-security-token"),
    });

    if request.name.starts_with("/restricted/") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"__type": "AccessDeniedException", "message": "not authorized"})),
        )
            .into_response();
    }

    match mock.values.get(&request.name) {
        Some(value) => Json(json!({
            "Parameter": {
                "Name": request.name,
                "Type": "SecureString",
                "Value": value,
                "Version": 1,
                "DataType": "text"
            }
        }))
        .into_response(),
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!({"__type": "ParameterNotFound", "message": ""})),
        )
            .into_response(),
    }
}

async fn spawn_mock(values: &[(&str, &str)]) -> (String, Arc<MockSsm>) {
    let mock = Arc::new(MockSsm {
        values: values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        calls: Mutex::default(),
    });
    let app = Router::new()
        .route("/", post(get_parameter))
        .with_state(mock.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), mock)
}

fn aws_config(endpoint: &str) -> AwsConfig {
    AwsConfig {
        region: Some("eu-west-1".to_string()),
        endpoint: Some(endpoint.to_string()),
        access_key_id: Some("AKIDTEST".to_string()),
        secret_access_key: Some("test-secret".to_string()),
        max_attempts: 1,
        request_timeout_seconds: 5,
        ..Default::default()
    }
}

fn settings(endpoint: &str) -> AppSettings {
    let mut settings = AppSettings::from_toml(
        r#"
[logger]
enable = false

[server]
port = 8080
host = "http://localhost"

[jwt_settings]
issuer = "https://auth.example.com"
audience = "notification-service"

[aws.parameter_store]
jwt_secret_key_path = "/notification/jwt-secret"
db_connection_string_path = "/notification/db-connection-string"
db_name_path = "/notification/db-name"
"#,
    )
    .unwrap();
    let paths = settings.aws.parameter_store.clone();
    settings.aws = AwsConfig {
        parameter_store: paths,
        ..aws_config(endpoint)
    };
    settings
}

const ALL_SECRETS: &[(&str, &str)] = &[
    ("/notification/jwt-secret", "jwt-signing-key"),
    (
        "/notification/db-connection-string",
        "postgres://notifier:pw@127.0.0.1:5432/postgres",
    ),
    ("/notification/db-name", "notifications"),
];

#[tokio::test]
async fn fetches_decrypted_parameter() {
    let (endpoint, mock) = spawn_mock(&[("/app/secret", "s3cr3t")]).await;
    let client = SsmClient::from_settings(&aws_config(&endpoint)).await.unwrap();

    let value = client.get_parameter("/app/secret", true).await.unwrap();
    assert_eq!(value, "s3cr3t");
    assert_eq!(
        mock.calls.lock().unwrap().clone(),
        vec![RecordedCall {
            name: "/app/secret".to_string(),
            with_decryption: true,
            security_token: None,
        }]
    );
}

#[tokio::test]
async fn missing_parameter_is_not_found() {
    let (endpoint, _mock) = spawn_mock(&[]).await;
    let client = SsmClient::from_settings(&aws_config(&endpoint)).await.unwrap();

    let err = client.get_parameter("/app/absent", true).await.unwrap_err();
    assert!(matches!(err, ParameterStoreError::NotFound(name) if name == "/app/absent"));
}

#[tokio::test]
async fn empty_value_is_rejected() {
    let (endpoint, _mock) = spawn_mock(&[("/app/blank", "")]).await;
    let client = SsmClient::from_settings(&aws_config(&endpoint)).await.unwrap();

    let err = client.get_parameter("/app/blank", true).await.unwrap_err();
    assert!(matches!(err, ParameterStoreError::EmptyValue(_)));
}

#[tokio::test]
async fn service_errors_keep_code_and_message() {
    let (endpoint, _mock) = spawn_mock(&[]).await;
    let client = SsmClient::from_settings(&aws_config(&endpoint)).await.unwrap();

    match client.get_parameter("/restricted/key", true).await {
        Err(ParameterStoreError::Service { code, message }) => {
            assert_eq!(code, "AccessDeniedException");
            assert_eq!(message, "not authorized");
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[tokio::test]
async fn session_token_is_forwarded() {
    let (endpoint, mock) = spawn_mock(&[("/app/secret", "s3cr3t")]).await;
    let config = AwsConfig {
        session_token: Some("temporary-session".to_string()),
        ..aws_config(&endpoint)
    };
    let client = SsmClient::from_settings(&config).await.unwrap();

    client.get_parameter("/app/secret", false).await.unwrap();
    let calls = mock.calls.lock().unwrap().clone();
    assert_eq!(calls[0].security_token.as_deref(), Some("temporary-session"));
    assert!(!calls[0].with_decryption);
}

#[tokio::test]
async fn bootstrap_resolves_every_secret_over_http() {
    let (endpoint, mock) = spawn_mock(ALL_SECRETS).await;
    let settings = settings(&endpoint);
    let client = SsmClient::from_settings(&settings.aws).await.unwrap();

    let services = bootstrap(&settings, &client).await.unwrap();
    assert_eq!(services.database.settings().database_name(), "notifications");
    let token = services
        .authenticator
        .issue_token("user-7".to_string(), 60)
        .unwrap();
    assert_eq!(
        services.authenticator.verify(&token).unwrap().sub.as_deref(),
        Some("user-7")
    );

    let names: Vec<String> = mock
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "/notification/jwt-secret",
            "/notification/db-connection-string",
            "/notification/db-name",
        ]
    );
}

#[tokio::test]
async fn bootstrap_fails_fast_on_missing_secret() {
    let (endpoint, mock) = spawn_mock(&ALL_SECRETS[..2]).await;
    let settings = settings(&endpoint);
    let client = SsmClient::from_settings(&settings.aws).await.unwrap();

    match bootstrap(&settings, &client).await {
        Err(StartupError::SecretFetchFailure { path, source }) => {
            assert_eq!(path, "/notification/db-name");
            assert!(matches!(source, ParameterStoreError::NotFound(_)));
        }
        other => panic!("expected secret fetch failure, got {other:?}"),
    }
    assert_eq!(mock.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn bootstrap_reports_unreachable_store() {
    // nothing listens on the discard port
    let settings = settings("http://127.0.0.1:9");
    let client = SsmClient::from_settings(&settings.aws).await.unwrap();

    let err = bootstrap(&settings, &client).await.unwrap_err();
    assert!(matches!(
        err,
        StartupError::SecretFetchFailure {
            source: ParameterStoreError::Transport(_),
            ..
        }
    ));
}
