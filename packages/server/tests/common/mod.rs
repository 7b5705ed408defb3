//! Shared harness for router-level tests
//!
//! Builds the full router over a throwaway database, a recording
//! generation provider and a local object store in a temp directory.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use mindgrid_core::ai::{
    AiError, ChatCompletion, ChatRequest, DownloadedFile, GeneratedImage, GenerationProvider,
    ImageRequest, Usage,
};
use mindgrid_core::db::DatabaseService;
use mindgrid_core::storage::LocalObjectStore;
use mindgrid_server::{create_router, AppConfig, AppState};

pub const PROVIDER_IMAGE_URL: &str = "https://provider.example/tmp/generated.png";
pub const PUBLIC_URL: &str = "http://mindgrid.test";

/// Provider that records every call and replays queued replies
#[derive(Default)]
pub struct RecordingProvider {
    pub chat_replies: Mutex<VecDeque<Result<ChatCompletion, AiError>>>,
    pub chat_calls: Mutex<Vec<(String, ChatRequest)>>,
    pub image_calls: Mutex<Vec<(String, ImageRequest)>>,
    pub downloads: Mutex<Vec<String>>,
}

impl RecordingProvider {
    pub fn reply_with(&self, content: &str) {
        self.chat_replies.lock().unwrap().push_back(Ok(ChatCompletion {
            content: content.to_string(),
            usage: Some(Usage {
                prompt_tokens: 12,
                completion_tokens: 8,
                total_tokens: 20,
            }),
        }));
    }

    pub fn fail_with(&self, err: AiError) {
        self.chat_replies.lock().unwrap().push_back(Err(err));
    }

    pub fn total_calls(&self) -> usize {
        self.chat_calls.lock().unwrap().len()
            + self.image_calls.lock().unwrap().len()
            + self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationProvider for RecordingProvider {
    async fn chat(&self, api_key: &str, request: &ChatRequest) -> Result<ChatCompletion, AiError> {
        self.chat_calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), request.clone()));
        self.chat_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiError::Network("no reply queued".to_string())))
    }

    async fn generate_image(
        &self,
        api_key: &str,
        request: &ImageRequest,
    ) -> Result<GeneratedImage, AiError> {
        self.image_calls
            .lock()
            .unwrap()
            .push((api_key.to_string(), request.clone()));
        Ok(GeneratedImage {
            url: PROVIDER_IMAGE_URL.to_string(),
            revised_prompt: Some("A serene mountain lake at sunrise, oil painting".to_string()),
        })
    }

    async fn download(&self, url: &str) -> Result<DownloadedFile, AiError> {
        self.downloads.lock().unwrap().push(url.to_string());
        Ok(DownloadedFile {
            bytes: b"\x89PNG fake image bytes".to_vec(),
            content_type: Some("image/png".to_string()),
        })
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub struct TestEnv {
    pub router: Router,
    pub state: AppState,
    pub provider: Arc<RecordingProvider>,
    pub temp_dir: TempDir,
}

pub async fn create_test_env() -> anyhow::Result<TestEnv> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("mindgrid.db");
    let storage_dir = temp_dir.path().join("storage");

    let config = AppConfig::from_lookup(|name| match name {
        "MINDGRID_DATABASE_PATH" => Some(db_path.display().to_string()),
        "MINDGRID_PUBLIC_URL" => Some(PUBLIC_URL.to_string()),
        "MINDGRID_STORAGE_DIR" => Some(storage_dir.display().to_string()),
        _ => None,
    })?;

    let db = Arc::new(DatabaseService::new(db_path.clone()).await?);
    let provider = Arc::new(RecordingProvider::default());
    let store = Arc::new(LocalObjectStore::new(storage_dir.clone(), PUBLIC_URL));

    let state = AppState::with_components(config, db, provider.clone(), store);
    let router = create_router(state.clone());

    Ok(TestEnv {
        router,
        state,
        provider,
        temp_dir,
    })
}

impl TestEnv {
    /// Start a session for `user_id` and return its token
    pub async fn login(&self, user_id: &str) -> anyhow::Result<String> {
        Ok(self.state.sessions.create_session(user_id).await?.token)
    }

    /// Start a session for `user_id` with a stored API key
    pub async fn login_with_key(&self, user_id: &str) -> anyhow::Result<String> {
        self.state
            .settings
            .set_api_key(user_id, Some("sk-test-key"))
            .await?;
        self.login(user_id).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> anyhow::Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };
        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> anyhow::Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.into_body().collect().await?.to_bytes();
        let text = String::from_utf8_lossy(&bytes).to_string();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Ok(TestResponse {
            status,
            location,
            text,
            json,
        })
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub text: String,
    pub json: Value,
}

impl TestResponse {
    pub fn error(&self) -> &str {
        self.json["error"].as_str().unwrap_or_default()
    }
}
