// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the HTTP tests: scripted pipelines and request builders.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use textlab_server::{
    api::{create_app, AppState, RouterConfig},
    models::{Answer, ModelManager, QuestionAnswerer, SentenceEncoder, TextSummarizer},
};

pub const BOUNDARY: &str = "textlab-test-boundary";

#[derive(Default)]
pub struct MockSummarizer {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_input: Mutex<Option<String>>,
}

#[async_trait]
impl TextSummarizer for MockSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_input.lock().unwrap() = Some(text.to_string());
        if self.fail {
            return Err(anyhow!("decoder session exploded"));
        }
        let first_sentence = text.split('.').next().unwrap_or_default().trim();
        Ok(format!("{}.", first_sentence))
    }

    fn model_name(&self) -> &str {
        "mock-t5"
    }
}

/// Answers with the first word of the context that starts with an uppercase letter.
#[derive(Default)]
pub struct MockQuestionAnswerer {
    pub fail: bool,
    pub calls: AtomicUsize,
    pub last_question: Mutex<Option<String>>,
}

#[async_trait]
impl QuestionAnswerer for MockQuestionAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_question.lock().unwrap() = Some(question.to_string());
        if self.fail {
            return Err(anyhow!("reader session exploded"));
        }

        let mut offset = 0;
        for word in context.split(' ') {
            let trimmed = word.trim_end_matches(|c: char| !c.is_alphanumeric());
            if offset > 0 && trimmed.chars().next().map_or(false, char::is_uppercase) {
                return Ok(Answer {
                    text: trimmed.to_string(),
                    score: 0.9,
                    start: offset,
                    end: offset + trimmed.len(),
                });
            }
            offset += word.len() + 1;
        }
        Ok(Answer::empty())
    }

    fn model_name(&self) -> &str {
        "mock-bert-squad"
    }
}

/// Embeds text as (mentions of "mammal", mentions of "sky", 1), L2 normalized.
#[derive(Default)]
pub struct MockEncoder {
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockEncoder {
    fn embed(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let raw = [
            lower.matches("mammal").count() as f32,
            lower.matches("sky").count() as f32,
            1.0,
        ];
        let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
        raw.iter().map(|x| x / norm).collect()
    }
}

#[async_trait]
impl SentenceEncoder for MockEncoder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("encoder session exploded"));
        }
        Ok(Self::embed(text))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("encoder session exploded"));
        }
        Ok(texts.iter().map(|t| Self::embed(t)).collect())
    }

    fn model_name(&self) -> &str {
        "mock-minilm"
    }
}

/// Router wired to the mocks, which stay reachable for call assertions.
pub struct TestApp {
    pub router: Router,
    pub summarizer: Arc<MockSummarizer>,
    pub question_answerer: Arc<MockQuestionAnswerer>,
    pub encoder: Arc<MockEncoder>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_mocks(
            MockSummarizer::default(),
            MockQuestionAnswerer::default(),
            MockEncoder::default(),
            &RouterConfig::default(),
        )
    }

    pub fn failing() -> Self {
        Self::with_mocks(
            MockSummarizer {
                fail: true,
                ..Default::default()
            },
            MockQuestionAnswerer {
                fail: true,
                ..Default::default()
            },
            MockEncoder {
                fail: true,
                ..Default::default()
            },
            &RouterConfig::default(),
        )
    }

    pub fn with_config(config: &RouterConfig) -> Self {
        Self::with_mocks(
            MockSummarizer::default(),
            MockQuestionAnswerer::default(),
            MockEncoder::default(),
            config,
        )
    }

    fn with_mocks(
        summarizer: MockSummarizer,
        question_answerer: MockQuestionAnswerer,
        encoder: MockEncoder,
        config: &RouterConfig,
    ) -> Self {
        let summarizer = Arc::new(summarizer);
        let question_answerer = Arc::new(question_answerer);
        let encoder = Arc::new(encoder);

        let models = ModelManager::from_parts(
            summarizer.clone(),
            question_answerer.clone(),
            encoder.clone(),
        );
        let router = create_app(AppState::new(models), config);

        Self {
            router,
            summarizer,
            question_answerer,
            encoder,
        }
    }
}

/// Builds a multipart/form-data body holding one file field.
pub fn multipart_body(field: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"doc.txt\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(field, content)))
        .unwrap()
}

pub fn json_request(uri: &str, json: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
