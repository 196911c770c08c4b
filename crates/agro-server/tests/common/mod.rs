//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use agro_auth::TokenService;
use agro_llm::{
    ChatSession, CropQuery, FarmingPlan, LlmError, Recommender, ReplyType, SessionFactory,
    StructuredReply,
};
use agro_server::{AgroServer, ServerConfig, Services};
use agro_store::ConnectionConfig;
use agro_vision::{Detection, Detector, InferenceAdapter, PassthroughDetector};
use async_trait::async_trait;
use bytes::Bytes;
use image::{ImageFormat, RgbImage};
use tokio::sync::Notify;

pub const TIMEOUT: Duration = Duration::from_secs(5);
pub const SECRET: &[u8] = b"integration-test-secret";

// ── Fake chat ──

/// Replies "Echo: {text}" unless the text is `"fail"`; `"slow"` waits a while.
pub struct EchoSession;

#[async_trait]
impl ChatSession for EchoSession {
    async fn send(&mut self, text: &str) -> agro_llm::Result<StructuredReply> {
        match text {
            "fail" => Err(LlmError::EmptyResponse),
            "slow" => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Ok(reply("slow done"))
            }
            other => Ok(reply(&format!("Echo: {other}"))),
        }
    }
}

fn reply(message: &str) -> StructuredReply {
    StructuredReply {
        kind: ReplyType::Response,
        message: message.to_owned(),
        steps: None,
    }
}

pub struct EchoFactory;

impl SessionFactory for EchoFactory {
    fn create(&self) -> Box<dyn ChatSession> {
        Box::new(EchoSession)
    }
}

// ── Fake recommender ──

/// Succeeds for every crop except `"Unknown"`.
pub struct StubRecommender;

#[async_trait]
impl Recommender for StubRecommender {
    async fn recommend(&self, query: &CropQuery) -> agro_llm::Result<FarmingPlan> {
        if query.crop_type == "Unknown" {
            return Err(LlmError::EmptyResponse);
        }
        Ok(FarmingPlan {
            title: format!("{} plan", query.crop_type),
            crop: query.crop_type.clone(),
            landarea: query.land_area.clone(),
            soilquality: query.soil_quality.clone(),
            season: query.season.clone(),
            description: "Sow early.".into(),
            insights: vec!["Irrigate weekly".into()],
            resources: Vec::new(),
            tools: vec!["Plough".into()],
            water_requirement: "450mm".into(),
            recommendations: vec!["Rotate with legumes".into()],
            confidence: 80,
        })
    }
}

// ── Gated detector ──

/// Blocks 2x2 frames until `release` is notified; other sizes pass straight through.
#[derive(Default)]
pub struct GatedDetector {
    pub release: Notify,
}

#[async_trait]
impl Detector for GatedDetector {
    async fn detect(&self, frame: Arc<RgbImage>) -> agro_vision::Result<Vec<Detection>> {
        if frame.dimensions() == (2, 2) {
            self.release.notified().await;
        }
        Ok(vec![Detection {
            label: "apple".into(),
            confidence: 0.9,
            bbox: [0.0, 0.0, 1.0, 1.0],
        }])
    }
}

// ── Server ──

pub fn services(detector: Arc<dyn Detector>) -> Services {
    Services {
        pool: agro_store::open(":memory:", &ConnectionConfig::default()).unwrap(),
        tokens: TokenService::new(SECRET, Duration::from_secs(300), Duration::from_secs(86_400)),
        sessions: Arc::new(EchoFactory),
        recommender: Arc::new(StubRecommender),
        inference: InferenceAdapter::new(detector, 80),
    }
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        cookie_secure: false,
        ..ServerConfig::default()
    }
}

pub fn server() -> AgroServer {
    AgroServer::new(test_config(), services(Arc::new(PassthroughDetector)))
}

pub fn png(width: u32, height: u32) -> Bytes {
    let mut out = Cursor::new(Vec::new());
    RgbImage::new(width, height)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    Bytes::from(out.into_inner())
}
