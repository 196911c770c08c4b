//! Structured farming plans from crop, land, soil and season.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

use crate::client::GeminiClient;
use crate::errors::{LlmError, Result};
use crate::types::{GeminiContent, GenerateContentRequest, GenerationConfig, ModelConfig};

const FARMING_INSTRUCTION: &str = include_str!("prompts/farming.txt");

/// The four inputs of a recommendation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CropQuery {
    /// Crop to grow.
    pub crop_type: String,
    /// Land area in square meters.
    pub land_area: String,
    /// Planting season.
    pub season: String,
    /// Soil quality description.
    pub soil_quality: String,
}

impl CropQuery {
    /// The single user turn sent to the model.
    pub fn prompt(&self) -> String {
        format!(
            "Croptype : {}, LandArea : {}, Soil Quality : {}, Season : {}",
            self.crop_type, self.land_area, self.soil_quality, self.season
        )
    }
}

/// Category of a required resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceCategory {
    /// Seeds.
    Seeds,
    /// Fertilizers.
    Fertilizers,
    /// Herbicides.
    Herbicides,
    /// Insecticides.
    Insecticides,
    /// Anything else.
    Other,
}

/// A resource with its quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource name.
    pub name: String,
    /// Quantity, usually in kilograms.
    pub quantity: String,
    /// Category.
    pub category: ResourceCategory,
}

/// A complete cultivation plan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct FarmingPlan {
    pub title: String,
    pub crop: String,
    pub landarea: String,
    pub soilquality: String,
    pub season: String,
    pub description: String,
    pub insights: Vec<String>,
    pub resources: Vec<Resource>,
    pub tools: Vec<String>,
    pub water_requirement: String,
    pub recommendations: Vec<String>,
    pub confidence: i64,
}

/// Produces farming plans.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Build a plan for `query`.
    async fn recommend(&self, query: &CropQuery) -> Result<FarmingPlan>;
}

/// Model configuration for the recommendation engine.
pub fn farming_model_config(model: impl Into<String>) -> ModelConfig {
    ModelConfig {
        model: model.into(),
        system_instruction: FARMING_INSTRUCTION.trim().to_owned(),
        generation: GenerationConfig {
            temperature: Some(0.1),
            top_k: Some(1),
            top_p: Some(1.0),
            max_output_tokens: Some(2048),
            response_mime_type: Some("application/json".into()),
            response_schema: Some(plan_schema()),
        },
    }
}

fn plan_schema() -> serde_json::Value {
    let string = json!({"type": "STRING"});
    let strings = json!({"type": "ARRAY", "items": {"type": "STRING"}});
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string,
            "crop": string,
            "landarea": string,
            "soilquality": string,
            "season": string,
            "description": string,
            "insights": strings,
            "resources": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": string,
                        "quantity": string,
                        "category": {
                            "type": "STRING",
                            "enum": ["Seeds", "Fertilizers", "Herbicides", "Insecticides", "Other"]
                        }
                    },
                    "required": ["name", "quantity", "category"]
                }
            },
            "tools": strings,
            "water_requirement": string,
            "recommendations": strings,
            "confidence": {"type": "INTEGER"}
        },
        "required": [
            "title", "crop", "landarea", "soilquality", "season", "description",
            "insights", "resources", "tools", "water_requirement", "recommendations",
            "confidence"
        ]
    })
}

/// Gemini-backed [`Recommender`].
#[derive(Clone, Debug)]
pub struct GeminiRecommender {
    client: Arc<GeminiClient>,
    config: ModelConfig,
}

impl GeminiRecommender {
    /// Build a recommender on `model`.
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            config: farming_model_config(model),
        }
    }
}

#[async_trait]
impl Recommender for GeminiRecommender {
    #[instrument(skip_all, fields(crop = %query.crop_type))]
    async fn recommend(&self, query: &CropQuery) -> Result<FarmingPlan> {
        let request =
            GenerateContentRequest::new(&self.config, vec![GeminiContent::user(query.prompt())]);
        let raw = self
            .client
            .generate_content(&self.config.model, &request)
            .await?;
        let plan: FarmingPlan =
            serde_json::from_str(&raw).map_err(|e| LlmError::Schema(e.to_string()))?;
        info!(resources = plan.resources.len(), "farming plan generated");
        Ok(plan)
    }
}
