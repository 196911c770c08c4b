//! `POST /api/ai/assistant`: farming plan recommendation.

use agro_llm::CropQuery;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{error, info};

use super::json_body;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

const FIELDS_REQUIRED: &str = "All fields (cropType, landArea, season, soilQuality) are required";

/// AI routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/ai/assistant", post(assistant))
}

/// Falsy in the JSON sense: null, false, zero, and empty strings/containers.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_owned(),
        other => other.to_string(),
    }
}

/// Pull the four inputs out of the body; all must be truthy.
fn crop_query(body: &Value) -> Option<CropQuery> {
    let field = |key: &str| body.get(key).filter(|v| truthy(v)).map(stringify);
    Some(CropQuery {
        crop_type: field("cropType")?,
        land_area: field("landArea")?,
        season: field("season")?,
        soil_quality: field("soilQuality")?,
    })
}

async fn assistant(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let query = crop_query(&json_body(&body)).ok_or_else(|| ApiError::Body {
        status: StatusCode::BAD_REQUEST,
        body: json!({ "error": FIELDS_REQUIRED }),
    })?;

    match state.recommender.recommend(&query).await {
        Ok(plan) => {
            info!(user_id = auth.user_id, crop = %query.crop_type, "plan generated");
            Ok(Json(json!({ "data": plan })))
        }
        Err(e) => {
            error!(user_id = auth.user_id, error = %e, "recommendation failed");
            Err(ApiError::message(
                StatusCode::INTERNAL_SERVER_ERROR,
                "AI response could not be generated.",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!truthy(&falsy), "{falsy} should be falsy");
        }
        for t in [json!(true), json!(1), json!("x"), json!([0]), json!({"a": 1})] {
            assert!(truthy(&t), "{t} should be truthy");
        }
    }

    #[test]
    fn query_stringifies_values() {
        let query = crop_query(&json!({
            "cropType": "Wheat",
            "landArea": 1200,
            "season": "Rabi",
            "soilQuality": true,
        }))
        .unwrap();
        assert_eq!(query.land_area, "1200");
        assert_eq!(query.soil_quality, "True");
    }

    #[test]
    fn any_missing_or_falsy_field_rejects() {
        let full = json!({
            "cropType": "Wheat",
            "landArea": "1200",
            "season": "Rabi",
            "soilQuality": "Loamy",
        });
        assert!(crop_query(&full).is_some());
        for key in ["cropType", "landArea", "season", "soilQuality"] {
            let mut body = full.clone();
            body[key] = json!("");
            assert!(crop_query(&body).is_none(), "{key} blank");
            let _ = body.as_object_mut().unwrap().remove(key);
            assert!(crop_query(&body).is_none(), "{key} missing");
        }
        assert!(crop_query(&Value::Null).is_none());
    }
}
