//! `/api/inventory/*`: product CRUD scoped to the caller.

use std::collections::HashMap;

use agro_store::{NewProduct, Price, Product, ProductChanges, ProductRepo, StoreError};
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use bytes::Bytes;
use serde_json::{Map, Value};
use tracing::info;

use super::db;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::server::AppState;

const NAME_MAX: usize = 255;
const SLUG_MAX: usize = 255;
const CATEGORY_MAX: usize = 20;
const REGION_MAX: usize = 100;
const STOCK_MAX: i64 = 2_147_483_647;

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const BAD_INTEGER: &str = "A valid integer is required.";
const BAD_SLUG: &str = "Enter a valid \u{201c}slug\u{201d} consisting of letters, numbers, underscores or hyphens.";

/// Inventory routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/inventory/create", post(create))
        .route("/api/inventory/list", get(list))
        .route("/api/inventory/update/{slug}/", put(replace).patch(amend))
        .route("/api/inventory/delete/{slug}/", delete(remove))
}

/// Lowercase ASCII slug: word characters kept, whitespace and hyphen runs
/// collapsed to one `-`, everything else dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
    }
    let trimmed = slug.trim_matches(|c| c == '-' || c == '_');
    trimmed.chars().take(SLUG_MAX).collect()
}

/// Validated product fields; `None` means "not supplied".
#[derive(Debug, Default, PartialEq, Eq)]
struct ProductInput {
    name: Option<String>,
    slug: Option<String>,
    category: Option<String>,
    price: Option<Price>,
    stock: Option<u32>,
    region: Option<String>,
    description: Option<Option<String>>,
}

struct Validator<'a> {
    body: &'a Map<String, Value>,
    partial: bool,
    errors: FieldErrors,
}

impl<'a> Validator<'a> {
    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// The raw value, recording "required"/"null" errors.
    fn raw(&mut self, field: &str, required: bool) -> Option<&'a Value> {
        match self.body.get(field) {
            None => {
                if required && !self.partial {
                    self.fail(field, REQUIRED);
                }
                None
            }
            Some(Value::Null) => {
                self.fail(field, NOT_NULL);
                None
            }
            Some(value) => Some(value),
        }
    }

    fn text(&mut self, field: &str, max: usize, required: bool) -> Option<String> {
        let value = self.raw(field, required)?;
        let text = match value {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.fail(field, NOT_STRING);
                return None;
            }
        };
        if text.is_empty() {
            self.fail(field, NOT_BLANK);
            return None;
        }
        if text.chars().count() > max {
            self.fail(
                field,
                format!("Ensure this field has no more than {max} characters."),
            );
            return None;
        }
        Some(text)
    }

    fn slug(&mut self) -> Option<String> {
        let slug = self.text("slug", SLUG_MAX, false)?;
        if slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            Some(slug)
        } else {
            self.fail("slug", BAD_SLUG);
            None
        }
    }

    fn price(&mut self) -> Option<Price> {
        let text = match self.raw("price", true)? {
            Value::String(s) => s.trim().to_owned(),
            Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        match text.parse::<Price>() {
            Ok(price) => Some(price),
            Err(e) => {
                self.fail("price", e.to_string());
                None
            }
        }
    }

    fn stock(&mut self) -> Option<u32> {
        let value = match self.raw("stock", true)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        let Some(value) = value else {
            self.fail("stock", BAD_INTEGER);
            return None;
        };
        if value < 0 {
            self.fail("stock", "Ensure this value is greater than or equal to 0.");
            return None;
        }
        if value > STOCK_MAX {
            self.fail(
                "stock",
                format!("Ensure this value is less than or equal to {STOCK_MAX}."),
            );
            return None;
        }
        u32::try_from(value).ok()
    }

    fn description(&mut self) -> Option<Option<String>> {
        match self.body.get("description")? {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.trim().to_owned())),
            _ => {
                self.fail("description", NOT_STRING);
                None
            }
        }
    }
}

/// Validate a product body. `partial` relaxes required fields (PATCH).
fn validate(body: &Value, partial: bool) -> Result<ProductInput, ApiError> {
    let Some(map) = body.as_object() else {
        return Err(ApiError::field(
            "non_field_errors",
            "Invalid data. Expected a dictionary.",
        ));
    };
    let mut v = Validator {
        body: map,
        partial,
        errors: FieldErrors::new(),
    };
    let input = ProductInput {
        name: v.text("name", NAME_MAX, true),
        slug: v.slug(),
        category: v.text("category", CATEGORY_MAX, true),
        price: v.price(),
        stock: v.stock(),
        region: v.text("region", REGION_MAX, true),
        description: v.description(),
    };
    if v.errors.is_empty() {
        Ok(input)
    } else {
        Err(ApiError::Validation(v.errors))
    }
}

impl ProductInput {
    /// Fields for an insert. Only call on a full (non-partial) validation.
    fn into_new(self) -> ApiResult<NewProduct> {
        let (Some(name), Some(category), Some(price), Some(stock), Some(region)) =
            (self.name, self.category, self.price, self.stock, self.region)
        else {
            return Err(ApiError::internal("incomplete product input"));
        };
        let slug = match self.slug {
            Some(slug) => slug,
            None => {
                let derived = slugify(&name);
                if derived.is_empty() {
                    return Err(ApiError::field("slug", BAD_SLUG));
                }
                derived
            }
        };
        Ok(NewProduct {
            name,
            slug,
            category,
            price,
            stock,
            region,
            description: self.description.flatten(),
        })
    }

    fn into_changes(self) -> ProductChanges {
        ProductChanges {
            name: self.name,
            slug: self.slug,
            category: self.category,
            price: self.price,
            stock: self.stock,
            region: self.region,
            description: self.description,
        }
    }
}

/// Uniqueness failures as DRF-style `non_field_errors`.
fn conflict(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict(detail) => {
            let fields = if detail.contains("slug") { "slug" } else { "name" };
            ApiError::field(
                "non_field_errors",
                format!("The fields {fields}, owner must make a unique set."),
            )
        }
        other => other.into(),
    }
}

/// POST /api/inventory/create
async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let new = validate(&parse(&body)?, false)?.into_new()?;
    let product = ProductRepo::create(&*db(&state)?, auth.user_id, &new).map_err(conflict)?;
    info!(user_id = auth.user_id, slug = %product.slug, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/inventory/list?limit=n
async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Vec<Product>>> {
    let limit = match params.get("limit") {
        Some(raw) => Some(
            raw.trim()
                .parse::<usize>()
                .map_err(|_| ApiError::field("limit", BAD_INTEGER))?,
        ),
        None => None,
    };
    let products = ProductRepo::list_for_owner(&*db(&state)?, auth.user_id, limit)?;
    Ok(Json(products))
}

/// PUT /api/inventory/update/{slug}/
async fn replace(
    state: State<AppState>,
    auth: AuthUser,
    slug: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Product>> {
    update(state, auth, slug, &body, false)
}

/// PATCH /api/inventory/update/{slug}/
async fn amend(
    state: State<AppState>,
    auth: AuthUser,
    slug: Path<String>,
    body: Bytes,
) -> ApiResult<Json<Product>> {
    update(state, auth, slug, &body, true)
}

fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
    body: &Bytes,
    partial: bool,
) -> ApiResult<Json<Product>> {
    let conn = db(&state)?;
    let _existing = ProductRepo::get_by_slug(&conn, auth.user_id, &slug)?;
    let changes = validate(&parse(body)?, partial)?.into_changes();
    let product = ProductRepo::update(&conn, auth.user_id, &slug, &changes).map_err(conflict)?;
    info!(user_id = auth.user_id, slug = %product.slug, partial, "product updated");
    Ok(Json(product))
}

/// DELETE /api/inventory/delete/{slug}/
async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<StatusCode> {
    ProductRepo::delete(&*db(&state)?, auth.user_id, &slug)?;
    info!(user_id = auth.user_id, %slug, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// JSON body; unlike the auth routes, malformed JSON is a 400 here.
fn parse(body: &Bytes) -> ApiResult<Value> {
    if body.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Body {
        status: StatusCode::BAD_REQUEST,
        body: serde_json::json!({ "detail": format!("JSON parse error - {e}") }),
    })
}
