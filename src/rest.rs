// REST surface - vendors CRUD, auth, health
//
// Two list styles coexist: the flat legacy shape `{data: [...]}` and the
// connection shape `{view: {...}}` behind /vendors/view. Domain errors map
// to 400 with `{error, code}`; storage failures map to 500.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::auth::{login, AccessGate};
use crate::eligibility::EligibilityEngine;
use crate::entities::{Vendor, VendorType};
use crate::error::{DomainError, ErrorBody, Result};
use crate::graphql::{build_schema, graphql_handler, PlatformSchema};
use crate::pagination::{paginate, Connection};
use crate::store::Storage;
use crate::workflow::EnrollmentWorkflow;

// ============================================================================
// APP STATE
// ============================================================================

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub gate: AccessGate,
    pub engine: EligibilityEngine,
    pub workflow: EnrollmentWorkflow,
    pub schema: PlatformSchema,
}

impl AppState {
    pub fn new(storage: Storage, gate: AccessGate) -> Self {
        let engine = EligibilityEngine::new(storage.clone());
        let workflow = EnrollmentWorkflow::new(storage.clone());
        let schema = build_schema(storage.clone(), engine.clone(), workflow.clone());
        AppState {
            storage,
            gate,
            engine,
            workflow,
            schema,
        }
    }
}

// ============================================================================
// WIRE SHAPES
// ============================================================================

#[derive(Deserialize)]
struct VendorPayload {
    name: Option<String>,
    #[serde(rename = "type")]
    vendor_type: Option<String>,
}

impl VendorPayload {
    fn parse(self) -> Result<(String, VendorType)> {
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(DomainError::missing_input("name")),
        };
        let raw = self
            .vendor_type
            .ok_or(DomainError::missing_input("type"))?;
        Ok((name, VendorType::parse(&raw)?))
    }
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct PageParams {
    first: Option<i64>,
    after: Option<String>,
}

#[derive(Serialize)]
struct DataBody<T> {
    data: T,
}

#[derive(Serialize)]
struct ViewBody<T> {
    view: Connection<T>,
}

#[derive(Serialize)]
struct TokenBody {
    token: String,
}

/// All domain errors surface as 400 except storage failures, which are the
/// one thing the caller cannot fix.
fn error_response(err: &DomainError) -> Response {
    let status = match err {
        DomainError::Persistence(_) => {
            warn!(error = %err, "storage failure at request boundary");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorBody::from(err))).into_response()
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// POST /vendors
async fn create_vendor(
    State(state): State<AppState>,
    Json(payload): Json<VendorPayload>,
) -> Response {
    let result = payload.parse().and_then(|(name, vendor_type)| {
        let vendor = Vendor::new(name, vendor_type);
        state.storage.vendors.insert(&vendor)?;
        Ok(vendor)
    });

    match result {
        Ok(vendor) => (StatusCode::CREATED, Json(vendor)).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /vendors - flat legacy shape
async fn list_vendors(State(state): State<AppState>) -> Response {
    match state.storage.vendors.list() {
        Ok(vendors) => Json(DataBody { data: vendors }).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /vendors/view - connection shape
async fn view_vendors(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    let result = state
        .storage
        .vendors
        .list()
        .and_then(|vendors| paginate(vendors, params.first, params.after.as_deref()));

    match result {
        Ok(view) => Json(ViewBody { view }).into_response(),
        Err(err) => error_response(&err),
    }
}

/// GET /vendors/:id
async fn get_vendor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let result = state
        .storage
        .vendors
        .find_by_id(&id)
        .and_then(|found| found.ok_or(DomainError::VendorNotFound { id }));

    match result {
        Ok(vendor) => Json(vendor).into_response(),
        Err(err) => error_response(&err),
    }
}

/// PUT /vendors/:id
async fn update_vendor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<VendorPayload>,
) -> Response {
    let result = payload.parse().and_then(|(name, vendor_type)| {
        let mut vendor = state
            .storage
            .vendors
            .find_by_id(&id)?
            .ok_or(DomainError::VendorNotFound { id })?;
        vendor.name = name;
        vendor.vendor_type = vendor_type;
        vendor.touch();
        state.storage.vendors.update(&vendor)?;
        Ok(())
    });

    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}

/// DELETE /vendors/:id
async fn delete_vendor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.storage.vendors.delete(&id) {
        Ok(true) => Json(true).into_response(),
        Ok(false) => error_response(&DomainError::VendorNotFound { id }),
        Err(err) => error_response(&err),
    }
}

/// POST /auth
async fn auth_token(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Response {
    match login(
        &state.storage,
        &state.gate,
        &credentials.username,
        &credentials.password,
    ) {
        Ok(token) => Json(TokenBody { token }).into_response(),
        Err(err) => error_response(&err),
    }
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/vendors", post(create_vendor).get(list_vendors))
        .route("/vendors/view", get(view_vendors))
        .route(
            "/vendors/{id}",
            get(get_vendor).put(update_vendor).delete(delete_vendor),
        )
        .route("/auth", post(auth_token))
        .route("/graphql", post(graphql_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{hash_password, AccessGate, DEFAULT_TOKEN_TTL_SECS};
    use crate::entities::Member;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let storage = Storage::in_memory();
        let gate = AccessGate::new("test-secret", DEFAULT_TOKEN_TTL_SECS);
        let state = AppState::new(storage, gate);
        (build_router(state.clone()), state)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get_vendor() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(post_json("/vendors", r#"{"name":"Acme","type":"MERCHANT"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["name"], "Acme");
        assert_eq!(created["type"], "MERCHANT");

        let id = created["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(get_req(&format!("/vendors/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], *id);
    }

    #[tokio::test]
    async fn test_create_vendor_validation_errors() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(post_json("/vendors", r#"{"type":"MERCHANT"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "MISSING_INPUT");

        let response = app
            .clone()
            .oneshot(post_json("/vendors", r#"{"name":"Acme","type":"BOGUS"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_ENUM_VALUE");
    }

    #[tokio::test]
    async fn test_duplicate_vendor_name_rejected() {
        let (app, _) = app();
        let payload = r#"{"name":"Acme","type":"MERCHANT"}"#;

        let response = app.clone().oneshot(post_json("/vendors", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.clone().oneshot(post_json("/vendors", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_flat_list_shape() {
        let (app, state) = app();
        state
            .storage
            .vendors
            .insert(&Vendor::new("Acme".to_string(), VendorType::Merchant))
            .unwrap();

        let response = app.clone().oneshot(get_req("/vendors")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_view_list_shape_and_pagination_errors() {
        let (app, state) = app();
        for name in ["One", "Two", "Three"] {
            state
                .storage
                .vendors
                .insert(&Vendor::new(name.to_string(), VendorType::Merchant))
                .unwrap();
        }

        let response = app
            .clone()
            .oneshot(get_req("/vendors/view?first=2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["view"]["totalCount"], 3);
        assert_eq!(body["view"]["edges"].as_array().unwrap().len(), 2);
        assert_eq!(body["view"]["pageInfo"]["hasNextPage"], true);

        let response = app
            .clone()
            .oneshot(get_req("/vendors/view?first=-1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "PAGINATION_INPUT");
        assert_eq!(body["error"], "Invalid first");

        let response = app
            .clone()
            .oneshot(get_req("/vendors/view?after=%21%21%21"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid cursor");
    }

    #[tokio::test]
    async fn test_update_vendor_returns_no_content() {
        let (app, state) = app();
        let vendor = Vendor::new("Acme".to_string(), VendorType::Merchant);
        state.storage.vendors.insert(&vendor).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri(format!("/vendors/{}", vendor.id))
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Acme Corp","type":"PARTNER"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let updated = state.storage.vendors.find_by_id(&vendor.id).unwrap().unwrap();
        assert_eq!(updated.name, "Acme Corp");
        assert_eq!(updated.vendor_type, VendorType::Partner);
    }

    #[tokio::test]
    async fn test_delete_vendor() {
        let (app, state) = app();
        let vendor = Vendor::new("Acme".to_string(), VendorType::Merchant);
        state.storage.vendors.insert(&vendor).unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/vendors/{}", vendor.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!(true));

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/vendors/{}", vendor.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VENDOR_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_auth_issues_token() {
        let (app, state) = app();
        let member = Member::new("alice".to_string(), hash_password("hunter2"));
        state.storage.members.insert(&member).unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth",
                r#"{"username":"alice","password":"hunter2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let token = body_json(response).await["token"].as_str().unwrap().to_string();

        let ctx = state.gate.authorize(Some(&format!("Bearer {token}")));
        assert!(ctx.allowed);
        assert_eq!(ctx.subject.as_deref(), Some(member.id.as_str()));
    }

    #[tokio::test]
    async fn test_auth_failures() {
        let (app, _) = app();

        let response = app
            .clone()
            .oneshot(post_json("/auth", r#"{"username":"","password":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "MISSING_CREDENTIALS");

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth",
                r#"{"username":"nobody","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
    }
}
