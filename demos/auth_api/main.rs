//! Authentication API example
//!
//! This example demonstrates:
//! - Request schemas with validators, input filters and extraneous-value stripping
//! - A uniqueness check backed by a lookup collaborator
//! - Response schemas with aliases, exclusions and nested types
//! - Controller-level middleware guarding every route of a controller
//! - Layered configuration and graceful shutdown
//!
//! ```text
//! curl -X POST localhost:3000/api/v1/auth/register \
//!      -H 'content-type: application/json' \
//!      -d '{"name":"Ada","email":"ada@example.com","password":"hunter22"}'
//! curl -X POST localhost:3000/api/v1/auth/login \
//!      -H 'content-type: application/json' \
//!      -d '{"email":"ada@example.com","password":"hunter22"}'
//! curl localhost:3000/api/v1/profile -H 'authorization: Bearer <token>'
//! ```

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use decl::prelude::*;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

/// In-memory users and session tokens
#[derive(Default)]
struct UserStore {
    users: RwLock<Vec<User>>,
    sessions: RwLock<HashMap<String, Uuid>>,
    emails: Arc<InMemoryUniqueLookup>,
}

impl UserStore {
    async fn insert(&self, user: User) {
        self.emails.insert("email", json!(user.email)).await;
        self.users.write().await.push(user);
    }

    async fn find_by_email(&self, email: &str) -> Option<User> {
        self.users.read().await.iter().find(|u| u.email == email).cloned()
    }

    async fn find_by_token(&self, token: &str) -> Option<User> {
        let id = *self.sessions.read().await.get(token)?;
        self.users.read().await.iter().find(|u| u.id == id).cloned()
    }

    async fn open_session(&self, user: &User) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.write().await.insert(token.clone(), user.id);
        token
    }
}

// =============================================================================
// Schemas
// =============================================================================

fn register_request(emails: Arc<InMemoryUniqueLookup>) -> SchemaDecl {
    let mut decl = SchemaDecl::new("RegisterRequest");
    decl.exclude_extraneous_values();
    decl.property("name").expose().is_string().required();
    decl.property("email")
        .expose()
        .transform(TransformFns::new().on_to_class(filters::trim()))
        .required()
        .is_string()
        .is_email()
        .unique(emails, None);
    decl.property("password")
        .expose()
        .is_string()
        .required()
        .string_length(8, 128);
    decl
}

struct LoginRequest;

impl Schema for LoginRequest {
    const NAME: &'static str = "LoginRequest";

    fn declare(decl: &mut SchemaDecl) {
        decl.exclude_extraneous_values();
        decl.property("email").expose().required().is_email();
        decl.property("password").expose().required().is_string();
    }
}

struct UserResponse;

impl Schema for UserResponse {
    const NAME: &'static str = "UserResponse";

    fn declare(decl: &mut SchemaDecl) {
        decl.property("id").expose();
        decl.property("email").expose();
        decl.property("name").expose_as("displayName");
        decl.property("password").exclude();
        decl.property("createdAt").expose();
    }
}

struct LoginResponse;

impl Schema for LoginResponse {
    const NAME: &'static str = "LoginResponse";

    fn declare(decl: &mut SchemaDecl) {
        decl.property("user").expose().nested::<UserResponse>();
        decl.property("token").expose();
    }
}

// =============================================================================
// Middlewares
// =============================================================================

/// Make the user store reachable from every middleware and handler
fn attach_store(store: Arc<UserStore>) -> SharedMiddleware {
    middleware_fn("attach_store", move |mut req: RequestData| {
        let store = store.clone();
        async move {
            req.insert_extension(store);
            Ok(req)
        }
    })
}

fn user_store(req: &RequestData) -> Result<Arc<UserStore>, PipelineError> {
    req.extension::<Arc<UserStore>>()
        .cloned()
        .ok_or_else(|| PipelineError::internal("Internal server error"))
}

fn authenticated() -> SharedMiddleware {
    middleware_fn("authenticated", |mut req: RequestData| async move {
        let Some(token) = req.bearer_token().map(str::to_string) else {
            return Err(PipelineError::unauthorized(
                "Missing or invalid Authorization header",
            ));
        };
        let store = user_store(&req)?;
        let Some(user) = store.find_by_token(&token).await else {
            return Err(PipelineError::unauthorized("Invalid or expired token"));
        };
        req.insert_extension(user);
        Ok(req)
    })
}

// =============================================================================
// Controllers
// =============================================================================

struct AuthController;

impl AuthController {
    async fn register(self: Arc<Self>, req: RequestData) -> HandlerResult {
        let store = user_store(&req)?;
        let user = User {
            id: Uuid::new_v4(),
            name: req.body["name"].as_str().unwrap_or_default().to_string(),
            email: req.body["email"].as_str().unwrap_or_default().to_string(),
            password: req.body["password"].as_str().unwrap_or_default().to_string(),
            created_at: Utc::now(),
        };
        store.insert(user.clone()).await;
        tracing::info!(user_id = %user.id, "user registered");

        let data = ResponseTransformer::transform(
            req.registry()?,
            &UserResponse::schema_id(),
            &serde_json::to_value(&user)?,
            None,
        )?;
        let data = serde_json::to_value(data)?;
        Ok(ResponseEnvelope::success(StatusCode::CREATED, data, None).into_handler_response())
    }

    async fn login(self: Arc<Self>, req: RequestData) -> HandlerResult {
        let store = user_store(&req)?;
        let credentials: Credentials = req.body_as()?;

        let user = match store.find_by_email(&credentials.email).await {
            Some(user) if user.password == credentials.password => user,
            _ => return Err(PipelineError::unauthorized("Invalid credentials")),
        };
        let token = store.open_session(&user).await;

        let data = ResponseTransformer::transform(
            req.registry()?,
            &LoginResponse::schema_id(),
            &json!({ "user": user, "token": token }),
            None,
        )?;
        Ok(HandlerResponse::ok(data))
    }
}

impl Controller for AuthController {
    const NAME: &'static str = "AuthController";

    fn declare(decl: &mut ControllerDecl) {
        decl.base_path("/auth");
        decl.route("register").post("/register").validate(
            Location::Body,
            "RegisterRequest",
            ValidationOptions::default(),
        );
        decl.route("login").post("/login").validate_body::<LoginRequest>();
    }

    fn bind(self: Arc<Self>, handler: &str) -> Option<Handler> {
        match handler {
            "register" => Some(bind(self, Self::register)),
            "login" => Some(bind(self, Self::login)),
            _ => None,
        }
    }
}

struct ProfileController;

impl ProfileController {
    async fn show(self: Arc<Self>, req: RequestData) -> HandlerResult {
        let user = req
            .extension::<User>()
            .ok_or_else(|| PipelineError::unauthorized("Unauthorized"))?;

        let data = ResponseTransformer::transform(
            req.registry()?,
            &UserResponse::schema_id(),
            &serde_json::to_value(user)?,
            None,
        )?;
        Ok(HandlerResponse::ok(json!({ "success": true, "user": data })))
    }
}

impl Controller for ProfileController {
    const NAME: &'static str = "ProfileController";

    fn declare(decl: &mut ControllerDecl) {
        decl.base_path("/profile");
        decl.use_middleware(authenticated());
        decl.route("show").get("");
    }

    fn bind(self: Arc<Self>, handler: &str) -> Option<Handler> {
        match handler {
            "show" => Some(bind(self, Self::show)),
            _ => None,
        }
    }
}

// =============================================================================
// Entry point
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,decl=debug")),
        )
        .init();

    let users = Arc::new(UserStore::default());

    let mut metadata = MetadataStore::new();
    metadata.declare_schema_with(register_request(users.emails.clone()));

    let mut builder = ServerBuilder::with_store(metadata)
        .with_config(PipelineConfig::from_yaml_str("base_path: /api/v1\nstrict: true")?);
    if let Ok(path) = std::env::var("DECL_CONFIG") {
        builder = builder.with_config_file(path)?;
    }

    builder
        .with_global_middleware(attach_store(users))
        .declare_schema::<LoginRequest>()
        .declare_schema::<UserResponse>()
        .declare_schema::<LoginResponse>()
        .register_controller(AuthController)
        .register_controller(ProfileController)
        .serve("127.0.0.1:3000")
        .await
}
