use anyhow::Result;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error};

use axum_extra::extract::cookie::{Cookie, SameSite};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::session::{Session, COOKIE_SESSION_TOKEN_KEY};
use super::{log_requests, state::*, ServerConfig};
use crate::collection_store::{
    AlbumUpsert, CollectionStore, NewReview, ReviewPatch, ReviewSort, ReviewWithAlbum,
};
use crate::user::auth::{AuthToken, AuthTokenValue};
use crate::user::{UserAuthCredentialsStore, UserAuthTokenStore};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
    pub session_token: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct LoginBody {
    pub user_handle: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
}

#[derive(Deserialize, Debug, Default)]
struct ListReviewsQuery {
    // The web client historically sent camelCase
    #[serde(default, alias = "sortBy")]
    pub sort_by: ReviewSort,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        session_token: session.map(|s| s.token),
    };
    Json(stats)
}

async fn login(State(state): State<ServerState>, Json(body): Json<LoginBody>) -> Response {
    debug!("login() called for {}", body.user_handle);
    let credentials = match state.user_store.get_user_auth_credentials(&body.user_handle) {
        Ok(Some(credentials)) => credentials,
        Ok(None) => return StatusCode::FORBIDDEN.into_response(),
        Err(err) => {
            error!("Error loading credentials: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let Some(password_credentials) = &credentials.username_password else {
        return StatusCode::FORBIDDEN.into_response();
    };

    match password_credentials.hasher.verify(
        &body.password,
        &password_credentials.hash,
        &password_credentials.salt,
    ) {
        Ok(true) => {}
        _ => return StatusCode::FORBIDDEN.into_response(),
    }

    let auth_token = AuthToken {
        user_id: credentials.user_id,
        created: SystemTime::now(),
        last_used: None,
        value: AuthTokenValue::generate(),
    };
    if let Err(err) = state.user_store.add_user_auth_token(auth_token.clone()) {
        error!("Error with auth token generation: {}", err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let response_body = LoginSuccessResponse {
        token: auth_token.value.0.clone(),
    };
    let response_body = serde_json::to_string(&response_body).unwrap();

    let cookie_value = HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly",
        COOKIE_SESSION_TOKEN_KEY, auth_token.value.0
    ))
    .unwrap();
    response::Builder::new()
        .status(StatusCode::CREATED)
        .header(axum::http::header::SET_COOKIE, cookie_value)
        .body(Body::from(response_body))
        .unwrap()
}

async fn logout(State(user_store): State<GuardedUserStore>, session: Session) -> Response {
    match user_store.delete_user_auth_token(&AuthTokenValue(session.token)) {
        Ok(_) => {
            let cookie_value = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
                .path("/")
                .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1)) // Expire it in the past
                .same_site(SameSite::Lax)
                .build();

            response::Builder::new()
                .status(StatusCode::OK)
                .header(axum::http::header::SET_COOKIE, cookie_value.to_string())
                .body(Body::empty())
                .unwrap()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn post_album(
    _session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Json(body): Json<AlbumUpsert>,
) -> Response {
    debug!("Upserting album with id {}", body.id);
    match collection_store.upsert_album(body) {
        Ok(album) => (StatusCode::CREATED, Json(album)).into_response(),
        Err(err) => {
            error!("Error upserting album: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

async fn list_reviews(
    session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Query(query): Query<ListReviewsQuery>,
) -> Response {
    // Read path fails soft: a store error renders as an empty collection
    match collection_store.list_reviews(Some(session.user_id), query.sort_by) {
        Ok(reviews) => Json(reviews).into_response(),
        Err(err) => {
            error!("Error listing reviews: {}", err);
            Json(Vec::<ReviewWithAlbum>::new()).into_response()
        }
    }
}

async fn post_review(
    session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Json(body): Json<NewReview>,
) -> Response {
    match collection_store.create_review(session.user_id, body) {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(err) => {
            error!("Error creating review: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

async fn get_review(
    _session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Path(id): Path<String>,
) -> Response {
    match collection_store.get_review(&id) {
        Ok(Some(review)) => Json(review).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Error fetching review {}: {}", id, err);
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

async fn put_review(
    _session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Path(id): Path<String>,
    Json(body): Json<ReviewPatch>,
) -> Response {
    debug!("Updating review with id {}", id);
    match collection_store.update_review(&id, body) {
        Ok(Some(review)) => Json(review).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Error updating review {}: {}", id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

async fn delete_review(
    _session: Session,
    State(collection_store): State<GuardedCollectionStore>,
    Path(id): Path<String>,
) -> Response {
    match collection_store.delete_review(&id) {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            error!("Error deleting review {}: {}", id, err);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}", err)).into_response()
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    collection_store: GuardedCollectionStore,
    user_store: GuardedUserStore,
) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        collection_store,
        user_store,
    };

    let auth_routes: Router = Router::new()
        .route("/login", post(login))
        .route("/logout", get(logout))
        .with_state(state.clone());

    let collection_routes: Router = Router::new()
        .route("/albums", post(post_album))
        .route("/reviews", get(list_reviews))
        .route("/reviews", post(post_review))
        .route("/reviews/{id}", get(get_review))
        .route("/reviews/{id}", put(put_review))
        .route("/reviews/{id}", delete(delete_review))
        .with_state(state.clone());

    let home_router: Router = match &config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/auth", auth_routes)
        .nest("/v1/collection", collection_routes)
        .layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    config: ServerConfig,
    collection_store: GuardedCollectionStore,
    user_store: GuardedUserStore,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, collection_store, user_store)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
