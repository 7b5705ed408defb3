//! Landing and auth boundary pages
//!
//! Public pages (`/`, `/login`, `/signup`, `/auth/error`) send a signed-in
//! visitor to `/dashboard`. Authenticated pages (`/dashboard`,
//! `/canvas/:id`) send a visitor without a session to `/login`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};

use mindgrid_core::ServiceError;

use crate::auth::MaybeUser;
use crate::{AppState, HttpError};

pub const DASHBOARD_PATH: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/login";

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} · MindGrid</title></head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    ))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Redirect a signed-in visitor, otherwise render `content`
fn public_page(user: MaybeUser, content: Html<String>) -> Response {
    match user.0 {
        Some(_) => Redirect::to(DASHBOARD_PATH).into_response(),
        None => content.into_response(),
    }
}

async fn landing(user: MaybeUser) -> Response {
    public_page(
        user,
        page(
            "Think visually",
            "<h1>MindGrid</h1>\n<p>Map ideas on an infinite canvas, connect them, and let AI suggest what comes next.</p>\n<p><a href=\"/signup\">Get started</a> · <a href=\"/login\">Sign in</a></p>",
        ),
    )
}

async fn login(user: MaybeUser) -> Response {
    public_page(
        user,
        page(
            "Sign in",
            "<h1>Sign in</h1>\n<p>Sign in to open your canvases.</p>\n<p>No account yet? <a href=\"/signup\">Sign up</a></p>",
        ),
    )
}

async fn signup(user: MaybeUser) -> Response {
    public_page(
        user,
        page(
            "Sign up",
            "<h1>Create your account</h1>\n<p>Already have one? <a href=\"/login\">Sign in</a></p>",
        ),
    )
}

async fn auth_error(user: MaybeUser) -> Response {
    public_page(
        user,
        page(
            "Authentication error",
            "<h1>Something went wrong</h1>\n<p>We could not sign you in. <a href=\"/login\">Try again</a></p>",
        ),
    )
}

async fn dashboard(State(state): State<AppState>, user: MaybeUser) -> Result<Response, HttpError> {
    let Some(session) = user.0 else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    let canvases = state.canvases.list_canvases(&session.user_id).await?;
    let items: String = canvases
        .iter()
        .map(|c| format!("<li><a href=\"/canvas/{}\">{}</a></li>", escape(&c.id), escape(&c.name)))
        .collect::<Vec<_>>()
        .join("\n");

    let body = if items.is_empty() {
        "<h1>Your canvases</h1>\n<p>No canvases yet.</p>".to_string()
    } else {
        format!("<h1>Your canvases</h1>\n<ul>\n{}\n</ul>", items)
    };
    Ok(page("Dashboard", &body).into_response())
}

async fn canvas_page(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(canvas_id): Path<String>,
) -> Result<Response, HttpError> {
    let Some(session) = user.0 else {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    };

    match state
        .canvases
        .get_owned_canvas(&session.user_id, &canvas_id)
        .await
    {
        Ok(canvas) => {
            let description = canvas
                .description
                .as_deref()
                .map(|d| format!("<p>{}</p>", escape(d)))
                .unwrap_or_default();
            let body = format!(
                "<h1>{}</h1>\n{}\n<div id=\"canvas\" data-canvas-id=\"{}\"></div>",
                escape(&canvas.name),
                description,
                escape(&canvas.id)
            );
            Ok(page(&canvas.name, &body).into_response())
        }
        Err(ServiceError::NotFound { .. }) => Ok((
            StatusCode::NOT_FOUND,
            page("Not found", "<h1>Canvas not found</h1>"),
        )
            .into_response()),
        Err(e) => Err(e.into()),
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login))
        .route("/signup", get(signup))
        .route("/auth/error", get(auth_error))
        .route("/dashboard", get(dashboard))
        .route("/canvas/:id", get(canvas_page))
        .with_state(state)
}
