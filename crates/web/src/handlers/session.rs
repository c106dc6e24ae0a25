//! Landing page, home feed and sign-in/out.

use axum::extract::State;
use axum::Json;
use notesync_client::views::{HomeFeed, NoteSummary};
use notesync_core::models::Identity;
use notesync_core::routes::PATH_SIGN_IN;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// What `/` shows: a landing page when signed out, the feed otherwise.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum RootView {
    Landing { sign_in: &'static str },
    Feed { notes: Vec<NoteSummary> },
}

#[derive(Debug, Serialize)]
pub struct SignInForm {
    pub fields: [&'static str; 2],
}

#[derive(Debug, Serialize)]
pub struct SignedOut {
    pub signed_out: bool,
}

/// GET /
pub async fn root(State(state): State<AppState>) -> AppResult<Json<DataResponse<RootView>>> {
    if !state.client.session.is_authenticated() {
        return Ok(Json(DataResponse {
            data: RootView::Landing {
                sign_in: PATH_SIGN_IN,
            },
        }));
    }

    let feed = HomeFeed::open(&state.client).await?;
    let notes = feed.items();
    feed.close();
    Ok(Json(DataResponse {
        data: RootView::Feed { notes },
    }))
}

/// GET /signin
pub async fn sign_in_form() -> Json<DataResponse<SignInForm>> {
    Json(DataResponse {
        data: SignInForm {
            fields: ["email", "password"],
        },
    })
}

/// POST /signin
pub async fn sign_in(
    State(state): State<AppState>,
    Json(input): Json<SignInRequest>,
) -> AppResult<Json<DataResponse<Identity>>> {
    let identity = state.client.session.sign_in(&input.email, &input.password).await?;
    Ok(Json(DataResponse { data: identity }))
}

/// POST /signout
pub async fn sign_out(State(state): State<AppState>) -> AppResult<Json<DataResponse<SignedOut>>> {
    state.client.session.sign_out().await?;
    Ok(Json(DataResponse {
        data: SignedOut { signed_out: true },
    }))
}
