//! Session gating for page routes and the signed-in user extractor.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use notesync_core::models::Identity;
use notesync_core::routes::{Gate, Route};

use crate::error::AppError;
use crate::state::AppState;

/// The page a request path belongs to: the longest non-empty prefix of
/// its segments that is in the route table. `/note/n1/comments` belongs to
/// `/note/n1`; `/health` belongs to no page.
pub fn owning_route(path: &str) -> Option<Route> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Route::parse("/");
    }
    (1..=segments.len())
        .rev()
        .find_map(|n| Route::parse(&format!("/{}", segments[..n].join("/"))))
}

/// Redirect requests the session may not see.
///
/// Protected pages and their sub-resources answer `303 See Other` to the
/// sign-in page while signed out; the sign-in page answers `303` to `/`
/// while signed in. Paths outside the route table pass through.
pub async fn gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let Some(route) = owning_route(request.uri().path()) else {
        return next.run(request).await;
    };

    match state.client.session.gate(&route) {
        Gate::Allow => next.run(request).await,
        Gate::Redirect(to) => {
            tracing::debug!(from = %route.path(), to, "Route gated");
            Redirect::to(to).into_response()
        }
    }
}

/// The signed-in user. Rejects with `401` when nobody is signed in.
///
/// For endpoints outside the route table, such as live streams.
#[derive(Debug, Clone)]
pub struct SignedIn(pub Identity);

impl FromRequestParts<AppState> for SignedIn {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(SignedIn(state.client.session.require_identity()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_resources_belong_to_their_page() {
        assert_eq!(
            owning_route("/note/n1/comments"),
            Some(Route::NoteDetail("n1".into()))
        );
        assert_eq!(owning_route("/folders/f1/"), Some(Route::FolderNotes("f1".into())));
        assert_eq!(owning_route("/"), Some(Route::Root));
    }

    #[test]
    fn paths_outside_the_route_table_have_no_page() {
        for path in ["/health", "/live/feed", "/signout", "/files/notes/n1/a.png"] {
            assert_eq!(owning_route(path), None, "{path}");
        }
    }
}
