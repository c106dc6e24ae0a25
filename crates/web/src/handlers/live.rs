//! Live WebSocket streams of full snapshots.
//!
//! Each connection owns one view. The current snapshot is sent on connect,
//! then every re-delivery. The view is closed when the socket ends, and
//! closing it releases the backend subscription.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use notesync_client::views::{summarize, FolderListView, FolderNotesView, HomeFeed, NoteDetailView, NoteState};
use notesync_client::{CollectionViewModel, Snapshot};
use notesync_core::document::Document;
use notesync_core::error::CoreError;
use notesync_core::models::{Comment, Folder, Note};
use notesync_core::query::CollectionQuery;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::middleware::session::SignedIn;
use crate::state::AppState;

/// A screen whose list can be streamed.
pub trait LiveView: Send + 'static {
    type Item: Document;

    fn view_model(&mut self) -> &mut CollectionViewModel<Self::Item>;

    fn render(items: &[Self::Item]) -> Value;

    fn close(&self);
}

impl LiveView for HomeFeed {
    type Item = Note;

    fn view_model(&mut self) -> &mut CollectionViewModel<Note> {
        HomeFeed::view_model(self)
    }

    fn render(items: &[Note]) -> Value {
        json!(summarize(items))
    }

    fn close(&self) {
        HomeFeed::close(self);
    }
}

impl LiveView for FolderListView {
    type Item = Folder;

    fn view_model(&mut self) -> &mut CollectionViewModel<Folder> {
        FolderListView::view_model(self)
    }

    fn render(items: &[Folder]) -> Value {
        json!(items)
    }

    fn close(&self) {
        FolderListView::close(self);
    }
}

impl LiveView for FolderNotesView {
    type Item = Note;

    fn view_model(&mut self) -> &mut CollectionViewModel<Note> {
        FolderNotesView::view_model(self)
    }

    fn render(items: &[Note]) -> Value {
        json!(summarize(items))
    }

    fn close(&self) {
        FolderNotesView::close(self);
    }
}

impl<T: Document + Serialize + Send + Sync + 'static> LiveView for CollectionViewModel<T> {
    type Item = T;

    fn view_model(&mut self) -> &mut CollectionViewModel<T> {
        self
    }

    fn render(items: &[T]) -> Value {
        json!(items)
    }

    fn close(&self) {
        CollectionViewModel::close(self);
    }
}

fn frame<V: LiveView>(snapshot: &Snapshot<V::Item>) -> Message {
    let body = json!({
        "version": snapshot.version,
        "items": V::render(&snapshot.items),
    });
    Message::Text(body.to_string().into())
}

/// Pump snapshots into the socket until either side ends.
async fn stream_view<V: LiveView>(socket: WebSocket, mut view: V, stream: &'static str) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, stream, "Live stream opened");

    let (mut sink, mut inbound) = socket.split();

    let first = view.view_model().snapshot();
    if sink.send(frame::<V>(&first)).await.is_ok() {
        loop {
            tokio::select! {
                change = view.view_model().next_change() => match change {
                    Some(snapshot) => {
                        if sink.send(frame::<V>(&snapshot)).await.is_err() {
                            tracing::debug!(conn_id = %conn_id, "Live sink closed");
                            break;
                        }
                    }
                    None => break,
                },
                incoming = inbound.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "Live receive error");
                        break;
                    }
                },
            }
        }
    }

    view.close();
    tracing::info!(conn_id = %conn_id, stream, "Live stream closed");
}

/// GET /live/feed
pub async fn feed(
    ws: WebSocketUpgrade,
    _user: SignedIn,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let view = HomeFeed::open(&state.client).await?;
    Ok(ws.on_upgrade(move |socket| stream_view(socket, view, "feed")))
}

/// GET /live/folders
pub async fn folders(
    ws: WebSocketUpgrade,
    _user: SignedIn,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let view = FolderListView::open(&state.client).await?;
    Ok(ws.on_upgrade(move |socket| stream_view(socket, view, "folders")))
}

/// GET /live/folders/{id}
pub async fn folder_notes(
    ws: WebSocketUpgrade,
    _user: SignedIn,
    State(state): State<AppState>,
    Path(folder_id): Path<String>,
) -> AppResult<Response> {
    let view = FolderNotesView::open(&state.client, &folder_id).await?;
    Ok(ws.on_upgrade(move |socket| stream_view(socket, view, "folder_notes")))
}

/// GET /live/note/{id}/comments
///
/// Only for notes the user may see.
pub async fn comments(
    ws: WebSocketUpgrade,
    _user: SignedIn,
    State(state): State<AppState>,
    Path(note_id): Path<String>,
) -> AppResult<Response> {
    let detail = NoteDetailView::open(&state.client, &note_id).await?;
    let visible = matches!(detail.state(), NoteState::Found(_));
    detail.close();
    if !visible {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Note",
            id: note_id,
        }));
    }

    let comments = CollectionViewModel::<Comment>::open(
        state.client.store.as_ref(),
        CollectionQuery::comments_of(&note_id),
    )
    .await?;
    Ok(ws.on_upgrade(move |socket| stream_view(socket, comments, "comments")))
}
