//! Live snapshot streams over a real socket.

mod common;

use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

use common::{create_folder, create_note, signed_in_app};

async fn next_frame<S>(ws: &mut S) -> Value
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within timeout")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn feed_stream_pushes_new_public_notes() {
    let (app, _) = signed_in_app().await;
    let folder_id = create_folder(&app, "Recipes").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app_clone = app.clone();
    let server = tokio::spawn(async move { axum::serve(listener, app_clone).await });

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/live/feed"))
        .await
        .unwrap();

    let first = next_frame(&mut ws).await;
    assert!(first["items"].as_array().unwrap().is_empty());
    let mut version = first["version"].as_u64().unwrap();

    let note_id = create_note(&app, &folder_id, "Fresh", true).await;

    loop {
        let frame = next_frame(&mut ws).await;
        let next = frame["version"].as_u64().unwrap();
        assert!(next > version || (next == 0 && version == 0));
        version = next;
        if frame["items"][0]["id"] == note_id.as_str() {
            assert_eq!(frame["items"][0]["title"], "Fresh");
            break;
        }
    }

    ws.close(None).await.unwrap();
    server.abort();
}

#[tokio::test]
async fn folder_stream_requires_a_session() {
    let (app, state) = signed_in_app().await;
    state.client.session.sign_out().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/live/folders")).await;
    assert!(result.is_err());

    server.abort();
}

#[tokio::test]
async fn feed_stream_requires_a_session() {
    let (app, state) = signed_in_app().await;
    let folder_id = create_folder(&app, "Recipes").await;
    create_note(&app, &folder_id, "Public", true).await;
    state.client.session.sign_out().await.unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move { axum::serve(listener, app).await });

    let result = tokio_tungstenite::connect_async(format!("ws://{addr}/live/feed")).await;
    assert!(result.is_err());

    server.abort();
}
