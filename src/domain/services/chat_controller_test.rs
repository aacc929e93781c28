use std::io;
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use test_utils::chunk_bytes;
use test_utils::ndjson_fixture;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use super::ChatController;
use super::FALLBACK_MESSAGE;
use crate::domain::models::Author;
use crate::domain::models::Backend;
use crate::domain::models::ByteStream;
use crate::domain::models::ChatRequest;
use crate::domain::models::ChatState;
use crate::domain::models::Event;
use crate::domain::models::MessageType;
use crate::domain::models::SessionStore;
use crate::domain::services::MAX_LINE_LENGTH;
use crate::infrastructure::session_stores::memory::MemorySessionStore;

#[derive(Clone)]
enum Chunk {
    Data(Vec<u8>),
    Disconnect,
}

#[derive(Clone, Default)]
struct ScriptedBackend {
    chunks: Vec<Chunk>,
    reject: bool,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedBackend {
    fn with_body(body: &str, chunk_size: usize) -> ScriptedBackend {
        return ScriptedBackend {
            chunks: chunk_bytes(body.as_bytes(), chunk_size)
                .into_iter()
                .map(Chunk::Data)
                .collect(),
            ..ScriptedBackend::default()
        };
    }

    fn with_chunks(chunks: Vec<Chunk>) -> ScriptedBackend {
        return ScriptedBackend {
            chunks,
            ..ScriptedBackend::default()
        };
    }

    fn rejecting() -> ScriptedBackend {
        return ScriptedBackend {
            reject: true,
            ..ScriptedBackend::default()
        };
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn health_check(&self) -> Result<()> {
        return Ok(());
    }

    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream> {
        self.requests.lock().await.push(request);
        if self.reject {
            bail!("connection refused");
        }

        let items = self
            .chunks
            .iter()
            .map(|chunk| match chunk {
                Chunk::Data(data) => return Ok(Bytes::from(data.clone())),
                Chunk::Disconnect => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset",
                    ))
                }
            })
            .collect::<Vec<io::Result<Bytes>>>();

        return Ok(stream::iter(items).boxed());
    }
}

fn controller(
    backend: &ScriptedBackend,
    store: &MemorySessionStore,
    client_session_id: bool,
) -> (ChatController, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let controller = ChatController::new(
        Box::new(backend.clone()),
        Box::new(store.clone()),
        client_session_id,
        tx,
    );

    return (controller, rx);
}

fn states(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<ChatState> {
    let mut res = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::ChatStateChanged(state) = event {
            res.push(state);
        }
    }

    return res;
}

#[tokio::test]
async fn it_streams_a_turn() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 7);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("I'm launching a water bottle").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].author, Author::User);
    assert_eq!(messages[0].text, "I'm launching a water bottle");

    let reply = &messages[1];
    assert_eq!(reply.author, Author::Assistant);
    assert!(!reply.is_streaming);
    assert_eq!(
        reply.text,
        "Great product! Which channel should we focus on? <BUTTONS>Instagram, TikTok , Email</BUTTONS>"
    );
    assert_eq!(
        reply.thoughts,
        vec!["Searching for: eco-friendly water bottles"]
    );

    let directives = reply.directives();
    assert_eq!(
        directives.display_text,
        "Great product! Which channel should we focus on?"
    );
    assert_eq!(directives.button_labels, vec!["Instagram", "TikTok", "Email"]);
    assert!(!directives.show_form);

    assert_eq!(controller.state(), ChatState::Idle);
    assert_eq!(
        states(&mut rx),
        vec![ChatState::Sending, ChatState::Streaming, ChatState::Idle]
    );

    return Ok(());
}

#[tokio::test]
async fn it_publishes_growing_snapshots() -> Result<()> {
    let body = "{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n";
    let backend = ScriptedBackend::with_body(body, 3);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let mut texts = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::ConversationUpdated(conversation) = event {
            if let Some(msg) = conversation.last() {
                if msg.author == Author::Assistant {
                    texts.push((msg.text.to_string(), msg.is_streaming));
                }
            }
        }
    }

    assert_eq!(
        texts,
        vec![
            ("".to_string(), true),
            ("Hel".to_string(), true),
            ("Hello".to_string(), true),
            ("Hello".to_string(), false),
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_skips_malformed_lines() -> Result<()> {
    let body = "{\"response\":\"Hello \"}\nnot-json\n{\"response\":\"World\"}\n";
    let backend = ScriptedBackend::with_body(body, 4);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, "Hello World");
    assert_eq!(messages[1].message_type(), MessageType::Normal);
    assert!(!states(&mut rx).contains(&ChatState::Failed));

    return Ok(());
}

#[tokio::test]
async fn it_keeps_unterminated_final_delta() -> Result<()> {
    let body = "{\"response\":\"Hello \"}\n{\"response\":\"World\"}";
    let backend = ScriptedBackend::with_body(body, 5);
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    assert_eq!(controller.conversation().messages()[1].text, "Hello World");

    return Ok(());
}

#[tokio::test]
async fn it_replaces_placeholder_on_rejection() -> Result<()> {
    let backend = ScriptedBackend::rejecting();
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].author, Author::Assistant);
    assert_eq!(messages[1].text, FALLBACK_MESSAGE);
    assert_eq!(messages[1].message_type(), MessageType::Error);
    assert!(!messages[1].is_streaming);

    assert_eq!(controller.state(), ChatState::Idle);
    assert_eq!(
        states(&mut rx),
        vec![ChatState::Sending, ChatState::Failed, ChatState::Idle]
    );

    return Ok(());
}

#[tokio::test]
async fn it_replaces_placeholder_when_stream_drops_before_any_delta() -> Result<()> {
    let backend = ScriptedBackend::with_chunks(vec![
        Chunk::Data(b"{\"type\":\"progress\",\"content\":\"Researching\"}\n".to_vec()),
        Chunk::Disconnect,
    ]);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, FALLBACK_MESSAGE);
    assert!(messages.iter().all(|msg| return !msg.is_streaming));
    assert_eq!(
        states(&mut rx),
        vec![
            ChatState::Sending,
            ChatState::Streaming,
            ChatState::Failed,
            ChatState::Idle
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_keeps_partial_message_when_stream_drops() -> Result<()> {
    let backend = ScriptedBackend::with_chunks(vec![
        Chunk::Data(b"{\"response\":\"Here is half\"}\n{\"response\":\" of".to_vec()),
        Chunk::Disconnect,
    ]);
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].text, "Here is half");
    assert!(!messages[1].is_streaming);
    assert_eq!(messages[1].message_type(), MessageType::Normal);
    assert_eq!(messages[2].text, FALLBACK_MESSAGE);
    assert_eq!(controller.state(), ChatState::Idle);

    return Ok(());
}

#[tokio::test]
async fn it_never_offers_quick_replies_from_a_dropped_turn() -> Result<()> {
    let backend = ScriptedBackend::with_chunks(vec![
        Chunk::Data(b"{\"response\":\"Pick one <BUTTONS>A, B</BUTTONS>\"}\n".to_vec()),
        Chunk::Disconnect,
    ]);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let mut snapshots = vec![];
    while let Ok(event) = rx.try_recv() {
        if let Event::ConversationUpdated(conversation) = event {
            snapshots.push(conversation);
        }
    }

    assert!(!snapshots.is_empty());
    for conversation in &snapshots {
        assert_eq!(conversation.quick_replies(), Vec::<String>::new());
    }

    let last = snapshots.last().map(|e| return e.messages().to_vec()).unwrap_or_default();
    assert_eq!(last.len(), 3);
    assert_eq!(last[1].text, "Pick one <BUTTONS>A, B</BUTTONS>");
    assert!(!last[1].is_streaming);
    assert_eq!(last[2].message_type(), MessageType::Error);

    return Ok(());
}

#[tokio::test]
async fn it_fails_the_turn_on_an_overlong_line() -> Result<()> {
    let body = format!("{{\"response\":\"{}\"}}\n", "x".repeat(MAX_LINE_LENGTH));
    let backend = ScriptedBackend::with_body(&body, 64 * 1024);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].text, FALLBACK_MESSAGE);
    assert_eq!(messages[1].message_type(), MessageType::Error);
    assert_eq!(
        states(&mut rx),
        vec![
            ChatState::Sending,
            ChatState::Streaming,
            ChatState::Failed,
            ChatState::Idle,
        ]
    );

    return Ok(());
}

#[tokio::test]
async fn it_generates_and_persists_client_session_id() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 64);
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;

    let stored = store.get().await?;
    assert!(stored.is_some());
    assert_ne!(stored, Some("a1b2c3".to_string()));

    let requests = backend.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].message, "Hi");
    assert_eq!(requests[0].session_id, stored);

    return Ok(());
}

#[tokio::test]
async fn it_adopts_server_session_id() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 64);
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, false);

    controller.send("Hi").await?;
    assert_eq!(backend.requests.lock().await[0].session_id, None);
    assert_eq!(store.get().await?, Some("a1b2c3".to_string()));

    controller.send("Tell me more").await?;
    assert_eq!(
        backend.requests.lock().await[1].session_id,
        Some("a1b2c3".to_string())
    );

    return Ok(());
}

#[tokio::test]
async fn it_reuses_stored_session_id() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 64);
    let store = MemorySessionStore::with_session_id("existing");
    let (mut controller, _rx) = controller(&backend, &store, false);

    controller.send("Hi").await?;

    assert_eq!(
        backend.requests.lock().await[0].session_id,
        Some("existing".to_string())
    );
    assert_eq!(store.get().await?, Some("existing".to_string()));

    return Ok(());
}

#[tokio::test]
async fn it_ignores_blank_input() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 64);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("   ").await?;

    assert!(controller.conversation().is_empty());
    assert!(rx.try_recv().is_err());
    assert!(backend.requests.lock().await.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_requests_product_form() -> Result<()> {
    let body = "{\"response\":\"Tell me about your product.\"}\n{\"response\":\"<SHOW_PRODUCT_FORM>\"}\n";
    let backend = ScriptedBackend::with_body(body, 9);
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;
    assert!(controller.conversation().form_requested());

    let reply = controller.conversation().last().unwrap().directives();
    assert_eq!(reply.display_text, "Tell me about your product.");

    return Ok(());
}

#[tokio::test]
async fn it_starts_new_chat() -> Result<()> {
    let backend = ScriptedBackend::with_body(ndjson_fixture(), 64);
    let store = MemorySessionStore::default();
    let (mut controller, mut rx) = controller(&backend, &store, true);

    controller.send("Hi").await?;
    assert!(store.get().await?.is_some());
    states(&mut rx);

    controller.new_chat().await?;

    assert!(controller.conversation().is_empty());
    assert_eq!(store.get().await?, None);
    match rx.try_recv() {
        Ok(Event::ConversationUpdated(conversation)) => assert!(conversation.is_empty()),
        _ => bail!("Expected an empty conversation snapshot"),
    }

    return Ok(());
}

#[tokio::test]
async fn it_returns_to_idle_between_turns() -> Result<()> {
    let backend = ScriptedBackend::rejecting();
    let store = MemorySessionStore::default();
    let (mut controller, _rx) = controller(&backend, &store, true);

    controller.send("First").await?;
    controller.send("Second").await?;

    let messages = controller.conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].text, "Second");
    assert_eq!(backend.requests.lock().await.len(), 2);

    return Ok(());
}

#[tokio::test]
async fn it_streams_from_agent_api() -> Result<()> {
    use crate::infrastructure::backends::agent_api::AgentApi;

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/agent/chat")
        .with_status(200)
        .with_body(ndjson_fixture())
        .create_async()
        .await;

    let (tx, _rx) = mpsc::unbounded_channel::<Event>();
    let mut controller = ChatController::new(
        Box::new(AgentApi::with_url(server.url())),
        Box::<MemorySessionStore>::default(),
        false,
        tx,
    );

    controller.send("Hi").await?;
    mock.assert_async().await;

    let reply = controller.conversation().last().unwrap().directives();
    assert_eq!(reply.button_labels, vec!["Instagram", "TikTok", "Email"]);

    return Ok(());
}
