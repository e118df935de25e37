//! End-to-end block flows against an in-memory editor.

use std::sync::Arc;

use async_trait::async_trait;

use fude_block::{
    Action, BlockSession, Completion, CredentialStore, MemoryCredentialStore, SessionConfig,
    ViewBody, block_schema, schema::from_attrs,
};
use fude_doc::{CommandRecord, EditorCommands, MemoryEditor, Node, starter};
use fude_llm::{EchoGenerator, GeminiClient, GeminiConfig, GenerationClient};
use fude_types::{AI_BLOCK, CREDENTIAL_KEY, GenerationRequest, GenerationResult, Phase};
use mockito::{Matcher, Server, ServerGuard};

const PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

fn editor_with(text: &str) -> MemoryEditor {
    MemoryEditor::with_blocks(Arc::new(block_schema()), vec![Node::paragraph(text)]).unwrap()
}

fn session_with(client: Arc<dyn GenerationClient>) -> BlockSession {
    BlockSession::new(
        client,
        Arc::new(MemoryCredentialStore::new()),
        SessionConfig::default(),
    )
}

/// Always answers with the same text.
struct Fixed(&'static str);

#[async_trait]
impl GenerationClient for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _: &GenerationRequest) -> GenerationResult<String> {
        Ok(self.0.to_string())
    }
}

fn gemini(server: &ServerGuard) -> Arc<dyn GenerationClient> {
    Arc::new(GeminiClient::new(GeminiConfig::default().with_base_url(server.url())).unwrap())
}

#[tokio::test]
async fn echo_stub_fills_response_and_reviews() {
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(Arc::new(EchoGenerator::new()));
    let id = session.insert_block(&mut editor).unwrap();

    session.submit(id, "Hello").unwrap();
    session.settle(&mut editor).await.unwrap();

    let attrs = from_attrs(&editor.node(id).unwrap().attrs);
    assert_eq!(
        attrs.response,
        "This is not calling any API for now. You wrote: Hello"
    );
    assert_eq!(attrs.prompt, "Hello");

    let view = session.view(id).unwrap();
    assert!(matches!(view.body, ViewBody::Review { .. }));
    assert!(view.is_enabled(Action::Insert));
    assert!(view.is_enabled(Action::Edit));
    assert!(view.is_enabled(Action::Discard));
}

#[tokio::test]
async fn service_error_message_is_shown_verbatim() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error":{"code":400,"message":"invalid api key","status":"INVALID_ARGUMENT"}}"#)
        .create_async()
        .await;

    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(gemini(&server));
    let id = session.insert_block(&mut editor).unwrap();
    session.set_credential(id, "bad-key").unwrap();

    session.submit(id, "Hello").unwrap();
    let done = session.settle(&mut editor).await.unwrap();
    mock.assert_async().await;

    assert_eq!(done, vec![(id, Completion::Failed)]);
    let block = session.controller(id).unwrap();
    assert_eq!(block.phase(), Phase::Editing);
    assert_eq!(block.prompt_draft(), "Hello");
    let view = session.view(id).unwrap();
    assert_eq!(
        view.error.as_deref(),
        Some("Error generating response: invalid api key")
    );
    assert_eq!(editor.attribute_writes(), 0);
}

#[tokio::test]
async fn success_without_candidates_is_an_empty_result() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create_async()
        .await;

    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(gemini(&server));
    let id = session.insert_block(&mut editor).unwrap();

    session.submit(id, "Hello").unwrap();
    session.settle(&mut editor).await.unwrap();

    assert_eq!(
        session.controller(id).unwrap().error_message(),
        Some("Error generating response: No text generated")
    );
}

#[tokio::test]
async fn unreachable_service_keeps_credential_out_of_the_message() {
    let client: Arc<dyn GenerationClient> = Arc::new(
        GeminiClient::new(GeminiConfig::default().with_base_url("http://127.0.0.1:1")).unwrap(),
    );
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(client);
    let id = session.insert_block(&mut editor).unwrap();
    session.set_credential(id, "SUPER-SECRET-KEY").unwrap();

    session.submit(id, "Hello").unwrap();
    session.settle(&mut editor).await.unwrap();

    let view = session.view(id).unwrap();
    let error = view.error.clone().unwrap();
    assert!(error.starts_with("Error generating response: request failed"));
    assert!(!error.contains("SUPER-SECRET-KEY"));
    assert!(!view.to_string().contains("SUPER-SECRET-KEY"));
}

#[tokio::test]
async fn credential_is_sent_as_query_key_and_persisted() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_query(Matcher::UrlEncoded("key".into(), "k-123".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hi"}]}}]}"#)
        .create_async()
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let mut session = BlockSession::new(gemini(&server), store.clone(), SessionConfig::default());
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let first = session.insert_block(&mut editor).unwrap();
    session.set_credential(first, "k-123").unwrap();
    session.submit(first, "Hello").unwrap();
    session.settle(&mut editor).await.unwrap();
    mock.assert_async().await;

    assert_eq!(store.get(CREDENTIAL_KEY).unwrap().as_deref(), Some("k-123"));

    // A block created later in the same session starts with the key.
    let second = session.insert_block(&mut editor).unwrap();
    assert_eq!(session.controller(second).unwrap().credential(), "k-123");
    assert!(matches!(
        session.view(second).unwrap().body,
        ViewBody::Prompt {
            credential_set: true,
            ..
        }
    ));
}

#[tokio::test]
async fn toolbar_captures_selected_text() {
    let mut editor = editor_with("foo bar baz");
    editor.select_range(1, 8).unwrap();
    let mut session = session_with(Arc::new(EchoGenerator::new()));

    let id = session.insert_block(&mut editor).unwrap();

    let attrs = from_attrs(&editor.node(id).unwrap().attrs);
    assert_eq!(attrs.selected_text, "foo bar");
    let view = session.view(id).unwrap();
    assert_eq!(view.selected_text.as_deref(), Some("foo bar"));
    assert!(view.to_string().contains("│ selected: foo bar"));
}

#[tokio::test]
async fn insert_renders_markdown_into_the_document() {
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(Arc::new(Fixed("**bold**")));
    let id = session.insert_block(&mut editor).unwrap();
    session.submit(id, "Make it bold").unwrap();
    session.settle(&mut editor).await.unwrap();

    assert!(session.insert(id, &mut editor).unwrap());

    assert!(editor.find_nodes(AI_BLOCK).is_empty());
    let blocks = editor.blocks();
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].plain_text(), "intro");
    assert_eq!(blocks[1].kind, starter::PARAGRAPH);
    assert_eq!(blocks[1].content.len(), 1);
    assert!(blocks[1].content[0].has_mark(starter::BOLD));
    assert_eq!(blocks[1].plain_text(), "bold");
    assert!(session.controller(id).is_none());
}

#[tokio::test]
async fn restored_block_keeps_its_attributes() {
    let mut editor = MemoryEditor::from_json(
        Arc::new(block_schema()),
        serde_json::json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "intro"}]},
                {"type": "aiBlock", "attrs": {"prompt": "p", "response": "r", "selectedText": "s"}}
            ]
        }),
    )
    .unwrap();
    let mut session = session_with(Arc::new(EchoGenerator::new()));
    assert_eq!(session.attach_existing(&editor).unwrap(), 1);
    let id = session.block_ids()[0];

    let block = session.controller(id).unwrap();
    assert_eq!(block.phase(), Phase::Editing);
    assert_eq!(block.prompt_draft(), "p");
    assert_eq!(block.response_draft(), "r");
    assert_eq!(block.selected_text(), "s");

    session.discard(id, &mut editor).unwrap();
    assert_eq!(editor.blocks().len(), 1);
}

#[tokio::test]
async fn discard_from_review_deletes_without_attribute_writes() {
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(Arc::new(EchoGenerator::new()));
    let id = session.insert_block(&mut editor).unwrap();
    session.submit(id, "Hello").unwrap();
    session.settle(&mut editor).await.unwrap();
    editor.clear_log();

    session.discard(id, &mut editor).unwrap();

    assert!(editor.node(id).is_none());
    assert_eq!(editor.attribute_writes(), 0);
    assert!(matches!(
        editor.command_log(),
        [CommandRecord::SelectNode(_), CommandRecord::DeleteNode { .. }]
    ));
}

#[tokio::test]
async fn blocks_generate_independently() {
    let mut editor = editor_with("intro");
    editor.set_text_selection(7).unwrap();
    let mut session = session_with(Arc::new(EchoGenerator::new()));
    let a = session.insert_block(&mut editor).unwrap();
    let b = session.insert_block(&mut editor).unwrap();

    session.submit(a, "one").unwrap();
    session.submit(b, "two").unwrap();
    assert_eq!(session.in_flight(), 2);
    let mut done = session.settle(&mut editor).await.unwrap();
    done.sort_by_key(|(id, _)| *id);

    let mut expected = vec![(a, Completion::Applied), (b, Completion::Applied)];
    expected.sort_by_key(|(id, _)| *id);
    assert_eq!(done, expected);
    assert_eq!(
        from_attrs(&editor.node(b).unwrap().attrs).response,
        EchoGenerator::reply("two")
    );
}
