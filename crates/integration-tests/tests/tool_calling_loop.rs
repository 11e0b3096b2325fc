mod support;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::post;
use serde_json::{Value, json};
use shared::llm::{
    DispatchError, DispatchedCall, HttpCapabilityHost, OpenAiChatCompletionsBackend,
    ToolCallingLoop, ToolDispatcher, ToolLoopError,
};

use support::LocalServer;
use support::api_app::{ScriptedGateway, default_test_app};
use support::mock_openai::{MockOpenAi, text_reply, tool_call_reply};

async fn capability_server() -> LocalServer {
    LocalServer::start(default_test_app(ScriptedGateway::texts(&[])).router).await
}

fn http_dispatcher(server: &LocalServer, timeout: Duration) -> ToolDispatcher {
    let host = HttpCapabilityHost::new(&server.base_url, timeout).expect("host should build");
    ToolDispatcher::new(Arc::new(host))
}

fn tool_loop(openai: &MockOpenAi, dispatcher: ToolDispatcher) -> ToolCallingLoop {
    let backend = OpenAiChatCompletionsBackend::new(openai.config(), "gpt-4o")
        .expect("backend should build");
    ToolCallingLoop::new(Arc::new(backend), dispatcher, 3)
}

#[tokio::test]
async fn loop_dispatches_calls_through_the_capability_server() {
    let server = capability_server().await;
    let openai = MockOpenAi::start().await;
    openai
        .state
        .queue_chat_reply(tool_call_reply(&[
            ("call_1", "get_esim_options", json!({ "country": "Japan", "device": "Pixel 8" })),
            ("call_2", "get_safety_info", json!({ "country": "Japan" })),
        ]))
        .await;
    openai
        .state
        .queue_chat_reply(text_reply("Take the Asia plan and dial 110 for police."))
        .await;

    let outcome = tool_loop(&openai, http_dispatcher(&server, Duration::from_secs(5)))
        .run("I'm going to Japan with a Pixel 8")
        .await
        .expect("tool loop should finish");

    assert_eq!(outcome.reply, "Take the Asia plan and dial 110 for police.");
    assert_eq!(
        outcome.dispatched,
        vec![
            DispatchedCall { name: "get_esim_options".into(), outcome: "ok" },
            DispatchedCall { name: "get_safety_info".into(), outcome: "ok" },
        ]
    );

    let requests = openai.state.chat_requests.lock().await.clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["tools"].as_array().map(Vec::len), Some(5));
    assert_eq!(requests[0]["tool_choice"], "auto");

    let follow_up = requests[1]["messages"]
        .as_array()
        .expect("messages should be a list");
    let tool_messages = follow_up
        .iter()
        .filter(|message| message["role"] == "tool")
        .collect::<Vec<_>>();
    assert_eq!(tool_messages.len(), 2);
    assert_eq!(tool_messages[0]["tool_call_id"], "call_1");

    let esim: Value = serde_json::from_str(
        tool_messages[0]["content"]
            .as_str()
            .expect("tool content should be a string"),
    )
    .expect("tool content should be JSON");
    assert_eq!(esim["region"], "Asia");
}

#[tokio::test]
async fn failing_calls_are_reported_back_to_the_model() {
    let server = capability_server().await;
    let openai = MockOpenAi::start().await;
    openai
        .state
        .queue_chat_reply(tool_call_reply(&[
            ("call_1", "plan_trip", json!({ "destination": "Oslo", "days": 0, "interests": [] })),
            ("call_2", "book_hotel", json!({})),
        ]))
        .await;
    openai.state.queue_chat_reply(text_reply("I need a valid trip length.")).await;

    let outcome = tool_loop(&openai, http_dispatcher(&server, Duration::from_secs(5)))
        .run("Plan Oslo")
        .await
        .expect("tool loop should finish");

    assert_eq!(
        outcome.dispatched,
        vec![
            DispatchedCall { name: "plan_trip".into(), outcome: "invalid_request" },
            DispatchedCall { name: "book_hotel".into(), outcome: "unknown_capability" },
        ]
    );

    let requests = openai.state.chat_requests.lock().await.clone();
    let tool_output = requests[1]["messages"]
        .as_array()
        .and_then(|messages| messages.iter().find(|message| message["tool_call_id"] == "call_1"))
        .and_then(|message| message["content"].as_str())
        .expect("validation failure should be sent back");
    let tool_output: Value = serde_json::from_str(tool_output).expect("tool output should be JSON");
    assert_eq!(tool_output["error"]["code"], "invalid_request");
    assert_eq!(tool_output["error"]["field"], "days");
}

#[tokio::test]
async fn http_host_maps_validation_and_unknown_capabilities() {
    let server = capability_server().await;
    let dispatcher = http_dispatcher(&server, Duration::from_secs(5));

    let err = dispatcher
        .dispatch("get_translation", r#"{"phrase":"","target_language":"German"}"#)
        .await
        .expect_err("blank phrase must fail");
    match err {
        DispatchError::Validation { field, .. } => assert_eq!(field, "phrase"),
        other => panic!("unexpected error: {other:?}"),
    }

    let events = dispatcher
        .dispatch("get_local_events", r#"{"city":"Seoul"}"#)
        .await
        .expect("events should dispatch");
    assert_eq!(events["city"], "Seoul");
}

#[tokio::test]
async fn slow_capability_host_times_out() {
    let app = Router::new().route(
        "/get_local_events",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "{}"
        }),
    );
    let server = LocalServer::start(app).await;
    let dispatcher = http_dispatcher(&server, Duration::from_millis(50));

    let err = dispatcher
        .dispatch("get_local_events", r#"{"city":"Seoul"}"#)
        .await
        .expect_err("slow host must time out");
    assert!(matches!(err, DispatchError::BackendTimeout));
}

#[tokio::test]
async fn loop_stops_after_round_limit() {
    let openai = MockOpenAi::start().await;
    for index in 0..4 {
        let call_id = format!("call_{index}");
        openai
            .state
            .queue_chat_reply(tool_call_reply(&[(
                call_id.as_str(),
                "get_local_events",
                json!({ "city": "Lima" }),
            )]))
            .await;
    }

    let err = tool_loop(&openai, ToolDispatcher::local())
        .run("Anything on in Lima?")
        .await
        .expect_err("loop must stop");

    assert!(matches!(err, ToolLoopError::TooManyRounds(3)));
    assert_eq!(openai.state.chat_requests.lock().await.len(), 4);
}
