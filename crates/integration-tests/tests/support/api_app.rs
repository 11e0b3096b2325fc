#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use api_server::http::{AppState, build_router};
use shared::config::ChatSettings;
use shared::conversation::{ChatOrchestrator, InMemorySessionStore, SessionStore, Turn};
use shared::llm::{
    LlmGateway, LlmGatewayError, LlmGatewayFuture, LlmGatewayRequest, LlmGatewayResponse,
    ToolDispatcher,
};

pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, LlmGatewayError>>>,
    requests: Mutex<Vec<LlmGatewayRequest>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<String, LlmGatewayError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn texts(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|text| Ok(text.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<LlmGatewayRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl LlmGateway for ScriptedGateway {
    fn generate<'a>(&'a self, request: LlmGatewayRequest) -> LlmGatewayFuture<'a> {
        let model = request.model.clone();
        self.requests.lock().expect("requests lock").push(request);
        let next = self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmGatewayError::ProviderFailure("script exhausted".into())));

        Box::pin(async move {
            next.map(|text| LlmGatewayResponse {
                model,
                provider_request_id: None,
                text,
                usage: None,
            })
        })
    }
}

pub struct TestApp {
    pub router: axum::Router,
    pub store: Arc<InMemorySessionStore>,
}

impl TestApp {
    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.store
            .get_history(session_id)
            .await
            .expect("history should load")
    }
}

pub fn build_test_app(gateway: Arc<ScriptedGateway>, settings: ChatSettings) -> TestApp {
    let store = Arc::new(InMemorySessionStore::new());
    let orchestrator = ChatOrchestrator::new(gateway, store.clone(), settings);

    let router = build_router(AppState {
        orchestrator: Arc::new(orchestrator),
        dispatcher: ToolDispatcher::local(),
        moderation_enabled: true,
    });

    TestApp { router, store }
}

pub fn default_test_app(gateway: Arc<ScriptedGateway>) -> TestApp {
    build_test_app(gateway, ChatSettings::default())
}
