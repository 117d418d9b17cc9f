use std::sync::Arc;

use mastery_core::{
    EngineError, ProgressEngine, ProgressRecord, StudyStats, export_json, import_json,
    now_unix_secs, unix_to_iso8601,
};
use mastery_store::DeckStore;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct MasteryServer {
    state: Arc<Mutex<ServerState>>,
    tool_router: ToolRouter<Self>,
}

struct ServerState {
    engine: ProgressEngine,
    deck: DeckStore,
}

impl MasteryServer {
    pub fn new(deck: DeckStore) -> std::result::Result<Self, String> {
        let engine = deck
            .load_engine()
            .map_err(|e| format!("failed to load deck '{}': {e}", deck.deck_id()))?;
        Ok(Self {
            state: Arc::new(Mutex::new(ServerState { engine, deck })),
            tool_router: Self::tool_router(),
        })
    }

    /// Flush the WAL before the runtime goes away; `Store::drop` may not run
    /// if the process is torn down mid-shutdown.
    pub async fn checkpoint_wal(&self) {
        let state = self.state.lock().await;
        if let Err(e) = state.deck.store().checkpoint_truncate() {
            tracing::warn!("WAL checkpoint failed: {e}");
        }
    }

    fn record_json(item_id: &str, record: Option<&ProgressRecord>) -> serde_json::Value {
        match record {
            Some(r) => serde_json::json!({
                "item": item_id,
                "tracked": true,
                "tier": r.tier,
                "errorCount": r.error_count,
                "correctStreak": r.correct_streak,
                "difficulty": r.difficulty,
                "nextReviewAt": r.next_review_at.map(unix_to_iso8601),
                "lastSeenAt": r.last_seen_at.map(unix_to_iso8601),
            }),
            None => serde_json::json!({
                "item": item_id,
                "tracked": false,
                "tier": mastery_core::Tier::New,
            }),
        }
    }
}

/// Engine rejections are caller mistakes, not server faults.
fn engine_error(e: EngineError) -> McpError {
    McpError::invalid_params(e.to_string(), None)
}

fn json_result(value: &serde_json::Value) -> CallToolResult {
    CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(value).unwrap_or_default(),
    )])
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct RecordRequest {
    /// Item identifier, e.g. "verbs_たべます"
    item_id: String,
    /// Whether the learner recalled the item correctly
    correct: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ItemRequest {
    /// Item identifier
    item_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DueRequest {
    /// Unix seconds to evaluate due-ness at. Defaults to now.
    at: Option<u64>,
    /// Maximum number of items to return
    limit: Option<usize>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ImportRequest {
    /// Full deck export JSON to import
    state: serde_json::Value,
}

#[tool_router]
impl MasteryServer {
    #[tool(
        description = "Record one recall outcome for an item. Unknown items are registered as new. Updates the item's tier (new, learning, mastered), difficulty and next review time, and returns them along with any tier transition."
    )]
    async fn mastery_record(
        &self,
        Parameters(req): Parameters<RecordRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let ServerState { engine, deck } = &mut *state;

        let transition = engine
            .record_outcome(&req.item_id, req.correct)
            .map_err(engine_error)?;

        if let Err(e) = deck.store().save_record(engine, &req.item_id) {
            tracing::error!("failed to persist outcome for {}: {e}", req.item_id);
        }

        let mut result = Self::record_json(&req.item_id, engine.record(&req.item_id));
        result["transition"] = match transition {
            Some(t) => serde_json::json!({ "from": t.from, "to": t.to }),
            None => serde_json::Value::Null,
        };
        Ok(json_result(&result))
    }

    #[tool(description = "Get an item's mastery tier. Items never recorded are \"new\".")]
    async fn mastery_tier(
        &self,
        Parameters(req): Parameters<ItemRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let result = serde_json::json!({
            "item": req.item_id,
            "tier": state.engine.get_tier(&req.item_id),
        });
        Ok(json_result(&result))
    }

    #[tool(
        description = "Inspect an item's full progress record: tier, error count, correct streak, difficulty, next review and last seen times."
    )]
    async fn mastery_item(
        &self,
        Parameters(req): Parameters<ItemRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let result = Self::record_json(&req.item_id, state.engine.record(&req.item_id));
        Ok(json_result(&result))
    }

    #[tool(
        description = "List items due for review, highest priority first. Hard items and items with more errors come first."
    )]
    async fn mastery_due(
        &self,
        Parameters(req): Parameters<DueRequest>,
    ) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let now = req.at.unwrap_or_else(now_unix_secs);

        let mut queue = state.engine.review_queue(now);
        let total = queue.len();
        if let Some(limit) = req.limit {
            queue.truncate(limit);
        }

        let result = serde_json::json!({
            "at": unix_to_iso8601(now),
            "total": total,
            "items": queue,
        });
        Ok(json_result(&result))
    }

    #[tool(
        description = "Deck progress: counts per tier, overall progress percent, per-category breakdown and study session statistics."
    )]
    async fn mastery_summary(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let sessions = state.deck.store().load_sessions().unwrap_or_else(|e| {
            tracing::error!("failed to load study sessions: {e}");
            Vec::new()
        });
        let study = StudyStats::compute(&sessions, state.engine.longest_streak());

        let result = serde_json::json!({
            "deck": state.deck.deck_id(),
            "summary": state.engine.summary(),
            "categories": state.engine.category_summary(),
            "study": study,
        });
        Ok(json_result(&result))
    }

    #[tool(description = "Export the deck's progress as versioned JSON.")]
    async fn mastery_export(&self) -> Result<CallToolResult, McpError> {
        let state = self.state.lock().await;
        let json = export_json(&state.engine)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }

    #[tool(description = "Import deck progress from exported JSON. Replaces current progress.")]
    async fn mastery_import(
        &self,
        Parameters(req): Parameters<ImportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut state = self.state.lock().await;
        let json_str = serde_json::to_string(&req.state)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        state.engine = import_json(&json_str).map_err(engine_error)?;

        if let Err(e) = state.deck.save_engine(&state.engine) {
            tracing::error!("failed to persist after import: {e}");
        }

        let result = serde_json::json!({
            "imported": true,
            "summary": state.engine.summary(),
        });
        Ok(json_result(&result))
    }
}

#[tool_handler]
impl ServerHandler for MasteryServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Spaced-repetition progress tracking for one deck of study items.\n\n\
                 Items move through three tiers: new, learning, mastered. Two correct answers in a row \
                 promote new to learning, five promote learning to mastered. Three cumulative errors \
                 demote mastered to learning, five demote learning to new.\n\n\
                 WORKFLOW:\n\
                 1. Call mastery_due to get the items to quiz, highest priority first.\n\
                 2. After each answer, call mastery_record with the item id and whether it was correct.\n\
                 3. Use mastery_summary to report progress.\n\n\
                 Item ids of the form <category>_<word> (e.g. verbs_たべます) are grouped by category."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
