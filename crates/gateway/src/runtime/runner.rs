//! Agent turn execution — the LLM ↔ tool loop.
//!
//! One turn: submit the thread with the role's tool schema, dispatch
//! any tool calls sequentially (each sees the previous mutations),
//! append the JSON results, and repeat until the model produces plain
//! assistant text or a limit trips.

use serde_json::Value;

use sufra_domain::session::Session;
use sufra_domain::tool::{ChatMessage, ToolDefinition};
use sufra_providers::{ChatRequest, LlmProvider};

use super::roles::AgentRole;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatcher seam
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome of dispatching one tool call.
#[derive(Debug, Clone)]
pub enum ToolOutcome {
    /// The tool ran and produced a JSON result. `is_error` marks
    /// `{success:false}`-shaped results so the loop can abort on
    /// repeated failure.
    Result { json: Value, is_error: bool },
    /// The LLM named a tool that does not exist.
    UnknownTool,
    /// Arguments did not deserialize against the tool's schema.
    BadArguments,
}

/// Dispatches tool calls against session state and the stores.
#[async_trait::async_trait]
pub trait ToolDispatcher: Send + Sync {
    async fn dispatch(&self, name: &str, args: &Value, session: &mut Session) -> ToolOutcome;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Turn result
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A record of one executed tool call, kept for reconciliation.
#[derive(Debug, Clone)]
pub struct ToolTrace {
    pub call_id: String,
    pub tool_name: String,
    pub result: Value,
    pub is_error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStatus {
    /// The model produced a final assistant message.
    Completed,
    /// The recursion limit tripped before a final message.
    RecursionLimit,
    /// The LLM call failed twice (one retry included).
    LlmFailure,
    /// Unknown tool name or unparseable arguments.
    ProgrammerError,
    /// The same tool failed on two consecutive invocations.
    ToolLoopAborted,
}

#[derive(Debug)]
pub struct AgentTurn {
    pub status: TurnStatus,
    /// Raw assistant text (handoff markers still present).
    pub text: String,
    /// Every executed tool call in order.
    pub trace: Vec<ToolTrace>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// The loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run one agent turn over a prepared thread.
pub async fn run_agent_turn(
    provider: &dyn LlmProvider,
    role: AgentRole,
    tool_defs: Vec<ToolDefinition>,
    mut thread: Vec<ChatMessage>,
    dispatcher: &dyn ToolDispatcher,
    session: &mut Session,
) -> AgentTurn {
    let mut trace: Vec<ToolTrace> = Vec::new();
    // (tool name, consecutive failures) for the abort rule.
    let mut last_failure: Option<(String, u32)> = None;
    // Per-tool invocation counts for roles that cap them.
    let mut call_counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for loop_idx in 0..role.recursion_limit() {
        tracing::debug!(agent = role.name(), loop_idx, "tool loop iteration");

        let req = ChatRequest {
            messages: thread.clone(),
            tools: tool_defs.clone(),
            temperature: Some(role.temperature()),
            max_tokens: Some(2000),
            json_mode: false,
        };

        // One retry on transient LLM failure.
        let response = match provider.chat(&req).await {
            Ok(r) => r,
            Err(first) => {
                tracing::warn!(agent = role.name(), error = %first, "LLM call failed, retrying once");
                match provider.chat(&req).await {
                    Ok(r) => r,
                    Err(second) => {
                        tracing::error!(agent = role.name(), error = %second, "LLM retry failed");
                        return AgentTurn {
                            status: TurnStatus::LlmFailure,
                            text: String::new(),
                            trace,
                        };
                    }
                }
            }
        };

        // No tool calls: this is the final assistant message.
        if response.tool_calls.is_empty() {
            return AgentTurn {
                status: TurnStatus::Completed,
                text: response.content,
                trace,
            };
        }

        thread.push(ChatMessage::assistant_with_tools(
            response.content.clone(),
            response.tool_calls.clone(),
        ));

        // Dispatch sequentially in listed order.
        for call in &response.tool_calls {
            if let Some(cap) = role.max_calls_per_tool() {
                let count = call_counts.entry(call.tool_name.clone()).or_insert(0);
                *count += 1;
                if *count > cap {
                    let json = serde_json::json!({
                        "success": false,
                        "error_ar": "استخدمت هذه الأداة من قبل في نفس الرد، كمّل بدونها",
                    });
                    thread.push(ChatMessage::tool_result(&call.call_id, json.to_string()));
                    trace.push(ToolTrace {
                        call_id: call.call_id.clone(),
                        tool_name: call.tool_name.clone(),
                        result: json,
                        is_error: true,
                    });
                    continue;
                }
            }

            let outcome = dispatcher
                .dispatch(&call.tool_name, &call.arguments, session)
                .await;

            let (json, is_error) = match outcome {
                ToolOutcome::Result { json, is_error } => (json, is_error),
                ToolOutcome::UnknownTool => {
                    tracing::error!(tool = %call.tool_name, "LLM invoked unknown tool");
                    return AgentTurn {
                        status: TurnStatus::ProgrammerError,
                        text: String::new(),
                        trace,
                    };
                }
                ToolOutcome::BadArguments => {
                    tracing::error!(
                        tool = %call.tool_name,
                        args = %call.arguments,
                        "tool arguments failed to deserialize"
                    );
                    return AgentTurn {
                        status: TurnStatus::ProgrammerError,
                        text: String::new(),
                        trace,
                    };
                }
            };

            tracing::debug!(
                tool = %call.tool_name,
                is_error,
                "tool dispatched"
            );

            // Abort after the same tool fails twice in a row.
            if is_error {
                let aborting = match &mut last_failure {
                    Some((name, count)) if *name == call.tool_name => {
                        *count += 1;
                        *count >= 2
                    }
                    _ => {
                        last_failure = Some((call.tool_name.clone(), 1));
                        false
                    }
                };
                if aborting {
                    tracing::warn!(
                        tool = %call.tool_name,
                        "tool failed twice consecutively, aborting turn"
                    );
                    trace.push(ToolTrace {
                        call_id: call.call_id.clone(),
                        tool_name: call.tool_name.clone(),
                        result: json,
                        is_error: true,
                    });
                    return AgentTurn {
                        status: TurnStatus::ToolLoopAborted,
                        text: String::new(),
                        trace,
                    };
                }
            } else {
                last_failure = None;
            }

            thread.push(ChatMessage::tool_result(&call.call_id, json.to_string()));
            trace.push(ToolTrace {
                call_id: call.call_id.clone(),
                tool_name: call.tool_name.clone(),
                result: json,
                is_error,
            });
        }
    }

    tracing::warn!(
        agent = role.name(),
        limit = role.recursion_limit(),
        "recursion limit reached"
    );
    AgentTurn {
        status: TurnStatus::RecursionLimit,
        text: String::new(),
        trace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use sufra_domain::error::{Error, Result};
    use sufra_domain::tool::ToolCall;
    use sufra_providers::ChatResponse;

    /// Provider scripted with a queue of responses (or failures).
    struct ScriptedProvider {
        script: Mutex<Vec<Result<ChatResponse>>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<ChatResponse>>) -> Self {
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            let mut script = self.script.lock();
            if script.is_empty() {
                return Err(Error::Other("script exhausted".into()));
            }
            script.remove(0)
        }

        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    fn text_response(text: &str) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: text.into(),
            tool_calls: vec![],
            usage: None,
            model: "test".into(),
        })
    }

    fn tool_response(calls: Vec<(&str, &str)>) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: String::new(),
            tool_calls: calls
                .into_iter()
                .map(|(id, name)| ToolCall {
                    call_id: id.into(),
                    tool_name: name.into(),
                    arguments: serde_json::json!({}),
                })
                .collect(),
            usage: None,
            model: "test".into(),
        })
    }

    /// Dispatcher that returns a fixed outcome per tool name.
    struct StubDispatcher {
        fail_tools: Vec<&'static str>,
        unknown_tools: Vec<&'static str>,
    }

    #[async_trait::async_trait]
    impl ToolDispatcher for StubDispatcher {
        async fn dispatch(
            &self,
            name: &str,
            _args: &Value,
            _session: &mut Session,
        ) -> ToolOutcome {
            if self.unknown_tools.contains(&name) {
                return ToolOutcome::UnknownTool;
            }
            let is_error = self.fail_tools.contains(&name);
            ToolOutcome::Result {
                json: serde_json::json!({"success": !is_error}),
                is_error,
            }
        }
    }

    fn ok_dispatcher() -> StubDispatcher {
        StubDispatcher {
            fail_tools: vec![],
            unknown_tools: vec![],
        }
    }

    fn session() -> Session {
        Session::new("s1", 2)
    }

    #[tokio::test]
    async fn plain_text_completes_immediately() {
        let provider = ScriptedProvider::new(vec![text_response("هلا!")]);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Greeting,
            vec![],
            vec![ChatMessage::user("السلام عليكم")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::Completed);
        assert_eq!(turn.text, "هلا!");
        assert!(turn.trace.is_empty());
    }

    #[tokio::test]
    async fn tool_loop_then_final_text() {
        let provider = ScriptedProvider::new(vec![
            tool_response(vec![("c1", "search_menu")]),
            text_response("لقيت برجر [HANDOFF:checkout]"),
        ]);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Order,
            vec![],
            vec![ChatMessage::user("أبي برجر")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::Completed);
        assert_eq!(turn.trace.len(), 1);
        assert_eq!(turn.trace[0].tool_name, "search_menu");
    }

    #[tokio::test]
    async fn llm_failure_retries_once_then_gives_up() {
        let provider = ScriptedProvider::new(vec![
            Err(Error::Timeout("t1".into())),
            Err(Error::Timeout("t2".into())),
        ]);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Greeting,
            vec![],
            vec![ChatMessage::user("هلا")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::LlmFailure);
    }

    #[tokio::test]
    async fn llm_failure_recovers_on_retry() {
        let provider = ScriptedProvider::new(vec![
            Err(Error::Timeout("t1".into())),
            text_response("أهلاً"),
        ]);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Greeting,
            vec![],
            vec![ChatMessage::user("هلا")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::Completed);
        assert_eq!(turn.text, "أهلاً");
    }

    #[tokio::test]
    async fn recursion_limit_trips() {
        // The model keeps calling tools forever.
        let script: Vec<_> = (0..10)
            .map(|i| tool_response(vec![(Box::leak(format!("c{i}").into_boxed_str()), "search_menu")]))
            .collect();
        let provider = ScriptedProvider::new(script);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Order,
            vec![],
            vec![ChatMessage::user("أبي كل شي")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::RecursionLimit);
        assert_eq!(turn.trace.len(), AgentRole::Order.recursion_limit());
    }

    #[tokio::test]
    async fn same_tool_failing_twice_aborts() {
        let provider = ScriptedProvider::new(vec![
            tool_response(vec![("c1", "add_to_order")]),
            tool_response(vec![("c2", "add_to_order")]),
            text_response("unreachable"),
        ]);
        let dispatcher = StubDispatcher {
            fail_tools: vec!["add_to_order"],
            unknown_tools: vec![],
        };
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Order,
            vec![],
            vec![ChatMessage::user("أبي برجر")],
            &dispatcher,
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::ToolLoopAborted);
        assert_eq!(turn.trace.len(), 2);
    }

    #[tokio::test]
    async fn single_failure_lets_model_recover() {
        let provider = ScriptedProvider::new(vec![
            tool_response(vec![("c1", "add_to_order")]),
            text_response("للأسف الصنف غير متوفر، تبي شي ثاني؟"),
        ]);
        let dispatcher = StubDispatcher {
            fail_tools: vec!["add_to_order"],
            unknown_tools: vec![],
        };
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Order,
            vec![],
            vec![ChatMessage::user("أبي برجر")],
            &dispatcher,
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_tool_is_programmer_error() {
        let provider = ScriptedProvider::new(vec![tool_response(vec![("c1", "launch_rocket")])]);
        let dispatcher = StubDispatcher {
            fail_tools: vec![],
            unknown_tools: vec!["launch_rocket"],
        };
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Order,
            vec![],
            vec![ChatMessage::user("؟")],
            &dispatcher,
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::ProgrammerError);
    }

    #[tokio::test]
    async fn checkout_tool_capped_at_one_call() {
        let provider = ScriptedProvider::new(vec![
            tool_response(vec![("c1", "calculate_total")]),
            tool_response(vec![("c2", "calculate_total")]),
            text_response("المجموع 50 ريال"),
        ]);
        let mut s = session();
        let turn = run_agent_turn(
            &provider,
            AgentRole::Checkout,
            vec![],
            vec![ChatMessage::user("كم المجموع؟")],
            &ok_dispatcher(),
            &mut s,
        )
        .await;
        assert_eq!(turn.status, TurnStatus::Completed);
        // Second invocation was rejected with an error result, not executed.
        assert_eq!(turn.trace.len(), 2);
        assert!(!turn.trace[0].is_error);
        assert!(turn.trace[1].is_error);
    }
}
