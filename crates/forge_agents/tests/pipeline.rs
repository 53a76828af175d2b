//! End-to-end pipeline runs against a scripted model.

use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use forge_agents::{design, AgentError, CoderConfig, FailurePolicy, Forge};
use forge_core::{CoreError, PipelineState, PipelineStatus, RunReport, StageId, StepStatus};
use forge_llm::{ChatResponse, MockLlm, Role, ToolCall};
use forge_tools::{ProjectRoot, ToolBox};

fn todo_plan() -> Value {
    json!({
        "name": "Colourful Todo",
        "description": "A colourful todo app",
        "techstack": "html, css, javascript",
        "features": ["add tasks", "complete tasks"],
        "files": [
            {"path": "index.html", "purpose": "page markup"},
            {"path": "style.css", "purpose": "colourful styles"},
            {"path": "script.js", "purpose": "todo behaviour"}
        ]
    })
}

fn steps(steps: &[(&str, &str)]) -> Value {
    let steps: Vec<Value> = steps
        .iter()
        .map(|(path, task)| json!({"filepath": path, "task_description": task}))
        .collect();
    json!({ "implementation_steps": steps })
}

fn write_call(path: &str, content: &str) -> ChatResponse {
    ChatResponse::tool_calls(vec![ToolCall::new(
        format!("call_{}", path),
        "write_file",
        json!({"path": path, "content": content}),
    )])
}

fn workspace() -> (TempDir, ToolBox) {
    let temp = TempDir::new().unwrap();
    let root = ProjectRoot::init(temp.path().join("generated_project")).unwrap();
    (temp, ToolBox::new(root))
}

/// User instructions sent to the coder sub-agent, one per coding attempt.
fn coder_instructions(llm: &MockLlm) -> Vec<String> {
    llm.get_method_calls("chat")
        .into_iter()
        .filter(|c| c.messages.len() == 2)
        .filter_map(|c| {
            c.messages
                .iter()
                .find(|m| m.role == Role::User)
                .map(|m| m.content_str().to_string())
        })
        .collect()
}

#[tokio::test]
async fn test_todo_app_three_steps() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[
            ("index.html", "Create the page with a task list"),
            ("style.css", "Style the list with bright colours"),
            ("script.js", "Add and complete tasks"),
        ])))
        .add_chat(write_call("index.html", "<ul id=\"tasks\"></ul>"))
        .add_chat(ChatResponse::text("index.html written"))
        .add_chat(write_call("style.css", "ul { color: tomato; }"))
        .add_chat(ChatResponse::text("style.css written"))
        .add_chat(write_call("script.js", "const list = document.getElementById('tasks');"))
        .add_chat(ChatResponse::text("script.js written"));

    let forge = Forge::new(Arc::new(llm.clone()), tools.clone());
    let state = forge.run("Create a colourful todo app", 100).await.unwrap();

    assert_eq!(state.status, PipelineStatus::Done);
    // planner + architect + one coder invocation per step
    assert_eq!(state.invocations, 5);

    let coder = state.coder_state.as_ref().unwrap();
    assert_eq!(coder.current_step_idx, 3);
    assert!(coder.is_done());

    let written: Vec<_> = state.outcomes().iter().map(|o| o.filepath.as_str()).collect();
    assert_eq!(written, vec!["index.html", "style.css", "script.js"]);
    assert!(state.outcomes().iter().all(|o| o.status == StepStatus::Written));

    let journal: Vec<_> = tools.journal().into_iter().map(|w| w.path).collect();
    assert_eq!(journal, vec!["index.html", "style.css", "script.js"]);

    let root = tools.root().path();
    assert_eq!(
        fs::read_to_string(root.join("style.css")).unwrap(),
        "ul { color: tomato; }"
    );

    let task_plan = state.task_plan.as_ref().unwrap();
    assert!(Arc::ptr_eq(&task_plan.plan, state.plan.as_ref().unwrap()));
}

#[tokio::test]
async fn test_zero_steps_finishes_without_touching_files() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[])));

    let forge = Forge::new(Arc::new(llm.clone()), tools.clone());
    let state = forge.run("Nothing to build", 100).await.unwrap();

    assert_eq!(state.status, PipelineStatus::Done);
    assert_eq!(state.invocations, 3);
    assert!(state.outcomes().is_empty());
    assert!(!llm.was_called("chat"));
    assert_eq!(tools.call_count(), 0);
}

#[tokio::test]
async fn test_planning_failure_stops_before_architect() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new().add_structured(None);

    let forge = Forge::new(Arc::new(llm.clone()), tools.clone());
    let err = forge.run("Make me something", 100).await.unwrap_err();

    match &err {
        CoreError::StageFailed { stage, source } => {
            assert_eq!(*stage, StageId::Planner);
            let agent_err = source.downcast_ref::<AgentError>().unwrap();
            assert!(matches!(agent_err, AgentError::Planning(_)));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(llm.call_count(), 1);
    assert!(tools.journal().is_empty());
    assert_eq!(fs::read_dir(tools.root().path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_run_report_keeps_run_id() {
    let (temp, tools) = workspace();
    let llm = MockLlm::new().add_structured(None);
    let forge = Forge::new(Arc::new(llm), tools);

    let state = PipelineState::new("Make me something");
    let run_id = state.run_id;
    let err = forge.run_state(state, 100).await.unwrap_err();

    let path = RunReport::aborted(run_id, "Make me something", err.to_string())
        .save(temp.path())
        .unwrap();
    assert!(path.ends_with(format!("{}.json", run_id)));
    assert_eq!(RunReport::load(&path).unwrap().run_id, run_id);
}

#[tokio::test]
async fn test_run_state_keeps_run_id() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[])));
    let forge = Forge::new(Arc::new(llm), tools);

    let state = PipelineState::new("Nothing to build");
    let run_id = state.run_id;
    let state = forge.run_state(state, 100).await.unwrap();

    assert_eq!(state.run_id, run_id);
    assert_eq!(state.status, PipelineStatus::Done);
}

#[tokio::test]
async fn test_same_file_steps_see_earlier_writes() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[
            ("script.js", "Define addTask"),
            ("script.js", "Wire addTask to the button"),
        ])))
        .add_chat(write_call("script.js", "function addTask() {}"))
        .add_chat(ChatResponse::text("ok"))
        .add_chat(write_call(
            "script.js",
            "function addTask() {}\nbutton.onclick = addTask;",
        ))
        .add_chat(ChatResponse::text("ok"));

    let forge = Forge::new(Arc::new(llm.clone()), tools.clone());
    let state = forge.run("todo", 100).await.unwrap();
    assert_eq!(state.invocations, 4);

    let instructions = coder_instructions(&llm);
    assert_eq!(instructions.len(), 2);
    assert!(instructions[0].contains("Existing content:\n\nUse write_file"));
    assert!(instructions[1].contains("Existing content:\nfunction addTask() {}\nUse write_file"));

    let hashes: Vec<_> = state
        .outcomes()
        .iter()
        .map(|o| o.content_hash.clone().unwrap())
        .collect();
    assert_ne!(hashes[0], hashes[1]);
}

#[tokio::test]
async fn test_recursion_limit_bounds_the_run() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[
            ("index.html", "markup"),
            ("style.css", "styles"),
            ("script.js", "logic"),
        ])));

    let forge = Forge::new(Arc::new(llm), tools);
    let err = forge.run("todo", 4).await.unwrap_err();
    assert!(matches!(err, CoreError::RecursionLimit { limit: 4 }));
}

#[tokio::test]
async fn test_skipped_step_does_not_stop_the_run() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[("index.html", "markup"), ("script.js", "logic")])))
        // index.html: two attempts that never write
        .add_chat(ChatResponse::text("I would write it like this..."))
        .add_chat(ChatResponse::text("Still thinking"))
        .add_chat(write_call("script.js", "console.log('hi');"))
        .add_chat(ChatResponse::text("ok"));

    let forge = Forge::new(Arc::new(llm), tools);
    let state = forge.run("todo", 100).await.unwrap();

    let outcomes = state.outcomes();
    assert_eq!(outcomes[0].status, StepStatus::Failed);
    assert_eq!(outcomes[0].attempts, 2);
    assert_eq!(outcomes[1].status, StepStatus::Written);
    assert_eq!(state.status, PipelineStatus::Done);
}

#[tokio::test]
async fn test_abort_policy_fails_the_run() {
    let (_temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[("index.html", "markup")])));
    let config = CoderConfig {
        max_attempts: 1,
        failure_policy: FailurePolicy::Abort,
        ..CoderConfig::default()
    };

    let forge = Forge::with_config(Arc::new(llm), tools, config);
    let err = forge.run("todo", 100).await.unwrap_err();
    assert_eq!(err.failed_stage(), Some(StageId::Coder));
}

#[tokio::test]
async fn test_plan_dry_run_writes_nothing() {
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[("index.html", "markup")])));

    let task_plan = design(Arc::new(llm.clone()), "todo").await.unwrap();

    assert_eq!(task_plan.len(), 1);
    assert_eq!(task_plan.plan.name, "Colourful Todo");
    assert_eq!(llm.get_method_calls("structured").len(), 2);
    assert!(!llm.was_called("chat"));
}

#[tokio::test]
async fn test_report_from_finished_run() {
    let (temp, tools) = workspace();
    let llm = MockLlm::new()
        .add_structured(Some(todo_plan()))
        .add_structured(Some(steps(&[("index.html", "markup")])))
        .add_chat(write_call("index.html", "<html></html>"))
        .add_chat(ChatResponse::text("ok"));

    let forge = Forge::new(Arc::new(llm), tools);
    let state = forge.run("todo", 100).await.unwrap();

    let report = RunReport::from_state(&state);
    let path = report.save(temp.path()).unwrap();
    let loaded = RunReport::load(&path).unwrap();

    assert_eq!(loaded.status, PipelineStatus::Done);
    assert_eq!(loaded.written_count(), 1);
    assert_eq!(loaded.outcomes[0].bytes_written, Some(13));
}
