//! Prompt text for the three agents.

use forge_core::{ImplementationStep, Plan};

pub fn planner_prompt(user_prompt: &str) -> String {
    format!(
        "You are the PLANNER agent. Convert the user prompt into a COMPLETE engineering project plan.\n\
         List every file the project needs, each with its purpose.\n\
         \n\
         User request:\n\
         {user_prompt}\n"
    )
}

pub fn architect_prompt(plan: &Plan) -> String {
    let rendered = serde_json::to_string_pretty(plan).unwrap_or_else(|_| format!("{:?}", plan));
    format!(
        "You are the ARCHITECT agent. Given this project plan, break it down into explicit engineering tasks.\n\
         \n\
         RULES:\n\
         - For each FILE in the plan, create one or more IMPLEMENTATION TASKS.\n\
         - In each task description:\n\
           * Specify exactly what to implement.\n\
           * Name the variables, functions, classes and components to be defined.\n\
           * Mention how this task depends on or will be used by previous tasks.\n\
           * Include integration details: imports, expected function signatures, data flow.\n\
         - Order tasks so that dependencies are implemented first.\n\
         - Each step must be SELF-CONTAINED but also carry FORWARD the relevant context from earlier tasks.\n\
         \n\
         Project Plan:\n\
         {rendered}\n"
    )
}

pub fn coder_system_prompt() -> &'static str {
    "You are the CODER agent.\n\
     You are implementing a specific engineering task.\n\
     You have access to tools to read and write files.\n\
     \n\
     Always:\n\
     - Review all existing files to maintain compatibility.\n\
     - Implement the FULL file content, integrating with other modules.\n\
     - Maintain consistent naming of variables, functions, and imports.\n\
     - When a module is imported from another file, ensure it exists and is implemented as described.\n"
}

/// Instruction for a single coding step.
pub fn step_instruction(step: &ImplementationStep, existing_content: &str) -> String {
    format!(
        "Task: {}\nFile: {}\nExisting content:\n{}\nUse write_file(path, content) to save your changes.",
        step.task_description, step.filepath, existing_content
    )
}
