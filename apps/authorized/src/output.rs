use std::process::ExitCode;

use gateway_request::{ExecutionError, ExecutionResult};

/// Message reported for a failed execution; includes the server's response
/// text when there is one.
#[must_use]
pub fn failure_message(err: &ExecutionError) -> String {
    match err.response_body() {
        Some(body) => format!("Exception running module: {err}, response: {body}"),
        None => format!("Exception running module: {err}"),
    }
}

#[must_use]
pub fn render_failure(msg: &str) -> String {
    serde_json::json!({ "failed": true, "msg": msg }).to_string()
}

/// Print the result JSON to stdout.
#[must_use]
pub fn succeed(result: &ExecutionResult) -> ExitCode {
    match serde_json::to_string(result) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("failed to serialize result: {e}")),
    }
}

/// Print `{"failed": true, "msg": ..}` to stdout.
#[must_use]
pub fn fail(msg: &str) -> ExitCode {
    println!("{}", render_failure(msg));
    ExitCode::FAILURE
}
