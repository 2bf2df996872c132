//! Progress reporting.
//!
//! The fetch and summarize paths report human-readable status lines through a
//! [`ProgressSink`]. Calls are fire-and-forget and never affect the result.
//!
//! [`JsonLineProgress`] emits the machine-readable form for wrappers that
//! parse stdout:
//!
//! `RECAP_PROGRESS:{"stage":"fetch","message":"Fetching page 1..."}`

use std::io::Write;

/// Receives status lines, in order.
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message)
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}

/// Writes each update as a prefixed JSON line on stdout.
#[derive(Debug, Clone)]
pub struct JsonLineProgress {
    stage: &'static str,
}

impl JsonLineProgress {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }
}

impl ProgressSink for JsonLineProgress {
    fn report(&self, message: &str) {
        emit_progress(self.stage, message);
    }
}

/// Emit a progress line to stdout.
///
/// Output format: `RECAP_PROGRESS:{"stage":"fetch","message":"..."}\n`
pub fn emit_progress(stage: &str, message: &str) {
    println!("RECAP_PROGRESS:{}", progress_line(stage, message));
    let _ = std::io::stdout().flush();
}

/// Emit a final result line to stdout.
///
/// Output format: `RECAP_RESULT:{"type":"summary","status":"complete","data":{...}}\n`
pub fn emit_result(result_type: &str, status: &str, data: serde_json::Value) {
    let payload = serde_json::json!({
        "type": result_type,
        "status": status,
        "data": data
    });
    println!("RECAP_RESULT:{}", payload);
    let _ = std::io::stdout().flush();
}

fn progress_line(stage: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "stage": stage,
        "message": message,
    })
}
