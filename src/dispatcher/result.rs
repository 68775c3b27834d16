//! Agent invocation contract: input payload and result extraction.

use serde_json::{Value, json};

use crate::{common::Vars, runtime::RunContext};

/// Line an agent prints before its JSON result.
pub const RESULT_SENTINEL: &str = "###RESULT###";
/// Argument naming the input payload file.
pub const CONTEXT_FILE_ARG: &str = "--context-file";
/// `mode` told to agents, so they never wait for user input.
pub const HEADLESS_MODE: &str = "headless";
/// Key of the fallback output holding unparsed text.
pub const RAW_OUTPUT_KEY: &str = "raw_output";

/// The single input object every agent receives.
pub(crate) fn payload(
    config: &Vars,
    ctx: &RunContext,
) -> Value {
    json!({
        "config": config,
        "context": ctx.to_value(),
        "mode": HEADLESS_MODE,
    })
}

/// Extracts the structured result from an agent's standard output.
///
/// Everything after the first sentinel is parsed as JSON. When the sentinel is
/// missing the whole output is kept as `{"raw_output": ...}`, when the trailing
/// text is not JSON that text is kept instead. Never fails.
pub fn extract_output(stdout: &str) -> Value {
    match stdout.split_once(RESULT_SENTINEL) {
        Some((_, rest)) => {
            let rest = rest.trim();
            serde_json::from_str(rest).unwrap_or_else(|_| json!({ RAW_OUTPUT_KEY: rest }))
        }
        None => json!({ RAW_OUTPUT_KEY: stdout }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_extract_after_sentinel() {
        let stdout = "loading market data\nscore computed\n###RESULT###\n{\"signal\": \"buy\", \"confidence\": 0.8}\n";
        assert_eq!(extract_output(stdout), json!({"signal": "buy", "confidence": 0.8}));
    }

    #[test]
    fn test_missing_sentinel_keeps_raw_text() {
        let stdout = "no structured result\n";
        assert_eq!(extract_output(stdout), json!({"raw_output": "no structured result\n"}));
    }

    #[test]
    fn test_unparseable_result_keeps_trailing_text() {
        let stdout = "log\n###RESULT###\n{not json\n";
        assert_eq!(extract_output(stdout), json!({"raw_output": "{not json"}));
    }

    #[test]
    fn test_only_first_sentinel_splits() {
        let stdout = "###RESULT###\n\"a ###RESULT### b\"";
        assert_eq!(extract_output(stdout), json!("a ###RESULT### b"));
    }

    #[test]
    fn test_payload_shape() {
        let mut config = Vars::new();
        config.set("symbol", "AAPL");
        let mut ctx = RunContext::new("run-1");
        ctx.add_output("A".to_string(), json!({"x": 1}));

        assert_eq!(
            payload(&config, &ctx),
            json!({
                "config": {"symbol": "AAPL"},
                "context": {"A": {"x": 1}},
                "mode": "headless",
            })
        );
    }
}
