use super::{codes, ErrorCode, Hint};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHelpSummary {
    pub code: String,
    pub summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorHelp {
    pub code: String,
    pub summary: String,
    pub details_schema: serde_json::Value,
    pub hints: Vec<Hint>,
}

pub fn list() -> Vec<ErrorHelpSummary> {
    codes::all_codes()
        .iter()
        .copied()
        .map(|code| {
            let help = explain(code);
            ErrorHelpSummary {
                code: help.code,
                summary: help.summary,
            }
        })
        .collect()
}

fn hint(message: &str) -> Vec<Hint> {
    vec![Hint {
        message: message.to_string(),
    }]
}

pub fn explain(code: ErrorCode) -> ErrorHelp {
    let (summary, details_schema, hints) = match code {
        ErrorCode::ConfigInvalidJson => (
            "Configuration override file is not valid JSON",
            serde_json::json!({"path":"string","error":"string"}),
            hint("Fix JSON syntax in the file passed with --config"),
        ),
        ErrorCode::ConfigInvalidValue => (
            "Configuration value is invalid",
            serde_json::json!({"key":"string","value":"string?","problem":"string"}),
            hint("Run 'vhdci config' to see the effective configuration"),
        ),
        ErrorCode::ValidationInvalidArgument => (
            "Command-line argument is invalid",
            serde_json::json!({"field":"string","problem":"string","id":"string?","tried":"string[]?"}),
            hint("Run 'vhdci --help' for usage"),
        ),
        ErrorCode::CleanupIoError => (
            "A stale artifact could not be deleted",
            serde_json::json!({"path":"string","error":"string"}),
            hint("Close programs holding the file open, or set cleanup.strict to false to continue past delete failures"),
        ),
        ErrorCode::BuildProjectNotFound => (
            "A configured utility project directory does not exist",
            serde_json::json!({"project":"string","directory":"string"}),
            hint("Check utilities_root and each utility's directory"),
        ),
        ErrorCode::SequenceBinaryNotFound => (
            "A command step names an executable that no build produced",
            serde_json::json!({"executable":"string","step":"number","index":"object"}),
            hint("Compare the step's executable with the discovered index printed alongside the error"),
        ),
        ErrorCode::ProcessSpawnFailed => (
            "An external process could not be started",
            serde_json::json!({"program":"string","error":"string","workingDir":"string?"}),
            hint("Check that the program exists, is executable, and is on PATH"),
        ),
        ErrorCode::InternalIoError => (
            "Internal IO error",
            serde_json::json!({"error":"string","context":"string?"}),
            Vec::new(),
        ),
        ErrorCode::InternalJsonError => (
            "Internal JSON error",
            serde_json::json!({"error":"string","context":"string?"}),
            Vec::new(),
        ),
        ErrorCode::InternalUnexpected => (
            "Unexpected internal error",
            serde_json::json!({"error":"string"}),
            Vec::new(),
        ),
    };

    ErrorHelp {
        code: code.as_str().to_string(),
        summary: summary.to_string(),
        details_schema,
        hints,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_covers_every_code() {
        assert_eq!(list().len(), codes::all_codes().len());
    }

    #[test]
    fn binary_not_found_help_mentions_index() {
        let help = explain(ErrorCode::SequenceBinaryNotFound);
        assert_eq!(help.code, "sequence.binary_not_found");
        assert!(help.details_schema.get("index").is_some());
    }
}
