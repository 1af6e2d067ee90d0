use std::io::{BufRead, Write};
use std::path::PathBuf;

use ledger_core::error::{ErrorBody, codes};

use crate::api::ApiError;

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("ledger-cli/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub fn print_error(body: &ErrorBody) {
    match serde_json::to_string_pretty(body) {
        Ok(s) => eprintln!("{s}"),
        Err(_) => eprintln!("{}: {}", body.error, body.message),
    }
}

pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut body = ErrorBody::new(codes::CLI_ERROR, message);
    if let Some(hint) = docs_hint {
        body = body.with_hint(hint);
    }
    print_error(&body);
    std::process::exit(4);
}

/// Print an API failure and return its exit code.
pub fn report_api_error(err: &ApiError) -> i32 {
    let body = match err {
        ApiError::Transport(_) => ErrorBody::new(codes::CONNECTION_ERROR, err.to_string())
            .with_hint("Is the API server running? Check LEDGER_API_URL."),
        ApiError::Status { status: 404, detail } => ErrorBody::new(codes::NOT_FOUND, detail.clone()),
        _ => ErrorBody::new(codes::API_ERROR, err.to_string()),
    };
    print_error(&body);
    err.exit_code()
}

/// Location of the persisted view state (filters, search, pending undo).
pub fn state_path() -> PathBuf {
    if let Ok(path) = std::env::var("LEDGER_STATE_PATH") {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledger")
        .join("state.json")
}

/// Blocking yes/no prompt on stderr. Anything but `y`/`yes` declines.
pub fn confirm(prompt: &str) -> bool {
    eprint!("{prompt} [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read text from a file path or stdin (when path is "-").
pub fn read_text_from_file(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        for line in std::io::stdin().lock().lines() {
            let line = line.map_err(|e| format!("Failed to read stdin: {e}"))?;
            buf.push_str(&line);
            buf.push('\n');
        }
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read file '{path}': {e}"))
}

/// Split `a,b, c` into trimmed non-empty parts.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list("3, 5,,"), vec!["3".to_string(), "5".to_string()]);
        assert!(split_list("").is_empty());
    }
}
