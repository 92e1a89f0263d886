//! JSON output on stdout
//!
//! Each command prints one line: `{"status": "ok", "data": ...}` on success
//! or `{"status": "error", "code": ..., "message": ...}` on failure.

use std::io::{self, Write};

use serde_json::Value;

use super::errors::CliResult;

pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_line(&response)
}

pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_line(&response)
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
