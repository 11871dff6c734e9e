//! Line-delimited JSON I/O for the CLI
//!
//! - Input: one JSON request per line
//! - Output: one JSON response per line on stdout
//! - Logs never go to stdout

use std::io::{BufRead, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Read a single request line
pub fn read_request<R: BufRead>(reader: &mut R) -> CliResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let line = line.trim();
    if line.is_empty() {
        return Err(CliError::EmptyInput);
    }
    Ok(line.to_string())
}

/// Iterate request lines, skipping blank ones
pub fn read_requests<R: BufRead>(reader: R) -> impl Iterator<Item = CliResult<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(Ok(line)),
        Err(e) => Some(Err(CliError::from(e))),
    })
}

/// Write a success envelope
pub fn write_response<W: Write>(out: &mut W, data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_json(out, &response.to_string())
}

/// Write an error envelope
pub fn write_error<W: Write>(out: &mut W, code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_json(out, &response.to_string())
}

/// Write a rendered JSON line and flush
pub fn write_json<W: Write>(out: &mut W, json_str: &str) -> CliResult<()> {
    writeln!(out, "{}", json_str)
        .and_then(|()| out.flush())
        .map_err(CliError::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let input = Cursor::new("{\"op\":\"metrics\"}\n\n   \n{\"op\":\"metrics\"}\n");
        let lines: Vec<String> = read_requests(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_read_request_empty_input() {
        let mut input = Cursor::new("");
        let err = read_request(&mut input).unwrap_err();
        assert!(matches!(err, CliError::EmptyInput));
        assert_eq!(err.code(), "FORGE_CLI_IO_ERROR");
    }

    #[test]
    fn test_write_error_is_one_line() {
        let mut out = Vec::new();
        write_error(&mut out, "FORGE_CLI_IO_ERROR", "broken pipe").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(parsed["code"], "FORGE_CLI_IO_ERROR");
    }
}
