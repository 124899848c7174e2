use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::ingest::notification::NotificationFrame;
use crate::models::{LineOfCode, StackFrame};

/// Builds a stack frame whose source context is ordered by line number.
///
/// The code map is sparse and keyed by stringified line numbers. Every key must
/// parse as an integer and map to a distinct line; the output holds exactly one
/// `LineOfCode` per key, strictly ascending.
pub fn normalize_frame(
    file: &str,
    line_number: i64,
    method: &str,
    code: &HashMap<String, String>,
) -> AppResult<StackFrame> {
    let mut lines = code
        .iter()
        .map(|(key, content)| {
            let number = key.parse::<i64>().map_err(|_| {
                AppError::MalformedInput(format!(
                    "Code line key {:?} in {} is not a line number",
                    key, file
                ))
            })?;
            Ok(LineOfCode {
                line_number: number,
                content: content.clone(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    lines.sort_by_key(|line| line.line_number);

    if let Some(pair) = lines
        .windows(2)
        .find(|pair| pair[0].line_number == pair[1].line_number)
    {
        return Err(AppError::MalformedInput(format!(
            "Code line {} in {} is given more than once",
            pair[0].line_number, file
        )));
    }

    Ok(StackFrame {
        file: file.to_string(),
        line_number,
        method: method.to_string(),
        code: lines,
    })
}

/// Normalizes every frame of a trace, preserving frame order
pub fn normalize_trace(frames: &[NotificationFrame]) -> AppResult<Vec<StackFrame>> {
    frames
        .iter()
        .map(|frame| normalize_frame(&frame.file, frame.line_number, &frame.method, &frame.code))
        .collect()
}
