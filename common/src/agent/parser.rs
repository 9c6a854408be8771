use crate::error::{DatagenError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^```(?:sql)?\s*(.*?)\s*```$").unwrap()
});

const PREVIEW_CHARS: usize = 200;

/// find the first syntactically complete json array in `text`.
///
/// each `[` is tried as a start position and parsed with a streaming
/// deserializer, so prose around the array and brackets inside strings or
/// nested arrays do not truncate the match. a `[` that lies inside a broken
/// array is never tried, so a truncated response cannot yield one of its
/// nested arrays.
pub fn extract_json_array(text: &str) -> Result<Vec<Value>> {
    let mut resume = 0;
    for (start, _) in text.match_indices('[') {
        if start < resume {
            continue;
        }

        let slice = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(slice).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items))) => return Ok(items),
            Some(Err(e)) => resume = start + error_offset(slice, &e),
            _ => {}
        }
    }

    Err(DatagenError::MissingJsonArray(preview(text)))
}

/// byte offset in `text` where parsing stopped
fn error_offset(text: &str, e: &serde_json::Error) -> usize {
    let line_start = text
        .match_indices('\n')
        .nth(e.line().saturating_sub(2))
        .filter(|_| e.line() > 1)
        .map(|(idx, _)| idx + 1)
        .unwrap_or(0);
    (line_start + e.column()).min(text.len())
}

/// trim the model output and drop a surrounding markdown code fence
pub fn clean_sql(text: &str) -> String {
    let text = text.trim();

    let text = match FENCE_REGEX.captures(text) {
        Some(captures) => captures.get(1).map(|m| m.as_str()).unwrap_or(text),
        None => text,
    };

    text.trim().to_string()
}

/// true when the statement starts with `select`, ignoring case
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

fn preview(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "model returned empty output".to_string();
    }
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}
