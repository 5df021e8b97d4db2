//! Locating a JSON value inside a model answer.

/// The first complete JSON object or array in `text`.
///
/// A fenced code block is preferred when present. Brackets inside string
/// literals are ignored while matching.
pub fn extract_json(text: &str) -> Option<&str> {
    let body = fenced_block(text).unwrap_or(text);
    let start = body.find(['{', '['])?;
    let end = matching_close(&body[start..])?;
    Some(&body[start..start + end])
}

fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after = &text[open + 3..];
    // skip the info string (`json`) up to the end of the line
    let content_start = after.find('\n').map_or(0, |i| i + 1);
    let content = &after[content_start..];
    let close = content.find("```")?;
    Some(content[..close].trim())
}

/// Byte length of the balanced value starting at the first char of `s`.
fn matching_close(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}
