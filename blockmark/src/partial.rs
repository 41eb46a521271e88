use serde_json::Value;

/// Recover the decodable part of a JSON object that may have been cut off
/// at any byte.
///
/// The fragment is scanned once, recording every position where the text
/// could be closed off into valid JSON: right after an opening or closing
/// bracket, right after a string's closing quote, and right before a comma.
/// Candidates are then tried from the longest down, with the closers of
/// whatever containers are still open appended. The first candidate that
/// parses as an object wins.
///
/// Strings and bare scalars at the very end are never completed: `"vid`
/// might become `"video"` and `64` might become `640`, so the value is
/// dropped instead of guessed.
pub fn complete_partial_json(fragment: &str) -> Option<Value> {
    let fragment = fragment.trim_start();
    if !fragment.starts_with('{') {
        return None;
    }

    let mut stack: Vec<char> = Vec::new();
    let mut cuts: Vec<(usize, String)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in fragment.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
                cuts.push((i + 1, closers(&stack)));
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => {
                stack.push('}');
                cuts.push((i + 1, closers(&stack)));
            }
            '[' => {
                stack.push(']');
                cuts.push((i + 1, closers(&stack)));
            }
            '}' | ']' => {
                if stack.pop() != Some(c) {
                    // Mismatched bracket: nothing past here can be valid.
                    break;
                }
                cuts.push((i + 1, closers(&stack)));
                if stack.is_empty() {
                    break;
                }
            }
            ',' => cuts.push((i, closers(&stack))),
            _ => {}
        }
    }

    cuts.iter().rev().find_map(|(end, tail)| {
        let mut candidate = String::with_capacity(end + tail.len());
        candidate.push_str(&fragment[..*end]);
        candidate.push_str(tail);
        match serde_json::from_str::<Value>(&candidate) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        }
    })
}

fn closers(stack: &[char]) -> String {
    stack.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closes_open_containers() {
        let value = complete_partial_json(r#"{"type":"video","content":{"src":"a.mp4""#);
        assert_eq!(
            value,
            Some(json!({"type": "video", "content": {"src": "a.mp4"}}))
        );
    }

    #[test]
    fn drops_truncated_string_value() {
        let value = complete_partial_json(r#"{"type":"video","content":{"src":""#);
        assert_eq!(value, Some(json!({"type": "video", "content": {}})));

        let value = complete_partial_json(r#"{"type":"vid"#);
        assert_eq!(value, Some(json!({})));
    }

    #[test]
    fn drops_dangling_key_and_scalar() {
        let value = complete_partial_json(r#"{"type":"video","content""#);
        assert_eq!(value, Some(json!({"type": "video"})));

        let value = complete_partial_json(r#"{"a":{"width":64"#);
        assert_eq!(value, Some(json!({"a": {}})));
    }

    #[test]
    fn keeps_array_prefix() {
        let value = complete_partial_json(r#"{"list":["a","b"#);
        assert_eq!(value, Some(json!({"list": ["a"]})));
    }

    #[test]
    fn handles_escaped_quotes() {
        let value = complete_partial_json(r#"{"type":"html","content":"say \"hi\"","x"#);
        assert_eq!(
            value,
            Some(json!({"type": "html", "content": "say \"hi\""}))
        );
    }

    #[test]
    fn stops_at_closed_object() {
        let value = complete_partial_json(r#"{"type":"html"} trailing {"#);
        assert_eq!(value, Some(json!({"type": "html"})));
    }

    #[test]
    fn rejects_non_objects() {
        assert_eq!(complete_partial_json(""), None);
        assert_eq!(complete_partial_json("   "), None);
        assert_eq!(complete_partial_json("[1,2"), None);
    }
}
