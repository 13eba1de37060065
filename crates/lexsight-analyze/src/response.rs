//! Turning raw model output into structured values.

use lexsight_core::AnalysisError;
use serde::de::DeserializeOwned;

/// Remove a surrounding Markdown code fence (```` ```json ```` or ```` ``` ````).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", ...) up to the first newline.
    let rest = match rest.find('\n') {
        Some(i) if rest[..i].chars().all(|c| c.is_ascii_alphanumeric()) => &rest[i + 1..],
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// The span from the first `{` to the last `}`, if any.
pub fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse model output as `T`: fenced or bare JSON first, then the
/// outermost `{...}` span for replies wrapped in prose.
pub fn parse_json_reply<T: DeserializeOwned>(raw: &str) -> Result<T, AnalysisError> {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str(cleaned) {
        Ok(value) => Ok(value),
        Err(first) => {
            let candidate = outermost_object(cleaned)
                .ok_or_else(|| AnalysisError::MalformedResponse(first.to_string()))?;
            serde_json::from_str(candidate)
                .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_strip_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{\"plain\": true}"), "{\"plain\": true}");
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn test_prose_wrapped_object() {
        let raw = "Here is the analysis:\n{\"risks\": [{\"id\": 1}]}\nLet me know!";
        let value: Value = parse_json_reply(raw).unwrap();
        assert_eq!(value["risks"][0]["id"], 1);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse_json_reply::<Value>("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
        let err = parse_json_reply::<Value>("{ not json }").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }
}
