//! 从模型输出中提取结构化 JSON
//!
//! 模型经常把 JSON 包在 markdown 代码块里，或者前后夹带解释文字。
//! 候选片段依次取：```json 代码块、第一个括号配平的 `{…}` 对象、整段文本。
//! 候选片段反序列化或校验失败时使用调用方给出的兜底值，失败只记录日志。

use serde::de::DeserializeOwned;
use validator::Validate;

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// 模型输出通过了解析和校验
    Structured(T),
    /// 使用了兜底值，附带模型原始输出
    Fallback { value: T, raw: String },
}

impl<T> Parsed<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Parsed::Fallback { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Parsed::Structured(value) | Parsed::Fallback { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Parsed::Structured(value) | Parsed::Fallback { value, .. } => value,
        }
    }
}

const FENCE_OPEN: &str = "```json";
const FENCE: &str = "```";

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &text[start..];
    let end = rest.find(FENCE)?;
    Some(rest[..end].trim())
}

/// 第一个括号配平的对象，忽略字符串内的括号
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
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
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// 选出最可能是 JSON 的片段
pub fn candidate(text: &str) -> &str {
    fenced_block(text)
        .or_else(|| balanced_object(text))
        .unwrap_or_else(|| text.trim())
}

/// 严格解析：候选片段必须反序列化为 `T` 且通过校验
pub fn try_parse<T>(text: &str) -> std::result::Result<T, String>
where
    T: DeserializeOwned + Validate,
{
    let value = serde_json::from_str::<T>(candidate(text)).map_err(|e| e.to_string())?;
    value.validate().map_err(|e| e.to_string())?;
    Ok(value)
}

/// 解析为 `T`，失败时用 `fallback(raw)` 兜底
pub fn parse_or<T, F>(text: &str, fallback: F) -> Parsed<T>
where
    T: DeserializeOwned + Validate,
    F: FnOnce(&str) -> T,
{
    let error = match try_parse::<T>(text) {
        Ok(value) => return Parsed::Structured(value),
        Err(e) => e,
    };

    tracing::warn!(
        "Model output could not be structured ({}), using fallback",
        error
    );
    tracing::debug!("Unstructured model output: {}", text);
    Parsed::Fallback {
        value: fallback(text),
        raw: text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate, PartialEq)]
    struct Score {
        #[validate(range(min = 0, max = 100))]
        score: i64,
        #[serde(default)]
        note: String,
    }

    fn fallback(_: &str) -> Score {
        Score {
            score: -1,
            note: "fallback".into(),
        }
    }

    #[test]
    fn test_fenced_block_wins() {
        let text = "Sure! {not this}\n```json\n{\"score\": 80}\n```\nThanks";
        assert_eq!(candidate(text), "{\"score\": 80}");
    }

    #[test]
    fn test_balanced_object_with_nested_braces_and_strings() {
        let text = r#"Here you go: {"score": 75, "note": "a } brace", "x": {"y": 1}} trailing {junk}"#;
        assert_eq!(
            candidate(text),
            r#"{"score": 75, "note": "a } brace", "x": {"y": 1}}"#
        );
        let parsed = parse_or::<Score, _>(text, fallback);
        assert_eq!(
            parsed,
            Parsed::Structured(Score {
                score: 75,
                note: "a } brace".into()
            })
        );
    }

    #[test]
    fn test_escaped_quotes_in_strings() {
        let text = r#"{"score": 10, "note": "she said \"hi}\""}"#;
        assert_eq!(candidate(text), text);
    }

    #[test]
    fn test_unbalanced_falls_back_to_whole_text() {
        assert_eq!(candidate("  {\"score\": 1  "), "{\"score\": 1");
    }

    #[test]
    fn test_non_json_uses_fallback() {
        let parsed = parse_or("I think they'd get along great!", fallback);
        assert!(parsed.is_fallback());
        match parsed {
            Parsed::Fallback { value, raw } => {
                assert_eq!(value.score, -1);
                assert_eq!(raw, "I think they'd get along great!");
            }
            Parsed::Structured(_) => unreachable!(),
        }
    }

    #[test]
    fn test_invalid_values_use_fallback() {
        let parsed = parse_or("{\"score\": 250}", fallback);
        assert!(parsed.is_fallback());
        assert_eq!(parsed.into_inner().note, "fallback");
    }

    #[test]
    fn test_wrong_shape_uses_fallback() {
        let parsed = parse_or("{\"score\": \"high\"}", fallback);
        assert_eq!(parsed.value().score, -1);
    }
}
