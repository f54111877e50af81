use crate::errors::MalformedOutput;
use serde_json::{Map, Value};

pub(crate) const REQUIRED_KEYS: [&str; 2] = ["answer", "reasoning"];

/// Recover the `{answer, reasoning}` object from a raw completion.
///
/// Fenced code blocks are tried first, then the whole text. Within each
/// candidate every `{` outside an already parsed object is a possible
/// object start; the first object that carries both required keys wins.
/// Objects nested inside a wrapper object are not considered.
pub(crate) fn extract_judgment(raw: &str) -> Result<Map<String, Value>, MalformedOutput> {
    let mut candidates = fenced_blocks(raw);
    candidates.push(raw);

    let mut first_object: Option<Map<String, Value>> = None;
    let mut first_error: Option<String> = None;

    for text in candidates {
        let mut parsed_until = 0;
        for (pos, _) in text.match_indices('{') {
            if pos < parsed_until {
                continue;
            }
            let mut stream = serde_json::Deserializer::from_str(&text[pos..]).into_iter::<Value>();
            let next = stream.next();
            if let Some(Ok(_)) = next {
                parsed_until = pos + stream.byte_offset();
            }
            match next {
                Some(Ok(Value::Object(obj))) => {
                    if missing_keys(&obj).is_empty() {
                        return Ok(obj);
                    }
                    first_object.get_or_insert(obj);
                }
                Some(Ok(_)) | None => {}
                Some(Err(e)) => {
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
    }

    if let Some(obj) = first_object {
        return Err(MalformedOutput::MissingKeys(missing_keys(&obj)));
    }
    if let Some(e) = first_error {
        return Err(MalformedOutput::InvalidJson(e));
    }
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(_) => Err(MalformedOutput::NotAnObject),
        Err(_) => Err(MalformedOutput::NoJson),
    }
}

fn missing_keys(obj: &Map<String, Value>) -> Vec<String> {
    REQUIRED_KEYS
        .iter()
        .filter(|k| !obj.contains_key(**k))
        .map(|k| k.to_string())
        .collect()
}

/// Bodies of ``` fenced blocks, language tag stripped.
fn fenced_blocks(raw: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map_or(0, |nl| nl + 1);
        let Some(close) = after[body_start..].find("```") else {
            break;
        };
        out.push(&after[body_start..body_start + close]);
        rest = &after[body_start + close + 3..];
    }
    out
}
