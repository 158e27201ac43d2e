/// Trailing marker some model outputs append after the JSON document.
const END_SENTINEL: &str = "END_OF_JSON";

/// Strips Markdown code fences (with or without a `json` tag) and a trailing
/// `END_OF_JSON` marker from model output.
pub(crate) fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_suffix(END_SENTINEL).map(str::trim_end).unwrap_or(text);

    let Some(stripped) = text.strip_prefix("```") else {
        return text;
    };
    let stripped = stripped
        .strip_prefix("json")
        .or_else(|| stripped.strip_prefix("JSON"))
        .unwrap_or(stripped)
        .trim_start();

    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}
