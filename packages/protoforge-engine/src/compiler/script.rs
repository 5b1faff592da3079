use crate::schema::Specification;

const RUNTIME_JS: &str = include_str!("runtime.js");

/// Global the runtime reads the prototype from.
pub const DATA_GLOBAL: &str = "__PROTOFORGE_SPEC__";

/// Serializes `spec` as a JavaScript literal that is safe to inline: no
/// `</` sequences and no raw line/paragraph separators.
pub fn embed_spec(spec: &Specification) -> String {
    serde_json::to_string(spec)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

pub fn render_script(spec: &Specification) -> String {
    format!(
        "window.{} = {};\n{}",
        DATA_GLOBAL,
        embed_spec(spec),
        RUNTIME_JS
    )
}
