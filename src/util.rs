//! Small utility helpers used across modules.

/// Very small string templating.
/// Replaces `{key}` placeholders with the provided values in a single left-to-right pass,
/// so braces inside substituted values are never re-interpreted.
/// Unknown `{...}` sequences are copied through untouched.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;

  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let replaced = after.find('}').and_then(|close| {
      let key = &after[..close];
      pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| (*v, close))
    });
    match replaced {
      Some((value, close)) => {
        out.push_str(value);
        rest = &after[close + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}

/// If the whole string is wrapped in one Markdown code fence (optionally tagged, e.g. ```json),
/// return the fenced body. Otherwise return the input unchanged.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(body) = t.strip_prefix("```") else { return s };
  let Some(body) = body.strip_suffix("```") else { return s };
  // Drop the info string ("json", "JSON", ...) up to the first newline.
  match body.find('\n') {
    Some(nl) if !body[..nl].contains('{') => body[nl + 1..].trim(),
    _ => body.trim(),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge prompts or model responses.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}
