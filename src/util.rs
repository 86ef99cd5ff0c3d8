//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values in a
/// single left-to-right pass; inserted values are never rescanned.
/// Unknown placeholders and literal JSON braces are left alone.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(start) = rest.find('{') {
    out.push_str(&rest[..start]);
    let after = &rest[start + 1..];
    let value = after
      .find('}')
      .and_then(|end| pairs.iter().find(|(k, _)| *k == &after[..end]).map(|(_, v)| (end, *v)));
    match value {
      Some((end, v)) => {
        out.push_str(v);
        rest = &after[end + 1..];
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

/// Trimmed value, or None when absent or blank.
pub fn non_blank(v: Option<&str>) -> Option<String> {
  v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Strip a single surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(s: &str) -> &str {
  let t = s.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  let Some(body) = rest.strip_suffix("```") else { return t };
  // drop the info string ("json") on the opening line, or inline on a one-line fence
  match body.split_once('\n') {
    Some((info, inner)) if !info.trim_start().starts_with(['{', '[']) => inner.trim(),
    _ => {
      let inner = body.trim_start();
      match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => inner[4..].trim(),
        _ => inner.trim(),
      }
    }
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    format!("{}… ({} bytes total)", s.chars().take(max).collect::<String>(), s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_ignores_json_braces() {
    let out = fill_template(r#"Topic {topic}: {"title": "..."}"#, &[("topic", "graphs")]);
    assert_eq!(out, r#"Topic graphs: {"title": "..."}"#);
  }

  #[test]
  fn fill_template_does_not_expand_inserted_values() {
    let out = fill_template("{a} then {b} and {a}", &[("a", "{b}"), ("b", "x")]);
    assert_eq!(out, "{b} then x and {b}");
  }

  #[test]
  fn fill_template_keeps_unknown_and_unclosed_placeholders() {
    assert_eq!(fill_template("{nope} {a", &[("a", "x")]), "{nope} {a");
    assert_eq!(fill_template("{{a}}", &[("a", "x")]), "{x}");
  }

  #[test]
  fn non_blank_trims() {
    assert_eq!(non_blank(Some("  a ")), Some("a".to_string()));
    assert_eq!(non_blank(Some("   ")), None);
    assert_eq!(non_blank(None), None);
  }

  #[test]
  fn strip_code_fence_variants() {
    assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("  ```json\n{}\n```  "), "{}");
    assert_eq!(strip_code_fence("```json {} "), "```json {}");
    assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fence("```{\n\"a\":1\n}```"), "{\n\"a\":1\n}");
  }

  #[test]
  fn trunc_for_log_is_char_safe() {
    assert_eq!(trunc_for_log("abc", 5), "abc");
    assert_eq!(trunc_for_log("ééé", 1), "é… (6 bytes total)");
  }
}
