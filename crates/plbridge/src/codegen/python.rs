//! Helpers for emitting Python source and dollar-quoted bodies.

/// Removes the longest common leading whitespace from every non-blank line,
/// so a method-indented `def` becomes a module-level one. The result always
/// ends with a single newline.
pub fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut output = String::with_capacity(text.len());
    for line in text.trim_end().lines() {
        if line.trim().is_empty() {
            output.push('\n');
            continue;
        }
        output.push_str(line.get(margin..).unwrap_or(line.trim_start()));
        output.push('\n');
    }
    output
}

/// Renders a single-quoted Python string literal.
pub fn py_str(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 2);
    output.push('\'');
    for c in value.chars() {
        match c {
            '\\' => output.push_str("\\\\"),
            '\'' => output.push_str("\\'"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => output.push_str(&format!("\\u{:04x}", c as u32)),
            c => output.push(c),
        }
    }
    output.push('\'');
    output
}

/// Renders a Python list of string literals.
pub fn py_str_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| py_str(v)).collect();
    format!("[{}]", items.join(", "))
}

/// Picks a dollar-quote tag that does not occur in `body`.
pub fn dollar_tag(body: &str) -> String {
    if !body.contains("$$") {
        return "$$".to_string();
    }
    let mut tag = "$plbridge$".to_string();
    let mut n = 1;
    while body.contains(&tag) {
        tag = format!("$plbridge{n}$");
        n += 1;
    }
    tag
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedent_method_body() {
        let source = "    def f(a: int) -> int:\n        if a:\n\n            return a\n        return 0\n";
        assert_eq!(
            dedent(source),
            "def f(a: int) -> int:\n    if a:\n\n        return a\n    return 0\n"
        );
    }

    #[test]
    fn test_dedent_is_noop_at_module_level() {
        let source = "def f():\n    pass";
        assert_eq!(dedent(source), "def f():\n    pass\n");
    }

    #[test]
    fn test_py_str_escaping() {
        assert_eq!(py_str("plain"), "'plain'");
        assert_eq!(py_str("it's"), "'it\\'s'");
        assert_eq!(py_str("a\\b"), "'a\\\\b'");
        assert_eq!(py_str("line\nbreak"), "'line\\nbreak'");
        assert_eq!(py_str("\u{1}"), "'\\u0001'");
    }

    #[test]
    fn test_py_str_list() {
        let values = vec!["/venv/lib".to_string(), "/srv".to_string()];
        assert_eq!(py_str_list(&values), "['/venv/lib', '/srv']");
        assert_eq!(py_str_list(&[]), "[]");
    }

    #[test]
    fn test_dollar_tag_avoids_collisions() {
        assert_eq!(dollar_tag("return 1"), "$$");
        assert_eq!(dollar_tag("x = '$$'"), "$plbridge$");
        assert_eq!(dollar_tag("x = '$$ $plbridge$'"), "$plbridge1$");
    }
}
