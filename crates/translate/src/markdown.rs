//! Shape repair for translated markdown.
//!
//! Translation backends sometimes wrap their output in code fences or
//! collapse a bullet list into one line. Both are fixed up here before the
//! text is logged or shown.

/// Drop a surrounding ```...``` fence, if present.
#[must_use]
pub fn strip_fences(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```") && s.ends_with("```") {
        let lines: Vec<&str> = s.lines().collect();
        if lines.len() >= 2 {
            return lines[1..lines.len() - 1].join("\n").trim().to_owned();
        }
    }
    s.to_owned()
}

/// Restore bullet line breaks when the source had a list but the translated
/// output came back as a single line.
#[must_use]
pub fn repair_list_structure(src: &str, out: &str) -> String {
    let had_bullets = src.lines().filter(|ln| is_bullet(ln)).count() >= 2;
    if !had_bullets || out.contains('\n') {
        return out.to_owned();
    }

    let mut out = out.to_owned();
    for (from, to) in [
        (" - ", "\n- "),
        (" • ", "\n- "),
        (" ・", "\n- "),
        (" + ", "\n+ "),
        (" * ", "\n* "),
    ] {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }

    // "1. item 2. item" → numbered items on their own lines
    let mut rebuilt = String::with_capacity(out.len());
    for (i, c) in out.char_indices() {
        if c == ' '
            && let Some(rest) = out.get(i + 1..)
            && starts_numbered_item(rest)
        {
            rebuilt.push('\n');
        } else {
            rebuilt.push(c);
        }
    }
    rebuilt
}

fn is_bullet(line: &str) -> bool {
    let line = line.trim_start();
    if line.starts_with('-') || line.starts_with('*') || line.starts_with('+') {
        return true;
    }
    starts_numbered_item(line)
}

/// `"3. "`-style list marker at the start of `s`.
fn starts_numbered_item(s: &str) -> bool {
    let digits: String = s.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return false;
    }
    s[digits.len()..].starts_with(". ")
}
