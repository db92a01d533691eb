//! Header placement
//!
//! Leading comments and inner attributes (`#![...]`) must stay at the top of
//! a crate root, so the instrumentation header goes right after them.

/// Index of the line before which the header is inserted.
///
/// Blank lines inside the leading region are allowed but never extend it:
/// the header lands directly after the last comment or attribute line.
pub fn insertion_line<'a>(lines: impl IntoIterator<Item = &'a str>) -> usize {
    let mut insert_at = 0;
    let mut in_block_comment = false;
    let mut attr_depth = 0isize;

    for (idx, line) in lines.into_iter().enumerate() {
        let trimmed = line.trim();

        if in_block_comment {
            insert_at = idx + 1;
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if attr_depth > 0 {
            insert_at = idx + 1;
            attr_depth += bracket_balance(trimmed);
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.starts_with("//") {
            insert_at = idx + 1;
        } else if trimmed.starts_with("/*") {
            insert_at = idx + 1;
            in_block_comment = !trimmed.contains("*/");
        } else if trimmed.starts_with("#!") {
            insert_at = idx + 1;
            attr_depth = bracket_balance(trimmed);
        } else {
            break;
        }
    }

    insert_at
}

/// Insert `header` lines into `text` at the header position.
///
/// Line endings of the original text are preserved.
pub fn insert_header(text: &str, header: &[String]) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let at = insertion_line(lines.iter().copied());
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

    let mut out = String::with_capacity(text.len() + header.iter().map(|h| h.len() + 2).sum::<usize>());
    for line in &lines[..at] {
        out.push_str(line);
    }
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(newline);
    }
    for line in header {
        out.push_str(line);
        out.push_str(newline);
    }
    for line in &lines[at..] {
        out.push_str(line);
    }
    out
}

fn bracket_balance(line: &str) -> isize {
    line.bytes().fold(0, |acc, b| match b {
        b'[' | b'(' => acc + 1,
        b']' | b')' => acc - 1,
        _ => acc,
    })
}
