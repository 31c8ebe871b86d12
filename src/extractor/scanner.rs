//! Lexical scanning of JavaScript/TypeScript sources for module specifiers.
//!
//! This is deliberately a scanner, not a parser: comments are stripped, then
//! a handful of patterns pick up the string literal of every static import,
//! re-export, `require()` and dynamic `import()`.

use std::sync::LazyLock;

use regex::Regex;

static IMPORT_PATTERNS: LazyLock<Result<[Regex; 3], regex::Error>> = LazyLock::new(|| {
    Ok([
        // import x from 'a'; import { y } from "a"; import 'a'; export * from 'a'
        Regex::new(
            r#"(?:^|[^\w$.])(?:import|export)\s*(?:type\s+)?(?:[\w$*{}\s,]+?\s*from\s*)?['"]([^'"\r\n]+)['"]"#,
        )?,
        // require('a')
        Regex::new(r#"(?:^|[^\w$.])require\s*\(\s*['"]([^'"\r\n]+)['"]\s*\)"#)?,
        // import('a')
        Regex::new(r#"(?:^|[^\w$.])import\s*\(\s*['"]([^'"\r\n]+)['"]\s*\)"#)?,
    ])
});

/// Every module specifier referenced by `source`, in order of first
/// appearance, without duplicates.
///
/// # Errors
///
/// Only fails if the built-in patterns do not compile.
pub fn scan_specifiers(source: &str) -> Result<Vec<String>, regex::Error> {
    let patterns = IMPORT_PATTERNS.as_ref().map_err(Clone::clone)?;
    let code = strip_comments(source);

    let mut found: Vec<(usize, String)> = Vec::new();
    for pattern in patterns {
        for captures in pattern.captures_iter(&code) {
            if let Some(specifier) = captures.get(1) {
                found.push((specifier.start(), specifier.as_str().trim().to_string()));
            }
        }
    }
    found.sort_by_key(|(offset, _)| *offset);

    let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
    for (_, specifier) in found {
        if !specifier.is_empty() && !specifiers.contains(&specifier) {
            specifiers.push(specifier);
        }
    }
    Ok(specifiers)
}

/// Remove `//` and `/* */` comments outside of string literals.
///
/// Newlines inside block comments are kept so offsets stay line-accurate.
/// Used for both script sources and JSON-with-comments config files.
pub fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                quote = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    previous = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}
