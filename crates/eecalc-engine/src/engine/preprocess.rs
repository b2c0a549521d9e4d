//! Expression preprocessing.
//!
//! Cell text is written in an engineering calculator notation. Before it can be
//! evaluated by Rhai it goes through these rewrites, in order:
//!
//! - **Unit suffixes**: `10k` → `10e3`, `4.7 u` → `4.7e-6`, `2meg` → `2e6`
//! - **Power**: `^` → `**` (Rhai uses `^` for XOR)
//! - **Numeric literals**: every literal becomes a float (`2` → `2.0`), so `1/3`
//!   divides like a calculator instead of truncating
//! - **Assignment**: `name = expr` → `let name = (expr); name`, so the variable lands in
//!   the evaluation scope and the cell displays the assigned value
//!
//! Rewrites never touch text inside string literals.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Engineering unit suffixes and the exponent they stand for.
///
/// `meg` is listed before `m` so that `2meg` is mega, not milli.
pub const UNIT_SUFFIXES: &[(&str, i32)] = &[
    ("G", 9),
    ("M", 6),
    ("meg", 6),
    ("K", 3),
    ("k", 3),
    ("m", -3),
    ("u", -6),
    ("n", -9),
    ("p", -12),
];

fn unit_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([0-9]+(?:\.[0-9]+)?) *(meg|G|M|K|k|m|u|n|p)\b").expect("valid regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b([0-9]+)(\.[0-9]+)?(?:[eE]([+-]?[0-9]+))?\b").expect("valid regex")
    })
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^\s*([A-Za-z_][A-Za-z0-9_]*)\s*=([^=].*)$").expect("valid regex")
    })
}

fn suffix_exponent(suffix: &str) -> Option<i32> {
    UNIT_SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|(_, exp)| *exp)
}

/// Rewrite engineering unit suffixes into exponent notation.
pub fn expand_unit_suffixes(script: &str) -> String {
    map_outside_strings(script, |seg| {
        unit_suffix_re()
            .replace_all(seg, |caps: &Captures| match suffix_exponent(&caps[2]) {
                Some(exp) => format!("{}e{}", &caps[1], exp),
                None => caps[0].to_string(),
            })
            .to_string()
    })
}

/// Turn every numeric literal into a Rhai float literal.
pub fn normalize_numbers(script: &str) -> String {
    map_outside_strings(script, |seg| {
        number_re()
            .replace_all(seg, |caps: &Captures| {
                let int = &caps[1];
                let frac = caps.get(2).map(|m| m.as_str()).unwrap_or(".0");
                match caps.get(3) {
                    Some(exp) => format!("{}{}e{}", int, frac, exp.as_str().trim_start_matches('+')),
                    None => format!("{}{}", int, frac),
                }
            })
            .to_string()
    })
}

/// Rewrite the calculator's `^` power operator into Rhai's `**`.
pub fn rewrite_power(script: &str) -> String {
    map_outside_strings(script, |seg| seg.replace("**", "^").replace('^', "**"))
}

/// Rewrite a top-level `name = expr` into a scoped `let` binding that yields the value.
///
/// Comparisons (`a == b`) and anything that does not start with a bare identifier
/// are left untouched.
pub fn rewrite_assignment(script: &str) -> String {
    match assignment_re().captures(script) {
        Some(caps) => {
            let name = &caps[1];
            let expr = caps[2].trim().trim_end_matches(';');
            format!("let {name} = ({expr}); {name}")
        }
        None => script.to_string(),
    }
}

/// Full preprocessing pipeline applied to cell text before evaluation.
pub fn preprocess_expression(text: &str) -> String {
    let expanded = expand_unit_suffixes(text.trim());
    let powered = rewrite_power(&expanded);
    let normalized = normalize_numbers(&powered);
    rewrite_assignment(&normalized)
}

/// Apply `f` to every segment of `script` that lies outside a double-quoted string.
fn map_outside_strings<F>(script: &str, f: F) -> String
where
    F: Fn(&str) -> String,
{
    let bytes = script.as_bytes();
    let mut out = String::with_capacity(script.len());
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == b'"' && backslashes.is_multiple_of(2) {
                out.push_str(&script[seg_start..=i]);
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' {
            out.push_str(&f(&script[seg_start..i]));
            in_string = true;
            seg_start = i;
            backslashes = 0;
        }
        i += 1;
    }

    if seg_start < script.len() {
        if in_string {
            out.push_str(&script[seg_start..]);
        } else {
            out.push_str(&f(&script[seg_start..]));
        }
    }

    out
}
