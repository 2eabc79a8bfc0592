//! Name conversions between the registry's spellings.
//!
//! Registry type names are UpperCamel with optional trailing digit runs and
//! vendor tags (`AccessFlagBits2KHR`); enum value names are UPPER_SNAKE with
//! a `VK_` prefix. Everything here is ASCII by construction.

/// A type name split into its camel stem, trailing digit run, and trailing
/// all-capitals vendor tag. Any of `digits` and `vendor` may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameMatch<'a> {
    pub stem: &'a str,
    pub digits: &'a str,
    pub vendor: &'a str,
}

/// Splits a trailing vendor tag and digit run off `name`. Returns [`None`]
/// when nothing precedes them (the name is all capitals or all digits).
pub fn match_name(name: &str) -> Option<NameMatch<'_>> {
    let bytes = name.as_bytes();
    let mut end = bytes.len();
    let mut p = end;
    let mut vendor = "";
    while p > 0 {
        p -= 1;
        if !bytes[p].is_ascii_uppercase() {
            p += 1;
            vendor = &name[p..end];
            end = p;
            break;
        }
    }
    let mut digits = "";
    while p > 0 {
        p -= 1;
        if !bytes[p].is_ascii_digit() {
            p += 1;
            digits = &name[p..end];
            end = p;
            break;
        }
    }
    (p > 0).then(|| NameMatch {
        stem: &name[..p],
        digits,
        vendor,
    })
}

/// Appends the UPPER_SNAKE form of a camel-case string: an underscore goes
/// before every interior capital and digit run.
pub fn camel_to_upper_snake(name: &str, out: &mut String) {
    let bytes = name.as_bytes();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_uppercase() {
            if append_upper(out, &name[start..i]) {
                out.push('_');
            }
            out.push(c as char);
            i += 1;
            start = i;
        } else if c.is_ascii_digit() {
            if append_upper(out, &name[start..i]) {
                out.push('_');
            }
            start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            out.push_str(&name[start..i]);
            start = i;
        } else {
            i += 1;
        }
    }
    append_upper(out, &name[start..]);
}

fn append_upper(out: &mut String, run: &str) -> bool {
    if run.is_empty() {
        return false;
    }
    for c in run.bytes() {
        out.push(c.to_ascii_uppercase() as char);
    }
    true
}

/// Appends the lowerCamel form of an UPPER_SNAKE string: each `_`-delimited
/// token keeps its leading capital and lowercases the rest of a capitals
/// run; digit runs pass through.
pub fn upper_snake_to_lower_camel(name: &str, out: &mut String) {
    let bytes = name.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'_' {
            i += 1;
        } else if c.is_ascii_uppercase() {
            out.push(c as char);
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_uppercase() {
                i += 1;
            }
            for l in bytes[start..i].iter() {
                out.push(l.to_ascii_lowercase() as char);
            }
        } else if c.is_ascii_digit() {
            let start = i;
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            out.push_str(&name[start..i]);
        } else {
            out.push(c as char);
            i += 1;
        }
    }
}
