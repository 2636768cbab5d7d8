//! core::naming
//!
//! Collision-avoiding name allocation for course entities.
//!
//! Every entity lives in a directory named by a short name and carries a
//! human-readable long name in its info file. Add and copy operations must
//! never reuse a name already taken by a sibling, so both allocation
//! algorithms scan the caller-supplied sibling name sets and increment a
//! numeric suffix past the highest one observed.
//!
//! # Algorithms
//!
//! - [`unique_names`] - allocate names for a newly added entity
//! - [`names_for_copy`] - allocate names for a copy of an existing entity
//!
//! # Example
//!
//! ```
//! use coursewright::core::naming::unique_names;
//!
//! let shorts = vec!["HW1".to_string()];
//! let longs = vec!["Homework 1".to_string()];
//!
//! // An explicit name with no collision is used as-is.
//! let pair = unique_names(&shorts, &longs, Some("HW2"), Some("Homework 2"));
//! assert_eq!(pair.short_name, "HW2");
//!
//! // A collision gets a numeric suffix.
//! let pair = unique_names(&shorts, &longs, Some("HW1"), Some("Homework 1"));
//! assert_eq!(pair.short_name, "HW1_2");
//! assert_eq!(pair.long_name, "Homework 1 (2)");
//! ```

/// Default base used when the caller does not supply explicit names.
const DEFAULT_NAME: &str = "New";

/// A short-name / long-name pair allocated for a new entity.
///
/// Invariant: neither name equals any element of the existing-name sets
/// that were passed to the allocating function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePair {
    /// Directory-safe short name.
    pub short_name: String,
    /// Human-readable long name stored in the info file.
    pub long_name: String,
}

/// Match an existing short name against a base: exact (case-insensitive)
/// equality counts as suffix 1, and `{base}_{N}` yields N.
fn short_suffix(existing: &str, base: &str) -> Option<u64> {
    let existing = existing.to_lowercase();
    let base = base.to_lowercase();
    if existing == base {
        return Some(1);
    }
    let rest = existing.strip_prefix(&format!("{base}_"))?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Match an existing long name against a base: exact (case-sensitive)
/// equality counts as suffix 1, and `{base} ({N})` yields N.
fn long_suffix(existing: &str, base: &str) -> Option<u64> {
    if existing == base {
        return Some(1);
    }
    let rest = existing.strip_prefix(&format!("{base} ("))?;
    let digits = rest.strip_suffix(')')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Match an existing short name against `{base}_copyN`.
fn copy_short_suffix(existing: &str, base: &str) -> Option<u64> {
    let rest = existing.strip_prefix(&format!("{base}_copy"))?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Match an existing long name against `{base} (copy N)`.
fn copy_long_suffix(existing: &str, base: &str) -> Option<u64> {
    let rest = existing.strip_prefix(&format!("{base} (copy "))?;
    let digits = rest.strip_suffix(')')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Allocate a unique name pair for a newly added entity.
///
/// The numeric suffix is determined independently on each axis: the short
/// axis matches case-insensitively against exact equality or `{base}_{N}`,
/// the long axis matches case-sensitively against exact equality or
/// `{base} ({N})`. On each axis the counter is one past the highest suffix
/// observed (exact equality counts as 1), or 1 when nothing matches. The
/// larger of the two counters wins.
///
/// When the resulting number is 1 and the caller supplied explicit names
/// (`Some(..)` rather than the anonymous default), the explicit names are
/// returned unsuffixed. This avoids an ugly `_1` on the very first use of
/// a chosen name, while the anonymous default is numbered from its first
/// instance.
pub fn unique_names(
    short_names: &[String],
    long_names: &[String],
    short_name: Option<&str>,
    long_name: Option<&str>,
) -> NamePair {
    let explicit = short_name.is_some() || long_name.is_some();
    let short_base = short_name.unwrap_or(DEFAULT_NAME);
    let long_base = long_name.unwrap_or(DEFAULT_NAME);

    let short_counter = short_names
        .iter()
        .filter_map(|n| short_suffix(n, short_base))
        .max()
        .map_or(1, |max| max + 1);
    let long_counter = long_names
        .iter()
        .filter_map(|n| long_suffix(n, long_base))
        .max()
        .map_or(1, |max| max + 1);

    let number = short_counter.max(long_counter);
    if number == 1 && explicit {
        return NamePair {
            short_name: short_base.to_string(),
            long_name: long_base.to_string(),
        };
    }
    NamePair {
        short_name: format!("{short_base}_{number}"),
        long_name: format!("{long_base} ({number})"),
    }
}

/// Allocate a name pair for a copy of an existing entity.
///
/// A trailing `_copyN` (short) or ` (copy N)` (long) suffix on the source
/// names is stripped first, so a copy of a copy numbers from the same base
/// rather than nesting suffixes. A source without a usable long name falls
/// back to the base `Unknown`.
///
/// Never returns a name present in either input set: the counter on each
/// axis is one past the highest `_copyN` / ` (copy N)` suffix observed.
pub fn names_for_copy(
    old_short_name: &str,
    short_names: &[String],
    old_long_name: Option<&str>,
    long_names: &[String],
) -> NamePair {
    let short_base = strip_copy_short(old_short_name);
    let long_base = old_long_name.map_or("Unknown", strip_copy_long);

    let short_counter = short_names
        .iter()
        .filter_map(|n| copy_short_suffix(n, short_base))
        .max()
        .map_or(1, |max| max + 1);
    let long_counter = long_names
        .iter()
        .filter_map(|n| copy_long_suffix(n, long_base))
        .max()
        .map_or(1, |max| max + 1);

    let number = short_counter.max(long_counter);
    NamePair {
        short_name: format!("{short_base}_copy{number}"),
        long_name: format!("{long_base} (copy {number})"),
    }
}

/// Strip a trailing `_copyN` suffix, if present.
fn strip_copy_short(name: &str) -> &str {
    if let Some(idx) = name.rfind("_copy") {
        let digits = &name[idx + "_copy".len()..];
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return &name[..idx];
        }
    }
    name
}

/// Strip a trailing ` (copy N)` suffix, if present.
fn strip_copy_long(name: &str) -> &str {
    if let Some(idx) = name.rfind(" (copy ") {
        let rest = &name[idx + " (copy ".len()..];
        if let Some(digits) = rest.strip_suffix(')') {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) && idx + " (copy ".len() + digits.len() + 1 == name.len() {
                return &name[..idx];
            }
        }
    }
    name
}
