//! Environment variable handling: `${VAR}` expansion inside config strings
//! and the `PACER_*` overrides applied on top of the file.

use std::env;

/// Overrides the executor delay, in milliseconds.
pub const DELAY_MS_VAR: &str = "PACER_DELAY_MS";
/// Overrides the delay policy (`start_to_start` or `finish_to_start`).
pub const POLICY_VAR: &str = "PACER_POLICY";
/// Overrides the config file location.
pub const CONFIG_PATH_VAR: &str = "PACER_CONFIG";

/// Replace every `${VAR}` with the value of `VAR` from the process environment.
///
/// Unset variables expand to the empty string. An unclosed `${` is kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    expand_with(value, |name| env::var(name).ok())
}

pub(crate) fn expand_with<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            // Unclosed: keep the remainder as written.
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        if !name.is_empty()
            && let Some(replacement) = lookup(name)
        {
            out.push_str(&replacement);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}
