//! `${name}` substitution of scenario constants

use std::collections::BTreeMap;

use crate::common::{Error, Result};

/// Replace every `${name}` in `input` with its value from `vars`
///
/// `$${` produces a literal `${`. Values are inserted verbatim and are not
/// themselves expanded.
pub fn interpolate(input: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let end = after.find('}').ok_or_else(|| {
                Error::ScenarioInvalid(format!("Unterminated '${{' in '{}'", input))
            })?;
            let name = after[..end].trim();
            let value = vars
                .get(name)
                .ok_or_else(|| Error::UndefinedVariable(name.to_string()))?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);

    Ok(out)
}
