//! Special key sequences for typed text
//!
//! Typed text may embed `{name}` sequences (`{enter}`, `{esc}`, ...). They are
//! expanded to the Unicode private-use code points WebDriver reserves for
//! keyboard keys. `{{}` types a literal `{`.

use crate::common::{Error, Result};

pub const ENTER: char = '\u{E007}';
pub const ESCAPE: char = '\u{E00C}';
pub const BACKSPACE: char = '\u{E003}';
pub const DELETE: char = '\u{E017}';
pub const TAB: char = '\u{E004}';
pub const HOME: char = '\u{E011}';
pub const END: char = '\u{E010}';
pub const LEFT: char = '\u{E012}';
pub const UP: char = '\u{E013}';
pub const RIGHT: char = '\u{E014}';
pub const DOWN: char = '\u{E015}';
pub const CONTROL: char = '\u{E009}';
/// Releases all held modifier keys
pub const NULL: char = '\u{E000}';

/// Map a `{name}` sequence to the code points it types
fn special_key(name: &str) -> Option<&'static [char]> {
    let keys: &'static [char] = match name.to_lowercase().as_str() {
        "enter" => &[ENTER],
        "esc" => &[ESCAPE],
        "backspace" => &[BACKSPACE],
        "del" => &[DELETE],
        "tab" => &[TAB],
        "home" => &[HOME],
        "end" => &[END],
        "leftarrow" => &[LEFT],
        "rightarrow" => &[RIGHT],
        "uparrow" => &[UP],
        "downarrow" => &[DOWN],
        "selectall" => &[CONTROL, 'a', NULL],
        "{" => &['{'],
        _ => return None,
    };
    Some(keys)
}

/// Expand special key sequences in typed text
///
/// A `{` without a closing `}` is typed literally.
pub fn expand(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        // `{{}` closes at the second brace, not the first
        let close = if after.starts_with('{') {
            after[1..].find('}').map(|i| i + 1)
        } else {
            after.find('}')
        };

        match close {
            Some(end) => {
                let name = &after[..end];
                let keys = special_key(name).ok_or_else(|| Error::UnknownKey(name.to_string()))?;
                out.extend(keys.iter());
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}
