//! Script output: a `#` heading line followed by pretty-printed JSON.

use serde::Serialize;

pub fn heading(title: &str) {
    println!("{title}");
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints `title`, then `value`.
pub fn section<T: Serialize + ?Sized>(title: &str, value: &T) -> anyhow::Result<()> {
    heading(title);
    print_json(value)
}
