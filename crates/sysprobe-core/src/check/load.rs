//! Load average parser for `/proc/loadavg` and `uptime` output.

use serde::{Deserialize, Serialize};

use super::CheckError;

/// The three load-average windows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Extracts the first three decimal figures from loadavg- or uptime-shaped
/// text, in left-to-right order.
///
/// Locales that print `1,04` instead of `1.04` are accepted; the comma is
/// normalized before parsing. Fewer than three decimal tokens is a
/// failure.
pub fn collect_load_average(text: &str) -> Result<LoadAverage, CheckError> {
    let figures = decimal_tokens(text);
    match figures.as_slice() {
        [one, five, fifteen, ..] => Ok(LoadAverage {
            one: *one,
            five: *five,
            fifteen: *fifteen,
        }),
        _ => Err(CheckError::Malformed(format!(
            "expected 3 load figures, found {}",
            figures.len()
        ))),
    }
}

/// Tokens of the form `digits[.,]digits`, comma normalized to a dot.
///
/// Integer tokens (user counts, PIDs, the `1/150` runnable field) carry no
/// separator and are deliberately not matched.
fn decimal_tokens(text: &str) -> Vec<f64> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len()
                && (bytes[i] == b'.' || bytes[i] == b',')
                && bytes[i + 1].is_ascii_digit()
            {
                i += 1;
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let token = text[start..i].replace(',', ".");
                if let Ok(v) = token.parse() {
                    out.push(v);
                }
            }
        } else {
            i += 1;
        }
    }
    out
}
