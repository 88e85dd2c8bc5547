//! Text normalization utilities to keep embeddings compact and relevant.
//!
//! Web-scraped documentation tends to carry runs of spaces, tabs and blank
//! lines; these are squeezed before the text is embedded.

use tracing::debug;

/// Normalize prose with minimal layout disruption.
///
/// - Collapses runs of spaces/tabs inside a line into one space.
/// - Trims each line.
/// - Collapses multiple blank lines into a single one.
/// - Stops at the last whole line that fits in `max_chars` characters; a
///   first line longer than that is cut on a char boundary.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    debug!("normalize_text: input_len={}", s.len());

    let mut out = String::with_capacity(s.len().min(max_chars));
    let mut out_chars = 0usize;
    let mut blank_run = 0usize;

    for raw in s.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");

        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }

        let line_chars = line.chars().count();
        if out_chars + line_chars + 1 > max_chars {
            if out.is_empty() {
                out = crate::record::clamp_snippet(&line, max_chars);
            }
            break;
        }

        out.push_str(&line);
        out.push('\n');
        out_chars += line_chars + 1;
    }

    out.trim_end().to_string()
}
