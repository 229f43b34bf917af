//! Text normalization for speech synthesis.
//!
//! Turns the segmenter's raw chunk text into something a synthesis engine
//! reads well aloud: digit runs get thousands separators, pause markers
//! become commas, and ellipses collapse to a single pause. The whole
//! transform is idempotent — normalizing already-normalized text is a
//! no-op — so a chunk can safely pass through this function more than once.

use crate::segmenter::PAUSE_MARKER;

/// Digit runs longer than this get thousands separators.
const GROUPING_THRESHOLD: usize = 3;

/// Normalize one chunk of reply text for synthesis.
#[must_use]
pub fn normalize_for_speech(text: &str) -> String {
    let text = collapse_ellipses(text);
    let text = render_pause_markers(&text);
    let text = group_digit_runs(&text);
    collapse_spaces(&text)
}

/// Replace runs of two or more periods with a single spoken pause.
fn collapse_ellipses(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut dots = 0usize;
    for c in text.chars() {
        if c == '.' {
            dots += 1;
            continue;
        }
        flush_dots(&mut out, dots);
        dots = 0;
        out.push(c);
    }
    flush_dots(&mut out, dots);
    out
}

fn flush_dots(out: &mut String, dots: usize) {
    match dots {
        0 => {}
        1 => out.push('.'),
        _ => out.push_str(", "),
    }
}

/// Render segmenter pause markers as commas.
fn render_pause_markers(text: &str) -> String {
    text.replace(PAUSE_MARKER, ", ")
}

/// Insert `.` thousands separators into digit runs (es-ES convention), so
/// engines read "12.500" as a number instead of spelling digits.
///
/// Runs of up to three digits — including the groups this function itself
/// produces — are left alone, which is what makes the pass idempotent.
fn group_digit_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut run = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() {
            run.push(c);
            continue;
        }
        flush_digit_run(&mut out, &run);
        run.clear();
        out.push(c);
    }
    flush_digit_run(&mut out, &run);
    out
}

fn flush_digit_run(out: &mut String, run: &str) {
    if run.len() <= GROUPING_THRESHOLD {
        out.push_str(run);
        return;
    }
    let head = run.len() % 3;
    if head > 0 {
        out.push_str(&run[..head]);
    }
    for (i, group) in run[head..].as_bytes().chunks(3).enumerate() {
        if head > 0 || i > 0 {
            out.push('.');
        }
        // chunks of ASCII digits are valid UTF-8
        out.push_str(std::str::from_utf8(group).unwrap_or_default());
    }
}

/// Collapse whitespace runs to single spaces and trim the ends.
fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pause_marker_becomes_comma() {
        assert_eq!(
            normalize_for_speech("Hola mundo• ¿qué tal?"),
            "Hola mundo, ¿qué tal?"
        );
    }

    #[test]
    fn ellipsis_becomes_single_pause() {
        assert_eq!(normalize_for_speech("Claro... ahora mismo"), "Claro, ahora mismo");
    }

    #[test]
    fn single_period_is_preserved() {
        assert_eq!(normalize_for_speech("Listo. Algo más"), "Listo. Algo más");
    }

    #[test]
    fn long_digit_runs_are_grouped() {
        assert_eq!(normalize_for_speech("Tenemos 12500 clientes"), "Tenemos 12.500 clientes");
        assert_eq!(normalize_for_speech("1234567"), "1.234.567");
    }

    #[test]
    fn short_digit_runs_are_untouched() {
        assert_eq!(normalize_for_speech("a las 9 de 123"), "a las 9 de 123");
    }

    #[test]
    fn normalization_is_idempotent() {
        let inputs = [
            "Hola mundo• ¿qué tal?",
            "Claro... son 12500 euros",
            "Precio: 1234567... sí•",
            "  espacios   dobles  ",
            "8000",
            "",
        ];
        for input in inputs {
            let once = normalize_for_speech(input);
            let twice = normalize_for_speech(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }
}
