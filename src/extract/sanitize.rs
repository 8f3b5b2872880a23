//! Text cleanup applied once to every extracted body
//!
//! Pages scanned from old typewritten sources carry footnote markers, rows of
//! asterisks between chapters, stray control bytes and typographic artifacts.
//! The output is a flat single-line field, so line breaks become spaces.

use regex::Regex;
use std::sync::LazyLock;

/// C0 and C1 control characters
static CONTROL_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x00-\x1F\x7F-\x9F]").expect("hardcoded regex pattern is valid")
});

/// Short square-bracketed annotations such as footnote markers (`[1]`, `[прим. ред.]`)
static ANNOTATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\[\]]{0,200}\]").expect("hardcoded regex pattern is valid")
});

/// Decorative runs of three or more asterisks
static DECORATIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*{3,}").expect("hardcoded regex pattern is valid")
});

const NO_BREAK_SPACE: char = '\u{a0}';
const SOFT_HYPHEN: char = '\u{ad}';

/// Removes markup noise from extracted text
///
/// Each line break (`\r\n`, `\n` or a lone `\r`), tab and non-breaking space
/// becomes one plain space; soft
/// hyphens, control characters, bracketed annotations and asterisk runs are
/// removed. Removal repeats until nothing changes (removing `[1]` from
/// `[a[1]b]` exposes `[ab]`), then the ends are trimmed. Internal spacing is
/// otherwise left as is, so `sanitize(sanitize(x)) == sanitize(x)`.
///
/// # Examples
///
/// ```
/// use text_harvest::sanitize;
///
/// assert_eq!(
///     sanitize("Глава 1. Тест. [1] Сноска ***"),
///     "Глава 1. Тест.  Сноска"
/// );
/// ```
pub fn sanitize(text: &str) -> String {
    let mut current: String = text
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| *c != SOFT_HYPHEN)
        .map(|c| match c {
            '\r' | '\n' | '\t' | NO_BREAK_SPACE => ' ',
            other => other,
        })
        .collect();

    loop {
        let without_controls = CONTROL_CHARS.replace_all(&current, "");
        let without_annotations = ANNOTATIONS.replace_all(&without_controls, "");
        let next = DECORATIONS
            .replace_all(&without_annotations, "")
            .into_owned();

        if next == current {
            break;
        }
        current = next;
    }

    current.trim().to_string()
}
