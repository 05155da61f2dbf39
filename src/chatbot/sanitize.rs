//! Strips markdown-like punctuation so replies read cleanly as speech.

use regex::Regex;
use std::sync::LazyLock;

/// Characters the speech engine would otherwise read aloud or stumble on.
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_~`#>\[\]()\-]").expect("markup pattern is valid"));

/// Remove `* _ ~ \` # > [ ] ( ) -` from `text`.
pub fn clean_text(text: &str) -> String {
    MARKUP.replace_all(text, "").into_owned()
}
