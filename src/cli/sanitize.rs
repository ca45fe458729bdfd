use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

fn escape_sequences() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // CSI (ESC [ ... final), OSC (ESC ] ... BEL or ESC \), and two-byte ESC sequences
        Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)?|\x1b[@-_]")
            .expect("static regex")
    })
}

/// Strip terminal escape sequences and control characters from service text
/// before it reaches the terminal. Newlines and tabs are kept.
pub fn for_terminal(text: &str) -> Cow<'_, str> {
    let needs_cleaning = text
        .chars()
        .any(|c| c.is_control() && c != '\n' && c != '\t');
    if !needs_cleaning {
        return Cow::Borrowed(text);
    }
    let without_sequences = escape_sequences().replace_all(text, "");
    Cow::Owned(
        without_sequences
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect(),
    )
}
