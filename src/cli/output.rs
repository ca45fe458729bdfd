use std::fmt::Write as _;

use super::sanitize::for_terminal;
use crate::render::{Entry, ProseStyle, RenderFragment};

const RESET: &str = "\x1b[0m";
const BOLD_GREEN: &str = "\x1b[1;32m";
const BOLD_MAGENTA: &str = "\x1b[1;35m";
const CYAN: &str = "\x1b[36m";
const DIM: &str = "\x1b[90m";
const ITALIC_DIM: &str = "\x1b[3;90m";
const YELLOW: &str = "\x1b[33m";

pub fn print_note(msg: &str) {
    eprintln!("  {DIM}{msg}{RESET}");
}

pub fn print_warning(msg: &str) {
    eprintln!("  {YELLOW}\u{26A0} {msg}{RESET}");
}

fn paint(text: &str, code: &str, color: bool) -> String {
    if color {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Plain-text rendition of one fragment. Bodies are sanitized but otherwise
/// shown as received.
pub fn format_fragment(fragment: &RenderFragment, color: bool) -> String {
    let mut out = String::new();
    match fragment {
        RenderFragment::Prose { style, body } => {
            let body = for_terminal(body);
            match style {
                ProseStyle::Plain => out.push_str(&body),
                ProseStyle::Reasoning => {
                    let _ = writeln!(out, "{}", paint("Reasoning:", DIM, color));
                    out.push_str(&paint(&body, ITALIC_DIM, color));
                }
            }
        }
        RenderFragment::Code { body, .. } => {
            let _ = writeln!(
                out,
                "{}",
                paint(&format!("--- {} ---", fragment.label()), DIM, color)
            );
            out.push_str(&paint(&for_terminal(body), CYAN, color));
            let _ = write!(out, "\n{}", paint("---", DIM, color));
        }
        RenderFragment::Image { url, caption } => {
            let _ = write!(
                out,
                "{} {}",
                paint(&format!("[{}]", for_terminal(caption)), BOLD_MAGENTA, color),
                for_terminal(url)
            );
        }
        RenderFragment::Greeting { body } => {
            out.push_str(&paint(&for_terminal(body), BOLD_MAGENTA, color));
        }
    }
    out
}

/// Transcript entries as text, separated by blank lines. Placeholders are not
/// printed.
pub fn format_entries(entries: &[Entry], color: bool) -> String {
    let mut blocks: Vec<String> = Vec::new();
    for entry in entries {
        match entry {
            Entry::User { text, attachment } => {
                let mut s = paint("You:", BOLD_GREEN, color);
                if let Some(text) = text {
                    let _ = write!(s, " {}", for_terminal(text));
                }
                if let Some(name) = attachment {
                    let _ = write!(
                        s,
                        " {}",
                        paint(&format!("[attached: {}]", for_terminal(name)), DIM, color)
                    );
                }
                blocks.push(s);
            }
            Entry::Assistant { fragments, .. } => {
                blocks.extend(fragments.iter().map(|f| format_fragment(f, color)));
            }
            Entry::Placeholder(_) => {}
        }
    }
    blocks.join("\n\n")
}
