use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

const CODE_BG: Color = Color::Rgb(30, 30, 50);
const CODE_FG: Color = Color::Rgb(180, 220, 160);
const BOLD_FG: Color = Color::Rgb(240, 240, 255);
const DIM: Color = Color::Rgb(120, 120, 140);
const HEADING_FG: Color = Color::Rgb(100, 160, 255);
const LIST_BULLET: Color = Color::Rgb(140, 80, 255);
const INLINE_CODE_FG: Color = Color::Rgb(220, 180, 120);
const INLINE_CODE_BG: Color = Color::Rgb(35, 35, 55);

/// Render prose with light markdown: headings, bullets, fenced code and
/// inline `code`/**bold**. `base` styles ordinary text.
pub fn render_prose(text: &str, indent: &str, base: Style) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut in_fence = false;

    for raw_line in text.lines() {
        let trimmed = raw_line.trim_start();

        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            lines.push(Line::from(Span::styled(
                format!("{indent}  \u{2500}\u{2500}\u{2500}"),
                Style::default().fg(DIM),
            )));
            continue;
        }

        if in_fence {
            lines.push(Line::from(Span::styled(
                format!("{indent}  \u{2502} {raw_line}"),
                Style::default().fg(CODE_FG).bg(CODE_BG),
            )));
            continue;
        }

        if let Some(heading) = trimmed
            .strip_prefix("### ")
            .or_else(|| trimmed.strip_prefix("## "))
            .or_else(|| trimmed.strip_prefix("# "))
        {
            lines.push(Line::from(Span::styled(
                format!("{indent}{heading}"),
                Style::default()
                    .fg(HEADING_FG)
                    .add_modifier(Modifier::BOLD),
            )));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let mut spans = vec![Span::styled(
                format!("{indent}  \u{2022} "),
                Style::default().fg(LIST_BULLET),
            )];
            spans.extend(inline_spans(item, base));
            lines.push(Line::from(spans));
            continue;
        }

        // Plain prose keeps its own leading whitespace
        let mut spans = vec![Span::raw(indent.to_string())];
        spans.extend(inline_spans(raw_line, base));
        lines.push(Line::from(spans));
    }

    lines
}

/// A code fragment: a labelled box, body shown verbatim.
pub fn render_code(label: &str, body: &str, indent: &str) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        format!("{indent}\u{250C}\u{2500}\u{2500} {label} \u{2500}\u{2500}"),
        Style::default().fg(DIM),
    ))];
    for raw_line in body.lines() {
        lines.push(Line::from(Span::styled(
            format!("{indent}\u{2502} {raw_line}"),
            Style::default().fg(CODE_FG).bg(CODE_BG),
        )));
    }
    lines.push(Line::from(Span::styled(
        format!("{indent}\u{2514}\u{2500}\u{2500}\u{2500}"),
        Style::default().fg(DIM),
    )));
    lines
}

/// Split a line into spans for `code` and **bold** runs.
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_code = rest.find('`');
        let next_bold = rest.find("**");
        let (start, marker) = match (next_code, next_bold) {
            (Some(c), Some(b)) if b < c => (b, "**"),
            (Some(c), _) => (c, "`"),
            (None, Some(b)) => (b, "**"),
            (None, None) => break,
        };

        let after = &rest[start + marker.len()..];
        let Some(end) = after.find(marker) else {
            break;
        };

        if start > 0 {
            spans.push(Span::styled(rest[..start].to_string(), base));
        }
        let inner = after[..end].to_string();
        spans.push(if marker == "`" {
            Span::styled(
                format!(" {inner} "),
                Style::default().fg(INLINE_CODE_FG).bg(INLINE_CODE_BG),
            )
        } else {
            Span::styled(
                inner,
                base.fg(BOLD_FG).add_modifier(Modifier::BOLD),
            )
        });
        rest = &after[end + marker.len()..];
    }

    if !rest.is_empty() {
        spans.push(Span::styled(rest.to_string(), base));
    }
    spans
}

/// Render a spinner character based on tick count
pub fn spinner(tick: u64) -> &'static str {
    const FRAMES: &[&str] = &[
        "\u{280B}", "\u{2819}", "\u{2839}", "\u{2838}", "\u{283C}", "\u{2834}", "\u{2826}",
        "\u{2827}", "\u{2807}", "\u{280F}",
    ];
    FRAMES[(tick as usize) % FRAMES.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flatten(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_inline_code_and_bold() {
        let spans = inline_spans("call `main` **now** please", Style::default());
        let texts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(texts, vec!["call ", " main ", " ", "now", " please"]);
    }

    #[test]
    fn test_unclosed_marker_is_literal() {
        let spans = inline_spans("a `b", Style::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].content, "a `b");
    }

    #[test]
    fn test_code_box_keeps_markup() {
        let lines = render_code("c", "<b>x</b>\n&lt;", "");
        assert_eq!(lines.len(), 4);
        assert!(flatten(&lines[0]).contains(" c "));
        assert!(flatten(&lines[1]).ends_with("<b>x</b>"));
        assert!(flatten(&lines[2]).ends_with("&lt;"));
    }

    #[test]
    fn test_prose_headings_and_bullets() {
        let lines = render_prose("# Title\n- item\nplain", "  ", Style::default());
        assert_eq!(flatten(&lines[0]), "  Title");
        assert!(flatten(&lines[1]).contains("\u{2022} item"));
        assert_eq!(flatten(&lines[2]), "  plain");
    }

    #[test]
    fn test_prose_keeps_leading_indentation() {
        let lines = render_prose("steps:\n    indented\n  two **bold**", "  ", Style::default());
        assert_eq!(flatten(&lines[0]), "  steps:");
        assert_eq!(flatten(&lines[1]), "      indented");
        assert_eq!(flatten(&lines[2]), "    two bold");
    }
}
