use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Renders the narrative markdown subset the backend emits: `#`–`###`
/// headings, `- ` bullets, `N. ` items, `**bold**`, `_italic_`, hard breaks.
pub fn to_lines(markdown: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for raw in markdown.lines() {
        let line = raw.trim_end_matches("  ").trim_end();
        if line.trim().is_empty() {
            lines.push(Line::default());
            continue;
        }

        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some((level, text)) = heading(trimmed) {
            let color = match level {
                1 => Color::Cyan,
                2 => Color::LightCyan,
                _ => Color::Yellow,
            };
            let style = Style::default().fg(color).add_modifier(Modifier::BOLD);
            lines.push(Line::from(
                inline_spans(text)
                    .into_iter()
                    .map(|s| Span::styled(s.content, style.patch(s.style)))
                    .collect::<Vec<_>>(),
            ));
            continue;
        }

        let pad = " ".repeat(indent);
        if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let mut spans = vec![Span::raw(format!("{pad}• "))];
            spans.extend(inline_spans(rest));
            lines.push(Line::from(spans));
            continue;
        }

        if let Some((num, rest)) = numbered(trimmed) {
            let mut spans = vec![Span::styled(
                format!("{pad}{num}. "),
                Style::default().fg(Color::DarkGray),
            )];
            spans.extend(inline_spans(rest));
            lines.push(Line::from(spans));
            continue;
        }

        let mut spans = Vec::new();
        if indent > 0 {
            spans.push(Span::raw(pad));
        }
        spans.extend(inline_spans(trimmed));
        lines.push(Line::from(spans));
    }
    lines
}

/// Plain text of the rendered lines; used for search and tests.
pub fn plain_text(lines: &[Line<'_>]) -> String {
    lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|s| s.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &line[hashes..];
    let text = rest.strip_prefix(' ')?;
    Some((hashes, text.trim()))
}

fn numbered(line: &str) -> Option<(&str, &str)> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix(". ")?;
    Some((&line[..digits], rest))
}

fn inline_spans(text: &str) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut buf = String::new();
    let mut bold = false;
    let mut italic = false;
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    let flush = |buf: &mut String, spans: &mut Vec<Span<'static>>, bold: bool, italic: bool| {
        if buf.is_empty() {
            return;
        }
        let mut style = Style::default();
        if bold {
            style = style.add_modifier(Modifier::BOLD);
        }
        if italic {
            style = style.add_modifier(Modifier::ITALIC);
        }
        spans.push(Span::styled(std::mem::take(buf), style));
    };

    while i < chars.len() {
        let c = chars[i];
        if c == '*' && chars.get(i + 1) == Some(&'*') {
            flush(&mut buf, &mut spans, bold, italic);
            bold = !bold;
            i += 2;
            continue;
        }
        // Underscores inside words (snake_case keys) stay literal.
        if c == '_' && is_emphasis_boundary(&chars, i) {
            flush(&mut buf, &mut spans, bold, italic);
            italic = !italic;
            i += 1;
            continue;
        }
        buf.push(c);
        i += 1;
    }
    flush(&mut buf, &mut spans, bold, italic);
    spans
}

fn is_emphasis_boundary(chars: &[char], i: usize) -> bool {
    let before = i.checked_sub(1).and_then(|j| chars.get(j));
    let after = chars.get(i + 1);
    let word = |c: Option<&char>| c.is_some_and(|c| c.is_alphanumeric());
    !(word(before) && word(after))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_and_bullets() {
        let lines = to_lines("### Macro Summary\n- Slate overview: 3 games.\n1. **Market Context** (score: 5.0)");
        let text = plain_text(&lines);
        assert_eq!(
            text,
            "Macro Summary\n• Slate overview: 3 games.\n1. Market Context (score: 5.0)"
        );
    }

    #[test]
    fn bold_span_is_styled() {
        let lines = to_lines("- **Risk Score:** 4");
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.content == "Risk Score:")
            .expect("bold span");
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn snake_case_is_not_italic() {
        let lines = to_lines("odds_games=3, player_trends=0");
        assert_eq!(plain_text(&lines), "odds_games=3, player_trends=0");
    }

    #[test]
    fn italic_metadata_line() {
        let lines = to_lines("_Generated: now • Model: template_");
        assert_eq!(plain_text(&lines), "Generated: now • Model: template");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::ITALIC));
    }
}
