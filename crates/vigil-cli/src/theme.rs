//! Terminal styling.

use colored::Colorize;

const BOX_WIDTH: usize = 60;

pub(crate) struct Theme;

impl Theme {
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    pub(crate) fn separator() -> String {
        "━".repeat(BOX_WIDTH).dimmed().to_string()
    }

    /// A yellow box around a pending tool call.
    pub(crate) fn confirmation_box(title: &str, body: &str) -> String {
        let inner = BOX_WIDTH.saturating_sub(2);
        let text_width = BOX_WIDTH.saturating_sub(4);
        let pad = |text: &str| {
            let fill = text_width.saturating_sub(text.chars().count());
            format!("│ {text}{:fill$} │", "")
        };

        let rule = "─".repeat(inner);
        let mut lines = vec![format!("╭{rule}╮").as_str().yellow().to_string()];
        lines.push(pad(title).as_str().bold().to_string());
        lines.push(format!("│{:inner$}│", "").as_str().yellow().to_string());
        lines.extend(body.lines().map(pad));
        lines.push(format!("╰{rule}╯").as_str().yellow().to_string());
        lines.join("\n")
    }
}
