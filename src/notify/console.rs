//! Terminal rendering of notices.

use crate::models::Notice;
use crate::pipeline::NoticeObserver;

/// Render a notice list the way the terminal UI shows it.
///
/// New notices carry a `New!` badge; date and link go on an indented
/// second line when present.
pub fn render_notices(notices: &[Notice]) -> String {
    if notices.is_empty() {
        return "No notices found\n".to_string();
    }

    let mut out = String::new();
    for notice in notices {
        let badge = if notice.is_new { " [New!]" } else { "" };
        out.push_str(&notice.format("{id}. {title}"));
        out.push_str(badge);
        out.push('\n');

        let details: Vec<&str> = [notice.date.as_deref(), notice.link.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !details.is_empty() {
            out.push_str("   ");
            out.push_str(&details.join("  "));
            out.push('\n');
        }
    }
    out
}

/// Observer that prints new notices to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl NoticeObserver for ConsoleObserver {
    fn on_new_notices(&self, notices: &[Notice]) {
        print!("{}", render_notices(notices));
    }
}
