//! Notice data structure.

use serde::{Deserialize, Serialize};

/// A notice extracted from the examination schedule table.
///
/// Notices are rebuilt from scratch on every poll; `id` is the row position
/// and is not stable across polls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// 1-based row index after the header row
    pub id: usize,

    /// Notice title (never empty)
    pub title: String,

    /// Body text; the source page does not expose it inline
    pub content: String,

    /// Absolute URL of the attachment, or the raw href if it did not resolve
    pub link: Option<String>,

    /// Set by the novelty tracker
    pub is_new: bool,

    /// Publication date as printed on the page
    pub date: Option<String>,
}

impl Notice {
    /// Create a notice as the extractor emits it.
    pub fn new(id: usize, title: impl Into<String>, link: Option<String>) -> Self {
        Self {
            id,
            title: title.into(),
            content: String::new(),
            link,
            is_new: false,
            date: None,
        }
    }

    /// Format notice for display using a template.
    ///
    /// Supported placeholders: `{id}`, `{title}`, `{link}`, `{date}`.
    /// Absent fields render as empty strings.
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id.to_string())
            .replace("{title}", &self.title)
            .replace("{link}", self.link.as_deref().unwrap_or(""))
            .replace("{date}", self.date.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_notice() -> Notice {
        Notice {
            id: 1,
            title: "B.Tech odd semester schedule".to_string(),
            content: String::new(),
            link: Some("https://mmmut.ac.in/News_content/150520259100.pdf".to_string()),
            is_new: true,
            date: Some("12/11/2024".to_string()),
        }
    }

    #[test]
    fn test_format() {
        let notice = sample_notice();
        let result = notice.format("[{date}] {title}");
        assert_eq!(result, "[12/11/2024] B.Tech odd semester schedule");
    }

    #[test]
    fn test_format_missing_fields() {
        let notice = Notice::new(3, "Re-exam notice", None);
        assert_eq!(notice.format("{id}|{link}|{date}"), "3||");
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(sample_notice()).unwrap();
        assert_eq!(json["isNew"], true);
        assert_eq!(json["content"], "");
    }
}
