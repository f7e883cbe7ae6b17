// src/services/notices.rs

//! Notice extraction service.
//!
//! Turns the examination schedule page into an ordered list of notices.
//! Row order is preserved; the page lists the newest notice first.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Notice, SourceConfig};
use crate::utils::resolve_url;

/// Parser for the notice table of the examination page.
#[derive(Debug, Clone)]
pub struct NoticeExtractor {
    base_url: Url,
    table_sel: Selector,
    row_sel: Selector,
    cell_sel: Selector,
    label_sel: Selector,
    anchor_sel: Selector,
}

impl NoticeExtractor {
    /// Create an extractor for the table with the given `id` attribute.
    pub fn new(base_url: &str, table_id: &str) -> Result<Self> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            table_sel: Self::parse_selector(&format!("#{}", table_id.trim()))?,
            row_sel: Self::parse_selector("tr")?,
            cell_sel: Self::parse_selector("td")?,
            label_sel: Self::parse_selector("span")?,
            anchor_sel: Self::parse_selector("a")?,
        })
    }

    /// Create an extractor from the `[source]` configuration section.
    pub fn from_config(source: &SourceConfig) -> Result<Self> {
        Self::new(&source.base_url, &source.table_id)
    }

    /// Extract notices from raw page HTML.
    ///
    /// A missing table yields an empty list. Rows whose first cell lacks a
    /// label or an anchor, or whose label is blank, are skipped without
    /// shifting the ids of later rows.
    pub fn extract(&self, html: &str) -> Vec<Notice> {
        let document = Html::parse_document(html);

        let Some(table) = document.select(&self.table_sel).next() else {
            log::warn!("Notice table not found");
            return Vec::new();
        };

        let rows: Vec<ElementRef> = table.select(&self.row_sel).collect();
        log::debug!("Found {} rows", rows.len());

        rows.iter()
            .enumerate()
            .skip(1)
            .filter_map(|(id, row)| self.parse_notice_row(id, row))
            .collect()
    }

    fn parse_notice_row(&self, id: usize, row: &ElementRef) -> Option<Notice> {
        let mut cells = row.select(&self.cell_sel);
        let first_cell = cells.next()?;

        let label = first_cell.select(&self.label_sel).next()?;
        let anchor = first_cell.select(&self.anchor_sel).next()?;

        let title = label.text().collect::<String>().trim().to_string();
        if title.is_empty() {
            return None;
        }

        let link = anchor
            .value()
            .attr("href")
            .map(|href| resolve_url(&self.base_url, href));

        let date = cells
            .next()
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        Some(Notice {
            date,
            ..Notice::new(id, title, link)
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE_ID: &str = "ContentPlaceHolder2_ContentPlaceHolder3_GridView1";

    fn extractor() -> NoticeExtractor {
        NoticeExtractor::new("https://mmmut.ac.in/", TABLE_ID).unwrap()
    }

    fn page(rows: &str) -> String {
        format!(
            r#"<html><body>
            <table id="{TABLE_ID}">
              <tr><th>Title</th><th>Date</th></tr>
              {rows}
            </table>
            </body></html>"#
        )
    }

    #[test]
    fn test_parse_selector_invalid() {
        assert!(NoticeExtractor::parse_selector("[[invalid").is_err());
        assert!(NoticeExtractor::new("https://mmmut.ac.in/", "a[").is_err());
    }

    #[test]
    fn test_extracts_rows_in_document_order() {
        let html = page(
            r#"
            <tr><td><span> Even semester schedule </span><a href="News_content/150520259100.pdf">View</a></td><td>12/11/2024</td></tr>
            <tr><td><span>Back paper notice</span><a href="/News_content/150520259050.pdf">View</a></td><td></td></tr>
            "#,
        );

        let notices = extractor().extract(&html);
        assert_eq!(notices.len(), 2);

        assert_eq!(notices[0].id, 1);
        assert_eq!(notices[0].title, "Even semester schedule");
        assert_eq!(
            notices[0].link.as_deref(),
            Some("https://mmmut.ac.in/News_content/150520259100.pdf")
        );
        assert_eq!(notices[0].date.as_deref(), Some("12/11/2024"));
        assert_eq!(notices[0].content, "");
        assert!(!notices[0].is_new);

        assert_eq!(notices[1].id, 2);
        assert_eq!(notices[1].date, None);
    }

    #[test]
    fn test_missing_table_yields_empty() {
        let notices = extractor().extract("<html><body><p>Maintenance</p></body></html>");
        assert!(notices.is_empty());
    }

    #[test]
    fn test_rows_without_label_or_anchor_are_skipped() {
        let html = page(
            r#"
            <tr><td><a href="1.pdf">No label</a></td></tr>
            <tr><td><span>No anchor</span></td></tr>
            <tr><td><span>   </span><a href="2.pdf">Blank label</a></td></tr>
            "#,
        );

        assert!(extractor().extract(&html).is_empty());
    }

    #[test]
    fn test_ids_keep_row_positions() {
        let html = page(
            r#"
            <tr><td><span>No anchor</span></td></tr>
            <tr><td><span>Kept</span><a href="3.pdf">View</a></td></tr>
            "#,
        );

        let notices = extractor().extract(&html);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].id, 2);
    }

    #[test]
    fn test_anchor_without_href_has_no_link() {
        let html = page(r#"<tr><td><span>Untitled</span><a>View</a></td></tr>"#);

        let notices = extractor().extract(&html);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].link, None);
    }

    #[test]
    fn test_unresolvable_href_is_kept_raw() {
        let html = page(r#"<tr><td><span>Odd link</span><a href="http://[::1">View</a></td></tr>"#);

        let notices = extractor().extract(&html);
        assert_eq!(notices[0].link.as_deref(), Some("http://[::1"));
    }

    #[test]
    fn test_header_only_table() {
        assert!(extractor().extract(&page("")).is_empty());
    }
}
