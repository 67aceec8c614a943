//! HTML extraction. Raw page text in, rows of text cells (or `Content`) out.
//!
//! Selectors follow the page layouts positionally; when a site changes its
//! markup, this is the only file that should need to move.

use crate::error::{FetchError, Result};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::cleaner::squash_whitespace;

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| FetchError::Content(format!("selector {}: {:?}", s, e)))
}

/// Text of `el`, leaving out anything inside a descendant `<skip>` element.
fn text_without(el: ElementRef<'_>, skip: &str) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != el.id())
            .any(|a| a.value().as_element().is_some_and(|e| e.name() == skip));
        if !hidden {
            out.push_str(text);
        }
    }
    out
}

fn has_child_element(el: ElementRef<'_>, name: &str) -> bool {
    el.children()
        .filter_map(ElementRef::wrap)
        .any(|c| c.value().name() == name)
}

// ── Quote page signature ──────────────────────────────────────────────────────

/// A live quote page carries both the investing nav and the investing content
/// regions directly under the body container.
pub fn has_quote_page_signature(html: &str) -> bool {
    let doc = Html::parse_document(html);
    let (Ok(nav), Ok(content)) = (
        selector("div#yfi_bd > div#yfi_investing_nav"),
        selector("div#yfi_bd > div#yfi_investing_content"),
    ) else {
        return false;
    };
    doc.select(&nav).next().is_some() && doc.select(&content).next().is_some()
}

// ── Financial statements ──────────────────────────────────────────────────────

/// Rows of the statement table: first cell is the line-item label, the rest are
/// one value per period. Spacer cells are dropped, title-only rows skipped.
pub fn parse_report_rows(html: &str) -> Result<Vec<Vec<String>>> {
    let doc = Html::parse_document(html);
    let tr_sel = selector(
        "table.yfnc_tabledata1 table > tbody > tr, table.yfnc_tabledata1 table > tr",
    )?;

    let items: Vec<ElementRef<'_>> = doc.select(&tr_sel).collect();
    if items.is_empty() {
        return Err(FetchError::no_content());
    }

    let mut rows = Vec::new();
    for tr in items {
        let cells: Vec<String> = tr
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| matches!(c.value().name(), "td" | "th"))
            .filter(|c| !has_child_element(*c, "spacer"))
            .map(|c| squash_whitespace(&c.text().collect::<String>()))
            .collect();

        if cells.len() < 2 {
            continue;
        }
        rows.push(cells);
    }

    debug!("statement table: {} rows", rows.len());
    Ok(rows)
}

// ── Key statistics ────────────────────────────────────────────────────────────

/// `(label, value)` pairs matched by position; `<font>` footnote markers removed.
pub fn parse_key_statistics(html: &str) -> Result<Vec<(String, String)>> {
    let doc = Html::parse_document(html);
    let head_sel = selector("td.yfnc_tablehead1")?;
    let data_sel = selector("td.yfnc_tabledata1")?;

    let heads: Vec<ElementRef<'_>> = doc.select(&head_sel).collect();
    if heads.is_empty() {
        return Err(FetchError::no_content());
    }
    let data: Vec<ElementRef<'_>> = doc.select(&data_sel).collect();

    let pairs = heads
        .iter()
        .enumerate()
        .map(|(i, head)| {
            let label = squash_whitespace(&text_without(*head, "font")).replacen(':', "", 1);
            let value = data
                .get(i)
                .map(|d| squash_whitespace(&text_without(*d, "font")))
                .unwrap_or_default();
            (label, value)
        })
        .collect();

    Ok(pairs)
}

// ── Treasury yields ───────────────────────────────────────────────────────────

/// Yield cell (second column) of the `row`-th treasury row, 1-based.
pub fn parse_treasury_yield(html: &str, row: usize) -> Result<String> {
    let doc = Html::parse_document(html);
    let sel = selector(&format!(
        "table.yfirttbl > tbody > tr:nth-child({}) > td:nth-child(2)",
        row
    ))?;

    doc.select(&sel)
        .next()
        .map(|td| squash_whitespace(&td.text().collect::<String>()))
        .ok_or_else(|| FetchError::Content(format!("no treasury yield in row {}", row)))
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const QUOTE_PAGE: &str = r#"<html><body>
        <div id="yfi_bd">
          <div id="yfi_investing_nav">nav</div>
          <div id="yfi_investing_content">content</div>
        </div></body></html>"#;

    pub const LOOKUP_PAGE: &str = r#"<html><body>
        <div id="yfi_bd"><div id="yfi_sym_lookup">There are no results</div></div>
        </body></html>"#;

    pub const CASH_FLOW: &str = r#"<html><body>
      <table class="yfnc_tabledata1"><tr><td>
        <table>
          <tr><td colspan="4"><b>Cash Flow</b></td></tr>
          <tr><td>Period Ending</td><td>Dec 31, 2014</td><td>Dec 31, 2013</td></tr>
          <tr><td><spacer></spacer></td><td>Net Income</td><td>(241,000)</td><td>274,000</td></tr>
          <tr><td>Depreciation</td><td>4,746,000</td><td>-</td></tr>
        </table>
      </td></tr></table></body></html>"#;

    pub const KEY_STATS: &str = r#"<html><body><table>
      <tr><td class="yfnc_tablehead1">Market Cap (intraday)<font>5</font>:</td>
          <td class="yfnc_tabledata1">178.25B</td></tr>
      <tr><td class="yfnc_tablehead1">Trailing P/E (ttm, intraday):</td>
          <td class="yfnc_tabledata1">N/A</td></tr>
      <tr><td class="yfnc_tablehead1">Profit Margin (ttm):</td>
          <td class="yfnc_tabledata1">-0.27%</td></tr>
    </table></body></html>"#;

    pub const BONDS: &str = r#"<html><body><table class="yfirttbl"><tbody>
      <tr><td>3 Month</td><td>0.02</td></tr>
      <tr><td>6 Month</td><td>0.07</td></tr>
      <tr><td>2 Year</td><td>0.61</td></tr>
      <tr><td>3 Year</td><td>0.98</td></tr>
      <tr><td>5 Year</td><td>1.52</td></tr>
      <tr><td>10 Year</td><td>2.11</td></tr>
      <tr><td>30 Year</td><td>2.70</td></tr>
    </tbody></table></body></html>"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn quote_page_signature_requires_both_regions() {
        assert!(has_quote_page_signature(QUOTE_PAGE));
        assert!(!has_quote_page_signature(LOOKUP_PAGE));
        assert!(!has_quote_page_signature(""));
    }

    #[test]
    fn report_rows_skip_spacers_and_titles() {
        let rows = parse_report_rows(CASH_FLOW).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["Period Ending", "Dec 31, 2014", "Dec 31, 2013"]);
        assert_eq!(rows[1], vec!["Net Income", "(241,000)", "274,000"]);
        assert_eq!(rows[2][0], "Depreciation");
    }

    #[test]
    fn report_without_table_is_content_error() {
        let err = parse_report_rows("<html><body><p>There is no data</p></body></html>")
            .unwrap_err();
        assert_eq!(err, FetchError::no_content());
    }

    #[test]
    fn key_statistics_drop_font_and_colon() {
        let pairs = parse_key_statistics(KEY_STATS).unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("Market Cap (intraday)".to_string(), "178.25B".to_string()));
        assert_eq!(pairs[1].0, "Trailing P/E (ttm, intraday)");
        assert_eq!(pairs[1].1, "N/A");
    }

    #[test]
    fn key_statistics_missing_is_content_error() {
        assert!(matches!(
            parse_key_statistics("<html></html>"),
            Err(FetchError::Content(_))
        ));
    }

    #[test]
    fn treasury_yield_by_row() {
        assert_eq!(parse_treasury_yield(BONDS, 6).unwrap(), "2.11");
        assert_eq!(parse_treasury_yield(BONDS, 1).unwrap(), "0.02");
        assert!(parse_treasury_yield("<table></table>", 3).is_err());
    }
}
