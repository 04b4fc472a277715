//! HTML extraction for listing pages, document pages, and the glossary.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

use crate::models::{extract_doc_id, normalize_relation_type, parse_site_date};

/// Relation groups on a document's relations tab.
const RELATION_GROUP_SELECTOR: &str = ".doc-relations .rel-group";
/// Heading inside a relation group naming the relation kind.
const RELATION_TITLE_SELECTOR: &str = ".rel-title";

/// A document link harvested from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestedLink {
    pub url: String,
    pub title: String,
    pub reported_date: Option<NaiveDate>,
}

/// A reference extracted from a document's relations tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRelation {
    pub relation_type: String,
    pub target_url: String,
    pub target_title: Option<String>,
}

/// A glossary entry extracted from a term listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub name: String,
    pub definition: String,
    pub url: String,
}

fn site_date_re() -> &'static Regex {
    static DATE: OnceLock<Regex> = OnceLock::new();
    DATE.get_or_init(|| Regex::new(r"\b(\d{2}/\d{2}/\d{4})\b").unwrap())
}

fn selector(s: &str) -> Selector {
    Selector::parse(s).unwrap()
}

/// Resolve an href against the page base, tolerating absolute links.
fn resolve_href(base: &str, href: &str) -> Option<String> {
    if href.trim().is_empty() {
        return None;
    }
    Url::parse(base).ok()?.join(href).ok().map(|u| u.to_string())
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Find the closest row-like ancestor of an anchor.
fn closest_row(element: ElementRef) -> Option<ElementRef> {
    for node in element.ancestors() {
        if let Some(ancestor) = ElementRef::wrap(node) {
            let name = ancestor.value().name();
            if matches!(name, "tr" | "li") || (name == "div" && ancestor.value().attr("class").is_some()) {
                return Some(ancestor);
            }
        }
    }
    None
}

/// Extract document links from a listing page.
///
/// Keeps only anchors whose target carries a document identifier,
/// deduplicated by URL. The site-reported update date is taken from the
/// first `DD/MM/YYYY` in the surrounding row, when present.
pub fn parse_listing(html: &str, base: &str) -> Vec<HarvestedLink> {
    let document = Html::parse_document(html);
    let anchors = selector("a[href]");

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_href(base, href) else {
            continue;
        };
        if extract_doc_id(&url).is_none() || !seen.insert(url.clone()) {
            continue;
        }

        let title = element_text(anchor);
        if title.is_empty() {
            continue;
        }

        let reported_date = closest_row(anchor)
            .map(element_text)
            .and_then(|text| {
                site_date_re()
                    .captures(&text)
                    .and_then(|c| parse_site_date(&c[1]))
            });

        links.push(HarvestedLink {
            url,
            title,
            reported_date,
        });
    }

    links
}

/// Extract the property table from a document detail page.
///
/// Rows with a label cell and a value cell become entries in the field
/// mapping, keyed by the label without its trailing colon. Only what the
/// page states about the document ends up here; fetch timestamps and
/// other volatile values never enter the mapping, since it feeds change
/// detection.
pub fn parse_document_fields(html: &str) -> Map<String, Value> {
    let document = Html::parse_document(html);
    let rows = selector("tr");
    let cells = selector("td");

    let mut fields = Map::new();
    for row in document.select(&rows) {
        let row_cells: Vec<ElementRef> = row.select(&cells).collect();
        if row_cells.len() < 2 {
            continue;
        }

        let label = element_text(row_cells[0]);
        let label = label.trim_end_matches(':').trim();
        let value = element_text(row_cells[1]);
        if label.is_empty() || value.is_empty() {
            continue;
        }

        fields.insert(label.to_string(), Value::String(value));
    }

    fields
}

/// Extract relation edges from a document's relations tab.
pub fn parse_relations(html: &str, base: &str) -> Vec<ExtractedRelation> {
    let document = Html::parse_document(html);
    let groups = selector(RELATION_GROUP_SELECTOR);
    let titles = selector(RELATION_TITLE_SELECTOR);
    let anchors = selector("a[href]");

    let mut relations = Vec::new();
    for group in document.select(&groups) {
        let Some(heading) = group.select(&titles).next().map(element_text) else {
            continue;
        };
        let relation_type = normalize_relation_type(&heading);
        if relation_type.is_empty() {
            continue;
        }

        for anchor in group.select(&anchors) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(target_url) = resolve_href(base, href) else {
                continue;
            };
            let title = element_text(anchor);

            relations.push(ExtractedRelation {
                relation_type: relation_type.clone(),
                target_url,
                target_title: (!title.is_empty()).then_some(title),
            });
        }
    }

    relations
}

/// Extract glossary entries from a term listing page.
///
/// Term anchors link to `?tab=0` detail pages; the definition is the
/// remaining text of the surrounding block, truncated the way the
/// catalog stores it.
pub fn parse_glossary(html: &str, base: &str) -> Vec<GlossaryEntry> {
    const DEFINITION_LIMIT: usize = 1000;

    let document = Html::parse_document(html);
    let anchors = selector("a[href*='tab=0']");

    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_href(base, href) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let name = element_text(anchor);
        if name.is_empty() {
            continue;
        }

        let definition = closest_row(anchor)
            .map(element_text)
            .map(|text| text.replacen(&name, "", 1).trim().to_string())
            .unwrap_or_default();
        let definition: String = definition.chars().take(DEFINITION_LIMIT).collect();

        entries.push(GlossaryEntry {
            name,
            definition,
            url,
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://example.vn";

    #[test]
    fn test_parse_listing_extracts_links_and_dates() {
        let html = r#"
            <table>
              <tr class="row">
                <td><a href="/van-ban/nghi-dinh-15-637214.aspx">Decree 15/2025</a></td>
                <td>10/01/2025</td>
              </tr>
              <tr class="row">
                <td><a href="/van-ban/thong-tu-2-637215.aspx">Circular 2/2025</a></td>
                <td>No date here</td>
              </tr>
              <tr><td><a href="/page/about.html">About</a></td></tr>
            </table>
        "#;

        let links = parse_listing(html, BASE);
        assert_eq!(links.len(), 2);
        assert_eq!(
            links[0].url,
            "https://example.vn/van-ban/nghi-dinh-15-637214.aspx"
        );
        assert_eq!(links[0].title, "Decree 15/2025");
        assert_eq!(
            links[0].reported_date,
            NaiveDate::from_ymd_opt(2025, 1, 10)
        );
        assert_eq!(links[1].reported_date, None);
    }

    #[test]
    fn test_parse_listing_dedupes_urls() {
        let html = r#"
            <div class="item"><a href="/doc-1.aspx">Doc</a></div>
            <div class="item"><a href="/doc-1.aspx">Doc again</a></div>
        "#;
        assert_eq!(parse_listing(html, BASE).len(), 1);
    }

    #[test]
    fn test_parse_document_fields() {
        let html = r#"
            <table>
              <tr><td>Số hiệu:</td><td>15/2025/ND-CP</td></tr>
              <tr><td>Loại văn bản:</td><td>Nghị định</td></tr>
              <tr><td>Tình trạng:</td><td>Còn hiệu lực</td></tr>
              <tr><td>Empty:</td><td></td></tr>
              <tr><td>single cell row</td></tr>
            </table>
        "#;

        let fields = parse_document_fields(html);
        assert_eq!(fields.len(), 3);
        assert_eq!(fields["Số hiệu"], "15/2025/ND-CP");
        assert_eq!(fields["Tình trạng"], "Còn hiệu lực");
        assert!(!fields.contains_key("Empty"));
    }

    #[test]
    fn test_parse_relations() {
        let html = r#"
            <div class="doc-relations">
              <div class="rel-group">
                <div class="rel-title">Amended by</div>
                <a href="/van-ban/nghi-dinh-99-637300.aspx">Decree 99</a>
                <a href="/van-ban/nghi-dinh-100-637301.aspx">Decree 100</a>
              </div>
              <div class="rel-group">
                <div class="rel-title">Replaces</div>
                <a href="/van-ban/nghi-dinh-1-600000.aspx">Old Decree</a>
              </div>
            </div>
        "#;

        let relations = parse_relations(html, BASE);
        assert_eq!(relations.len(), 3);
        assert_eq!(relations[0].relation_type, "amended_by");
        assert_eq!(
            relations[0].target_url,
            "https://example.vn/van-ban/nghi-dinh-99-637300.aspx"
        );
        assert_eq!(relations[0].target_title.as_deref(), Some("Decree 99"));
        assert_eq!(relations[2].relation_type, "replaces");
    }

    #[test]
    fn test_parse_relations_ignores_untitled_groups() {
        let html = r#"
            <div class="doc-relations">
              <div class="rel-group"><a href="/doc-1.aspx">Stray</a></div>
            </div>
        "#;
        assert!(parse_relations(html, BASE).is_empty());
    }

    #[test]
    fn test_parse_glossary() {
        let html = r#"
            <ul>
              <li><a href="/tnpl/an-le?tab=0">Án lệ</a>
                  Là vụ việc được lựa chọn làm khuôn mẫu.</li>
              <li><a href="/tnpl/an-le?tab=1">Other tab</a></li>
              <li><a href="/tnpl/bao-lanh?tab=0">Bảo lãnh</a>
                  Là việc người thứ ba cam kết thực hiện nghĩa vụ.</li>
            </ul>
        "#;

        let entries = parse_glossary(html, BASE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Án lệ");
        assert_eq!(entries[0].url, "https://example.vn/tnpl/an-le?tab=0");
        assert!(entries[0].definition.starts_with("Là vụ việc"));
        assert_eq!(entries[1].name, "Bảo lãnh");
    }

    #[test]
    fn test_parse_glossary_truncates_definition() {
        let long = "x".repeat(2000);
        let html = format!(
            r#"<li><a href="/tnpl/long?tab=0">Term</a> {long}</li>"#
        );
        let entries = parse_glossary(&html, BASE);
        assert_eq!(entries[0].definition.chars().count(), 1000);
    }
}
