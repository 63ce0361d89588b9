//! Per-item metadata extraction from a fully loaded profile page.
//!
//! Every field is resolved by an ordered list of lookups against the item's
//! markup. The page markup changes often, so statistics go through two
//! tiers: icon classification of count elements first, then positional
//! emphasized text, which overrides likes and comments whenever an item has
//! at least two emphasized nodes.

use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::config::Markup;
use crate::error::{Result, ScrapeError};
use crate::types::{FieldTrace, ItemRecord, Stat, StatSource, TitleSource};

struct Selectors {
    item: Selector,
    link: Selector,
    image: Selector,
    titles: Vec<(TitleSource, Selector)>,
    count: Selector,
    icon: Selector,
    emphasis: Selector,
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::Config(format!("invalid selector {css}: {e:?}")))
}

/// Maps item markup to `ItemRecord`s.
pub struct Extractor {
    selectors: Selectors,
}

/// Items kept and dropped by one extraction pass.
#[derive(Debug)]
pub struct Extraction {
    pub records: Vec<ItemRecord>,
    /// Item elements found in the page, including skipped ones.
    pub seen: usize,
    pub skipped: Vec<ScrapeError>,
}

impl Extractor {
    pub fn new(markup: &Markup) -> Result<Self> {
        let title_sources = [TitleSource::Description, TitleSource::LegacyCaption];
        let titles = markup
            .titles
            .iter()
            .enumerate()
            .map(|(i, css)| {
                let source = title_sources
                    .get(i)
                    .copied()
                    .unwrap_or(TitleSource::LegacyCaption);
                parse_selector(css).map(|sel| (source, sel))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selectors: Selectors {
                item: parse_selector(&markup.item)?,
                link: parse_selector(&markup.link)?,
                image: parse_selector(&markup.image)?,
                titles,
                count: parse_selector(&markup.count)?,
                icon: parse_selector(&markup.icon)?,
                emphasis: parse_selector(&markup.emphasis)?,
            },
        })
    }

    /// Extract every item of `html`, resolving relative links against `page_url`.
    pub fn extract(&self, html: &str, page_url: &str) -> Extraction {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = 0;

        for (index, element) in document.select(&self.selectors.item).enumerate() {
            seen += 1;
            match self.extract_item(element, index, base.as_ref()) {
                Ok(record) => {
                    tracing::debug!(
                        index,
                        url = %record.resource_url,
                        trace = ?record.trace,
                        "item extracted"
                    );
                    records.push(record);
                }
                Err(e) => {
                    tracing::debug!("{e}");
                    skipped.push(e);
                }
            }
        }

        tracing::info!(
            "{} items extracted ({} skipped without link or thumbnail)",
            records.len(),
            skipped.len()
        );

        Extraction {
            records,
            seen,
            skipped,
        }
    }

    fn extract_item(
        &self,
        element: ElementRef<'_>,
        index: usize,
        base: Option<&Url>,
    ) -> Result<ItemRecord> {
        let skip = |reason: &str| ScrapeError::ExtractionItem {
            index,
            reason: reason.to_string(),
        };

        let href = first_attr(element, &self.selectors.link, "href").ok_or_else(|| skip("no link"))?;
        let src = first_attr(element, &self.selectors.image, "src").ok_or_else(|| skip("no image"))?;
        let resource_url = resolve(base, href).ok_or_else(|| skip("unresolvable link"))?;
        let thumbnail_url = resolve(base, src).ok_or_else(|| skip("unresolvable image"))?;

        let mut trace = FieldTrace::default();

        let title = match self.title(element) {
            Some((source, text)) => {
                trace.title = source;
                text
            }
            None => format!("Item {}", index + 1),
        };

        let mut stats = StatFields::default();
        self.classify_counts(element, &mut stats);
        self.apply_emphasis(element, &mut stats);
        trace.likes = stats.likes.1;
        trace.comments = stats.comments.1;
        trace.views = stats.views.1;

        Ok(ItemRecord {
            resource_url,
            title,
            thumbnail_url,
            like_count: stats.likes.0,
            comment_count: stats.comments.0,
            view_count: stats.views.0,
            extracted_at: Utc::now(),
            trace,
        })
    }

    fn title(&self, element: ElementRef<'_>) -> Option<(TitleSource, String)> {
        self.selectors.titles.iter().find_map(|(source, sel)| {
            let text = element.select(sel).next().map(element_text)?;
            (!text.is_empty()).then_some((*source, text))
        })
    }

    /// Tier 1: label each count by the icon markup right before it.
    fn classify_counts(&self, element: ElementRef<'_>, stats: &mut StatFields) {
        for count in element.select(&self.selectors.count) {
            let text = element_text(count).to_lowercase();
            if !looks_like_count(&text) {
                continue;
            }
            let Some(previous) = count.prev_siblings().find_map(ElementRef::wrap) else {
                continue;
            };
            let icon = previous
                .select(&self.selectors.icon)
                .next()
                .unwrap_or(previous)
                .html();

            let value = (Stat::Value(text), StatSource::IconSignature);
            if icon.contains("heart") {
                stats.likes = value;
            } else if icon.contains("comment") {
                stats.comments = value;
            } else {
                stats.views = (value.0, StatSource::UnclassifiedCount);
            }
        }
    }

    /// Tier 2: the first two emphasized texts become likes and comments.
    fn apply_emphasis(&self, element: ElementRef<'_>, stats: &mut StatFields) {
        let emphasized: Vec<String> = element
            .select(&self.selectors.emphasis)
            .take(2)
            .map(element_text)
            .collect();
        if let [likes, comments] = emphasized.as_slice() {
            stats.likes = (Stat::from_text(likes), StatSource::EmphasisOrder);
            stats.comments = (Stat::from_text(comments), StatSource::EmphasisOrder);
        }
    }
}

#[derive(Default)]
struct StatFields {
    likes: (Stat, StatSource),
    comments: (Stat, StatSource),
    views: (Stat, StatSource),
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn first_attr<'a>(element: ElementRef<'a>, selector: &Selector, attr: &str) -> Option<&'a str> {
    element
        .select(selector)
        .next()?
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve `raw` the way a browser resolves `a.href` / `img.src`.
fn resolve(base: Option<&Url>, raw: &str) -> Option<String> {
    match base {
        Some(base) => base.join(raw).ok().map(String::from),
        None => Url::parse(raw).ok().map(String::from),
    }
}

/// Abbreviated ("1.2k", "3m") or plain digit counts.
fn looks_like_count(text: &str) -> bool {
    text.contains('k')
        || text.contains('m')
        || (!text.is_empty() && text.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_URL: &str = "https://feed.test/@someone";

    fn extractor() -> Extractor {
        Extractor::new(&Markup::default()).unwrap()
    }

    fn page(items: &[&str]) -> String {
        let body: String = items
            .iter()
            .map(|inner| format!(r#"<div data-e2e="user-post-item">{inner}</div>"#))
            .collect();
        format!(r#"<html><body><div data-e2e="user-post-item-list">{body}</div></body></html>"#)
    }

    const MEDIA: &str = r#"<a href="/@someone/video/1"><img src="https://cdn.test/1.jpg"></a>"#;

    #[test]
    fn test_required_fields_filter() {
        let html = page(&[
            MEDIA,
            r#"<a href="/@someone/video/2">no image</a>"#,
            r#"<img src="https://cdn.test/3.jpg">"#,
            r#"<a href=""><img src="https://cdn.test/4.jpg"></a>"#,
        ]);
        let extraction = extractor().extract(&html, PAGE_URL);
        assert_eq!(extraction.seen, 4);
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.skipped.len(), 3);
        assert!(extraction
            .skipped
            .iter()
            .all(|e| matches!(e, ScrapeError::ExtractionItem { .. })));
    }

    #[test]
    fn test_only_first_anchor_and_image_count() {
        let html = page(&[
            r#"<a name="top"></a><a href="/@someone/video/2"><img src="https://cdn.test/2.jpg"></a>"#,
            r#"<a href="/@someone/video/3"><img alt="lazy"><img src="https://cdn.test/3.jpg"></a>"#,
        ]);
        let extraction = extractor().extract(&html, PAGE_URL);
        assert!(extraction.records.is_empty());
        assert!(matches!(
            &extraction.skipped[..],
            [
                ScrapeError::ExtractionItem { index: 0, reason: first },
                ScrapeError::ExtractionItem { index: 1, reason: second },
            ] if first == "no link" && second == "no image"
        ));
    }

    #[test]
    fn test_links_resolve_against_page() {
        let extraction = extractor().extract(&page(&[MEDIA]), PAGE_URL);
        let record = &extraction.records[0];
        assert_eq!(record.resource_url, "https://feed.test/@someone/video/1");
        assert_eq!(record.thumbnail_url, "https://cdn.test/1.jpg");
    }

    #[test]
    fn test_title_fallback_chain() {
        let html = page(&[
            &format!(r#"{MEDIA}<div data-e2e="user-post-item-desc"> Primary </div><p class="video-meta-caption">Legacy</p>"#),
            &format!(r#"{MEDIA}<p class="video-meta-caption">Legacy</p>"#),
            &format!(r#"{MEDIA}<div data-e2e="user-post-item-desc">  </div>"#),
        ]);
        let records = extractor().extract(&html, PAGE_URL).records;
        assert_eq!(records[0].title, "Primary");
        assert_eq!(records[0].trace.title, TitleSource::Description);
        assert_eq!(records[1].title, "Legacy");
        assert_eq!(records[1].trace.title, TitleSource::LegacyCaption);
        assert_eq!(records[2].title, "Item 3");
        assert_eq!(records[2].trace.title, TitleSource::Placeholder);
    }

    #[test]
    fn test_placeholder_uses_dom_position() {
        let html = page(&["<span>skipped</span>", MEDIA]);
        let records = extractor().extract(&html, PAGE_URL).records;
        assert_eq!(records[0].title, "Item 2");
    }

    #[test]
    fn test_tier1_classifies_by_icon() {
        let item = format!(
            r##"{MEDIA}
            <div><svg class="like-icon"><use href="#heart"/></svg><span class="video-count">1.2K</span></div>
            <div><svg><path data-name="comment-bubble"/></svg><span class="video-count">87</span></div>
            <div><svg class="play"></svg><span class="video-count">3.4M</span></div>"##
        );
        let record = extractor().extract(&page(&[&item]), PAGE_URL).records.remove(0);
        assert_eq!(record.like_count, Stat::Value("1.2k".into()));
        assert_eq!(record.comment_count, Stat::Value("87".into()));
        assert_eq!(record.view_count, Stat::Value("3.4m".into()));
        assert_eq!(record.trace.likes, StatSource::IconSignature);
        assert_eq!(record.trace.views, StatSource::UnclassifiedCount);
    }

    #[test]
    fn test_tier1_ignores_non_counts_and_orphans() {
        let item = format!(
            r#"{MEDIA}
            <div><svg class="play"></svg><span class="video-count">Pinned</span></div>
            <div><span class="video-count">42</span></div>"#
        );
        let record = extractor().extract(&page(&[&item]), PAGE_URL).records.remove(0);
        assert_eq!(record.view_count, Stat::Unavailable);
        assert_eq!(record.trace.views, StatSource::Unresolved);
        assert_eq!(record.like_count, Stat::Unavailable);
    }

    #[test]
    fn test_tier2_overrides_tier1() {
        let item = format!(
            r#"{MEDIA}
            <div><svg class="heart"></svg><span class="video-count">999</span></div>
            <div><svg class="comment"></svg><span class="video-count">555</span></div>
            <strong>10</strong><strong>20</strong><strong>30</strong>"#
        );
        let record = extractor().extract(&page(&[&item]), PAGE_URL).records.remove(0);
        assert_eq!(record.like_count, Stat::Value("10".into()));
        assert_eq!(record.comment_count, Stat::Value("20".into()));
        assert_eq!(record.trace.likes, StatSource::EmphasisOrder);
        assert_eq!(record.trace.comments, StatSource::EmphasisOrder);
    }

    #[test]
    fn test_single_emphasis_does_not_override() {
        let item = format!(
            r#"{MEDIA}<div><svg class="heart"></svg><span class="video-count">999</span></div><strong>10</strong>"#
        );
        let record = extractor().extract(&page(&[&item]), PAGE_URL).records.remove(0);
        assert_eq!(record.like_count, Stat::Value("999".into()));
    }

    #[test]
    fn test_empty_emphasis_becomes_sentinel() {
        let item = format!(r#"{MEDIA}<strong></strong><strong>4</strong>"#);
        let record = extractor().extract(&page(&[&item]), PAGE_URL).records.remove(0);
        assert_eq!(record.like_count, Stat::Unavailable);
        assert_eq!(record.comment_count, Stat::Value("4".into()));
    }

    #[test]
    fn test_static_snapshot_is_idempotent() {
        let item = format!(
            r#"{MEDIA}<div data-e2e="user-post-item-desc">Clip</div><strong>1</strong><strong>2</strong>"#
        );
        let html = page(&[&item, MEDIA]);
        let ex = extractor();
        let mut first = ex.extract(&html, PAGE_URL).records;
        let second = ex.extract(&html, PAGE_URL).records;
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter_mut().zip(&second) {
            a.extracted_at = b.extracted_at;
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let markup = Markup {
            item: "[[".into(),
            ..Markup::default()
        };
        assert!(matches!(Extractor::new(&markup), Err(ScrapeError::Config(_))));
    }
}
