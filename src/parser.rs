use std::collections::HashSet;

use regex::Regex;
use ego_tree::NodeRef;
use scraper::{ElementRef, Html, Node, Selector};

use crate::models::{Deal, DealKind, RenderedPage};
use crate::utils::error::{AppError, Result};

const CARD_SELECTOR: &str = "div[class*='product'], div[class*='item'], div[class*='card'], div[class*='deal'], div[class*='tile']";
const CONTAINER_CLASS_KEYWORDS: [&str; 5] = ["product", "item", "card", "deal", "tile"];
const MAX_ANCESTOR_WALK: usize = 10;
const MIN_BLOCK_LEN: usize = 5;
const BOGO_PHRASES: [&str; 3] = ["buy one get one", "b1g1", "buy one, get one"];

/// Extracts deal entries from a rendered weekly-ad page and matches them
/// against search terms. The extraction heuristic targets the ad site's
/// card-like containers and is expected to need retuning when the site's
/// markup changes.
pub struct AdParser {
    card_selector: Selector,
    price_re: Regex,
    bogo_re: Regex,
    save_re: Regex,
    percent_off_re: Regex,
}

impl AdParser {
    pub fn new() -> Self {
        AdParser {
            card_selector: Selector::parse(CARD_SELECTOR).unwrap(),
            price_re: Regex::new(r"\$\d+\.\d{2}").unwrap(),
            bogo_re: Regex::new(r"(?i)buy\s*\d+\s*get\s*\d+").unwrap(),
            save_re: Regex::new(r"(?i)save\s*(?:up\s*to\s*)?(\$\d+\.\d{2})").unwrap(),
            percent_off_re: Regex::new(r"(?i)\d+%\s*off").unwrap(),
        }
    }

    /// Parse the page and return the deals whose text contains any search
    /// term, case-insensitively, in document order.
    pub fn search(&self, page: &RenderedPage, terms: &[String]) -> Result<Vec<Deal>> {
        let deals = self.parse(page)?;
        let lowered: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        Ok(deals
            .into_iter()
            .filter(|deal| {
                let text = deal.full_text.to_lowercase();
                lowered.iter().any(|term| text.contains(term))
            })
            .collect())
    }

    /// Extract every deal entry on the page, in document order. A page with
    /// an unrecognized structure yields an empty list, not an error.
    pub fn parse(&self, page: &RenderedPage) -> Result<Vec<Deal>> {
        if page.html.trim().is_empty() {
            return Err(AppError::Parse {
                message: format!("empty document from {}", page.url),
            });
        }
        let document = Html::parse_document(&page.html);
        Ok(self
            .candidate_containers(&document)
            .into_iter()
            .filter_map(|container| self.extract_deal(container))
            .collect())
    }

    fn candidate_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let mut seen = HashSet::new();
        let mut containers = Vec::new();

        // Selection runs in document order, so an inner card's wrapper is
        // already recorded by the time the nested element comes up.
        for element in document.select(&self.card_selector) {
            if element.ancestors().any(|a| seen.contains(&a.id())) {
                continue;
            }
            seen.insert(element.id());
            containers.push(element);
        }
        if !containers.is_empty() {
            return containers;
        }

        // Fallback for unrecognized layouts: find price text and walk up to
        // the enclosing container.
        for node in document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            if !self.price_re.is_match(&text.text) {
                continue;
            }
            if let Some(container) = enclosing_container(node) {
                if seen.insert(container.id()) {
                    containers.push(container);
                }
            }
        }
        containers
    }

    fn extract_deal(&self, container: ElementRef<'_>) -> Option<Deal> {
        let lines: Vec<String> = container
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        let full_text = lines.join("\n");
        if full_text.len() < MIN_BLOCK_LEN {
            return None;
        }

        let prices: Vec<String> = self
            .price_re
            .find_iter(&full_text)
            .map(|m| m.as_str().to_string())
            .collect();
        let is_bogo = self.detect_bogo(&full_text);
        let savings = self.extract_savings(&full_text);

        let (product_name, inline_discount) = self.split_name_and_discount(&lines[0]);
        let description =
            inline_discount.or_else(|| lines.iter().find(|l| self.is_deal_line(l)).cloned());

        // Only keep blocks that carry an actual deal signal.
        let has_deal = is_bogo || savings.is_some() || description.is_some() || prices.len() > 1;
        if !has_deal {
            return None;
        }

        let kind = categorize(&full_text, &prices, is_bogo);
        let discount_text = description
            .or_else(|| savings.clone())
            .or_else(|| prices.first().cloned())
            .unwrap_or_else(|| "on sale".to_string());

        Some(Deal {
            product_name,
            discount_text,
            current_price: prices.first().cloned(),
            savings,
            kind,
            is_bogo,
            full_text,
        })
    }

    // "Wonder Bread $2.50 off" splits at the price into name and discount.
    fn split_name_and_discount(&self, first_line: &str) -> (String, Option<String>) {
        if let Some(m) = self.price_re.find(first_line) {
            if m.start() > 0 {
                let name = first_line[..m.start()].trim();
                if !name.is_empty() {
                    return (
                        name.to_string(),
                        Some(first_line[m.start()..].trim().to_string()),
                    );
                }
            }
        }
        (first_line.to_string(), None)
    }

    fn is_deal_line(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        (lower.contains("buy") && lower.contains("get"))
            || lower.contains("save")
            || lower.contains("free")
            || self.percent_off_re.is_match(line)
            || (self.price_re.is_match(line) && lower.contains("off"))
    }

    fn detect_bogo(&self, text: &str) -> bool {
        if self.bogo_re.is_match(text) {
            return true;
        }
        let lower = text.to_lowercase();
        lower.contains("bogo") || BOGO_PHRASES.iter().any(|p| lower.contains(p))
    }

    fn extract_savings(&self, text: &str) -> Option<String> {
        self.save_re.captures(text).map(|c| c[1].to_string())
    }
}

impl Default for AdParser {
    fn default() -> Self {
        Self::new()
    }
}

fn categorize(text: &str, prices: &[String], is_bogo: bool) -> DealKind {
    if is_bogo {
        DealKind::Bogo
    } else if text.to_lowercase().contains("save") {
        DealKind::Discount
    } else if prices.len() > 1 {
        DealKind::PriceDrop
    } else {
        DealKind::Other
    }
}

fn enclosing_container<'a>(node: NodeRef<'a, Node>) -> Option<ElementRef<'a>> {
    for ancestor in node.ancestors().take(MAX_ANCESTOR_WALK) {
        let Some(element) = ElementRef::wrap(ancestor) else {
            continue;
        };
        if element.value().name() != "div" {
            continue;
        }
        let class_attr = element.value().attr("class").unwrap_or("").to_lowercase();
        if CONTAINER_CLASS_KEYWORDS.iter().any(|k| class_attr.contains(k)) {
            return Some(element);
        }
        if element.value().attr("data-testid").is_some()
            || element.value().attr("data-product-id").is_some()
        {
            return Some(element);
        }
    }
    None
}
