use serde_json::Value;

use crate::domain::{Author, Document, NormalizedRecord, Product, Scalar};

pub const MAX_AUTHORS: usize = 3;
pub const AUTHOR_SEPARATOR: &str = " and ";

const DOI_SOURCE: &str = "doi";
const PMID_SOURCE: &str = "pmid";

pub fn normalize(document: &Document) -> NormalizedRecord {
    normalize_product(&Product::from_document(document))
}

pub fn normalize_product(product: &Product) -> NormalizedRecord {
    let abstract_text = if product.keeps_abstract() {
        product
            .abstract_text
            .clone()
            .unwrap_or_else(|| Value::String(String::new()))
    } else {
        Value::String(String::new())
    };

    let (publisher, country) = publisher_and_country(product);
    let first_title = product.titles.first();
    let info = product.bibliographic_info.as_ref();

    NormalizedRecord {
        journal: journal(product),
        publisher,
        country,
        title: first_title
            .and_then(|title| title.title.clone())
            .unwrap_or_default(),
        author: format_authors(&product.authors),
        year: product.year_published.clone().unwrap_or_default(),
        volume: info
            .and_then(|info| info.volume.clone())
            .unwrap_or_default(),
        issue: info.and_then(|info| info.issue.clone()).unwrap_or_default(),
        page: page_range(
            info.and_then(|info| info.start_page.as_ref()),
            info.and_then(|info| info.end_page.as_ref()),
        ),
        language: first_title
            .and_then(|title| title.lang.clone())
            .unwrap_or_default(),
        abstract_text,
        doi: product.external_id(DOI_SOURCE).unwrap_or_default(),
        pmid: product.external_id(PMID_SOURCE).unwrap_or_default(),
    }
}

fn journal(product: &Product) -> String {
    product
        .source
        .as_ref()
        .and_then(|source| {
            source
                .names
                .iter()
                .filter_map(|entry| entry.name.as_deref())
                .find(|name| !name.is_empty())
        })
        .unwrap_or_default()
        .to_string()
}

fn publisher_and_country(product: &Product) -> (String, String) {
    match product
        .source
        .as_ref()
        .and_then(|source| source.publisher.as_ref())
    {
        Some(publisher) => (
            publisher.name.clone().unwrap_or_default(),
            publisher.country_code.clone().unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    }
}

/// `"Jane Ann Doe"` becomes `"JA, Doe"`; single-token names pass through.
pub fn format_author(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    match parts.split_last() {
        Some((last, leading)) if !leading.is_empty() => {
            let initials: String = leading
                .iter()
                .filter_map(|part| part.chars().next())
                .collect();
            format!("{initials}, {last}")
        }
        _ => full_name.to_string(),
    }
}

pub fn format_authors(authors: &[Author]) -> String {
    authors
        .iter()
        .take(MAX_AUTHORS)
        .map(|author| format_author(author.full_name.as_deref().unwrap_or_default()))
        .collect::<Vec<_>>()
        .join(AUTHOR_SEPARATOR)
}

/// Only one bound present yields that bound alone, with no separator.
pub fn page_range(start: Option<&Scalar>, end: Option<&Scalar>) -> String {
    let start = start.filter(|value| !value.is_blank());
    let end = end.filter(|value| !value.is_blank());
    match (start, end) {
        (Some(start), Some(end)) => format!("{start} - {end}"),
        (Some(bound), None) | (None, Some(bound)) => bound.to_string(),
        (None, None) => String::new(),
    }
}
