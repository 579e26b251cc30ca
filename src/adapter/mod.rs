//! Maps normalized XML trees into the stable response contract.
//!
//! Search and detail endpoints nest their payloads differently, so item
//! lookup here tolerates both `search/results/work` and a flatter
//! `search/work` layout. Counts are parsed from text only at this layer.

use crate::error::{CatalogError, Result};
use crate::models::{
    BestBook, BookLink, NormalizedAuthor, NormalizedBookDetail, NormalizedWork, SearchResultPage,
    SeriesSummary, SeriesWork, SimilarBook, WorkSummary,
};
use crate::xml::XmlElement;

/// Build a [`SearchResultPage`] from a normalized `search` node.
///
/// A missing or unparsable `total-results` falls back to the number of
/// returned items; this never fails.
pub fn to_search_page(node: &XmlElement, requested_page: u32) -> SearchResultPage {
    let search = locate(node, "search").unwrap_or(node);

    let works = match search.child("results") {
        Some(results) => results.all("work"),
        None => search.all("work"),
    };
    let items: Vec<NormalizedWork> = works.into_iter().map(work_from).collect();

    let total_results = search
        .text_of("total-results")
        .and_then(|t| parse_count(&t))
        .unwrap_or(items.len() as u64);

    SearchResultPage::new(items, total_results, requested_page)
}

/// Build a [`NormalizedBookDetail`] from a normalized `book` node.
///
/// Fails with [`CatalogError::NotFound`] when the tree holds no `book` node.
pub fn to_book_detail(node: &XmlElement) -> Result<NormalizedBookDetail> {
    let book = locate(node, "book")
        .or_else(|| {
            node.child_ignore_case("GoodreadsResponse")
                .and_then(|inner| inner.child("book"))
        })
        .ok_or_else(|| CatalogError::NotFound("response contains no book".to_string()))?;

    Ok(NormalizedBookDetail {
        id: book.text_or_empty("id"),
        title: book.text_or_empty("title"),
        title_without_series: book.text_of("title_without_series"),
        isbn: book.text_of("isbn"),
        isbn13: book.text_of("isbn13"),
        asin: book.text_of("asin"),
        kindle_asin: book.text_of("kindle_asin"),
        image_url: book.text_of("image_url"),
        small_image_url: book.text_of("small_image_url"),
        large_image_url: book.text_of("large_image_url"),
        link: book.text_of("link"),
        url: book.text_of("url"),
        publication_year: book.text_of("publication_year"),
        publication_month: book.text_of("publication_month"),
        publication_day: book.text_of("publication_day"),
        publisher: book.text_of("publisher"),
        language_code: book.text_of("language_code"),
        is_ebook: book.text_of("is_ebook"),
        description: book.text_of("description"),
        average_rating: book.text_of("average_rating"),
        num_pages: book.text_of("num_pages"),
        format: book.text_of("format"),
        edition_information: book.text_of("edition_information"),
        ratings_count: book.text_of("ratings_count"),
        text_reviews_count: book.text_of("text_reviews_count"),
        work: book.child("work").map(work_summary_from),
        authors: authors_in(book),
        book_links: nested(book, "book_links", "book_link")
            .map(link_from)
            .collect(),
        buy_links: nested(book, "buy_links", "buy_link").map(link_from).collect(),
        series_works: nested(book, "series_works", "series_work")
            .map(series_work_from)
            .collect(),
        similar_books: nested(book, "similar_books", "book")
            .map(similar_book_from)
            .collect(),
    })
}

/// Parse a provider count such as `"1234"` or `"1,234"`
pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok()
}

fn locate<'a>(node: &'a XmlElement, name: &str) -> Option<&'a XmlElement> {
    if node.name == name {
        Some(node)
    } else {
        node.child(name)
    }
}

fn nested<'a>(
    parent: &'a XmlElement,
    container: &str,
    item: &str,
) -> impl Iterator<Item = &'a XmlElement> {
    parent
        .child(container)
        .map(|c| c.all(item))
        .unwrap_or_default()
        .into_iter()
}

/// Authors appear either directly (`best_book/author`) or wrapped
/// (`book/authors/author`); both shapes are collected.
fn authors_in(parent: &XmlElement) -> Vec<NormalizedAuthor> {
    parent
        .all("author")
        .into_iter()
        .chain(nested(parent, "authors", "author"))
        .map(author_from)
        .collect()
}

fn author_from(el: &XmlElement) -> NormalizedAuthor {
    NormalizedAuthor {
        id: el.text_or_empty("id"),
        name: el.text_or_empty("name"),
        role: el.text_of("role"),
        image_url: el.text_of("image_url"),
        small_image_url: el.text_of("small_image_url"),
        link: el.text_of("link"),
        average_rating: el.text_of("average_rating"),
        ratings_count: el.text_of("ratings_count"),
        text_reviews_count: el.text_of("text_reviews_count"),
    }
}

fn work_from(el: &XmlElement) -> NormalizedWork {
    NormalizedWork {
        id: el.text_or_empty("id"),
        books_count: el.text_of("books_count"),
        ratings_count: el.text_of("ratings_count"),
        text_reviews_count: el.text_of("text_reviews_count"),
        original_publication_year: el.text_of("original_publication_year"),
        original_publication_month: el.text_of("original_publication_month"),
        original_publication_day: el.text_of("original_publication_day"),
        average_rating: el.text_of("average_rating"),
        best_book: el.child("best_book").map(|b| BestBook {
            id: b.text_or_empty("id"),
            title: b.text_or_empty("title"),
            authors: authors_in(b),
            image_url: b.text_of("image_url"),
            small_image_url: b.text_of("small_image_url"),
        }),
    }
}

fn work_summary_from(el: &XmlElement) -> WorkSummary {
    WorkSummary {
        id: el.text_or_empty("id"),
        books_count: el.text_of("books_count"),
        best_book_id: el.text_of("best_book_id"),
        reviews_count: el.text_of("reviews_count"),
        ratings_sum: el.text_of("ratings_sum"),
        ratings_count: el.text_of("ratings_count"),
        text_reviews_count: el.text_of("text_reviews_count"),
        original_publication_year: el.text_of("original_publication_year"),
        original_publication_month: el.text_of("original_publication_month"),
        original_publication_day: el.text_of("original_publication_day"),
        original_title: el.text_of("original_title"),
        media_type: el.text_of("media_type"),
    }
}

fn link_from(el: &XmlElement) -> BookLink {
    BookLink {
        id: el.text_or_empty("id"),
        name: el.text_or_empty("name"),
        link: el.text_or_empty("link"),
    }
}

fn series_work_from(el: &XmlElement) -> SeriesWork {
    SeriesWork {
        id: el.text_or_empty("id"),
        user_position: el.text_of("user_position"),
        series: el.child("series").map(|s| SeriesSummary {
            id: s.text_or_empty("id"),
            title: s.text_or_empty("title"),
            description: s.text_of("description"),
            series_works_count: s.text_of("series_works_count"),
            primary_work_count: s.text_of("primary_work_count"),
            numbered: s.text_of("numbered"),
        }),
    }
}

fn similar_book_from(el: &XmlElement) -> SimilarBook {
    SimilarBook {
        id: el.text_or_empty("id"),
        title: el.text_or_empty("title"),
        authors: authors_in(el),
        link: el.text_of("link"),
        image_url: el.text_of("image_url"),
        isbn: el.text_of("isbn"),
        isbn13: el.text_of("isbn13"),
        average_rating: el.text_of("average_rating"),
        publication_year: el.text_of("publication_year"),
    }
}
