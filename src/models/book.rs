//! Canonical catalog items after single-vs-list repair.
//!
//! Every field the provider may render as either one element or several is a
//! `Vec` here. Numeric-looking fields stay `String`; parsing them is the
//! response adapter's job.

use serde::{Deserialize, Serialize};

/// An author reference as it appears inside works and books
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAuthor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_reviews_count: Option<String>,
}

/// The representative edition of a work in search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestBook {
    pub id: String,
    pub title: String,
    pub authors: Vec<NormalizedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
}

/// A search hit: the conceptual work behind one or more editions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWork {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub books_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_reviews_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_book: Option<BestBook>,
}

impl NormalizedWork {
    /// Title of the best book, or an empty string
    pub fn title(&self) -> &str {
        self.best_book.as_ref().map(|b| b.title.as_str()).unwrap_or("")
    }

    /// Primary author's name, or an empty string
    pub fn primary_author(&self) -> &str {
        self.best_book
            .as_ref()
            .and_then(|b| b.authors.first())
            .map(|a| a.name.as_str())
            .unwrap_or("")
    }
}

/// Work-level statistics attached to a book detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub books_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_sum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_reviews_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_publication_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// A named link (book links, buy links)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookLink {
    pub id: String,
    pub name: String,
    pub link: String,
}

/// Series metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_works_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_work_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numbered: Option<String>,
}

/// A book's membership in a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesWork {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesSummary>,
}

/// A related book suggested by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarBook {
    pub id: String,
    pub title: String,
    pub authors: Vec<NormalizedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<String>,
}

/// Full details of one edition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBookDetail {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_without_series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kindle_asin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub small_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_day: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_ebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition_information: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_reviews_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work: Option<WorkSummary>,
    pub authors: Vec<NormalizedAuthor>,
    pub book_links: Vec<BookLink>,
    pub buy_links: Vec<BookLink>,
    pub series_works: Vec<SeriesWork>,
    pub similar_books: Vec<SimilarBook>,
}
