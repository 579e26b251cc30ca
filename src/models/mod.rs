//! Core data models: caller identity, credentials, and the normalized
//! catalog contract.

mod book;
mod credential;
mod search;

pub use book::{
    BestBook, BookLink, NormalizedAuthor, NormalizedBookDetail, NormalizedWork, SeriesSummary,
    SeriesWork, SimilarBook, WorkSummary,
};
pub use credential::{
    AnonymousPolicy, CallerIdentity, Credential, CredentialSource, DurableCredential,
    PendingAuthorization,
};
pub use search::{ConnectionStatus, SearchResultPage, PAGE_SIZE};
