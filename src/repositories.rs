use crate::models::{
    Author, AuthorName, Book, BookListing, BookOrder, CountBooksError, CreateAuthorError,
    CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, FindAllAuthorsError,
    FindAuthorError, FindAuthorRequest, FindBookError, FindBookRequest, FindBooksError, Isbn,
};
use async_trait::async_trait;

#[async_trait]
pub trait AuthorRepository: Send + Sync + 'static {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError>;

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError>;

    /// Exact, case-sensitive match on the stored name.
    async fn find_authors_by_name(
        &self,
        name: &AuthorName,
    ) -> Result<Vec<Author>, FindAllAuthorsError>;

    /// All authors ordered by name.
    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError>;

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError>;
}

#[async_trait]
pub trait BookRepository: Send + Sync + 'static {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError>;

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError>;

    async fn find_books_by_isbn(&self, isbn: &Isbn) -> Result<Vec<Book>, FindBooksError>;

    /// Books whose title contains `query`, ignoring case, in insertion order.
    ///
    /// Case folding covers ASCII letters only: "über" does not match "Über".
    async fn search_books(&self, query: &str) -> Result<Vec<BookListing>, FindBooksError>;

    async fn find_all_books(&self, order: BookOrder) -> Result<Vec<BookListing>, FindBooksError>;

    async fn count_books_by_author(&self, author_id: i64) -> Result<u64, CountBooksError>;

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError>;
}

/// A store holding both sides of the author/book relationship.
pub trait CatalogRepository: AuthorRepository + BookRepository {}

impl<T: AuthorRepository + BookRepository> CatalogRepository for T {}
