use crate::models::{
    Author, Book, BookListing, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, DeletedBook,
    FindAllAuthorsError, FindAuthorError, FindAuthorRequest, FindBookError, FindBookRequest,
    ListBooksError, ListBooksRequest,
};
use crate::repositories::CatalogRepository;
use std::sync::Arc;
use tracing::{info, warn};

/// Catalog operations and the author/book invariants they enforce.
#[derive(Debug)]
pub struct CatalogService<R> {
    repo: Arc<R>,
}

impl<R> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R: CatalogRepository> CatalogService<R> {
    pub const fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Authors are unique by exact name; birth and death dates are not compared.
    pub async fn add_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let existing = self
            .repo
            .find_authors_by_name(req.name())
            .await
            .map_err(|err| CreateAuthorError::Other(err.0))?;
        if !existing.is_empty() {
            warn!(name = %req.name(), "Rejected duplicate author");
            return Err(CreateAuthorError::Duplicate {
                name: req.name().to_string(),
            });
        }

        let author = self.repo.create_author(req).await?;
        info!(id = author.id(), name = %author.name(), "Added author");
        Ok(author)
    }

    pub async fn add_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let existing = self
            .repo
            .find_books_by_isbn(req.isbn())
            .await
            .map_err(|err| CreateBookError::Other(err.0))?;
        if !existing.is_empty() {
            warn!(isbn = %req.isbn(), "Rejected duplicate ISBN");
            return Err(CreateBookError::DuplicateIsbn {
                isbn: req.isbn().to_string(),
            });
        }

        let author_req = FindAuthorRequest::new(req.author_id());
        match self.repo.find_author(&author_req).await {
            Ok(_) => {}
            Err(FindAuthorError::NotFound { id }) => {
                warn!(author_id = id, "Rejected book for unknown author");
                return Err(CreateBookError::UnknownAuthor { author_id: id });
            }
            Err(FindAuthorError::Other(err)) => return Err(CreateBookError::Other(err)),
        }

        let book = self.repo.create_book(req).await?;
        info!(id = book.id(), isbn = %book.isbn(), title = %book.title(), "Added book");
        Ok(book)
    }

    /// A search query takes precedence over the requested order.
    pub async fn list_books(
        &self,
        req: &ListBooksRequest,
    ) -> Result<Vec<BookListing>, ListBooksError> {
        let books = match req.search() {
            Some(query) => self.repo.search_books(query).await,
            None => self.repo.find_all_books(req.order()).await,
        };

        books.map_err(|err| ListBooksError(err.0))
    }

    pub async fn list_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
        self.repo.find_all_authors().await
    }

    /// Deletes the book, then its author if no other book references it.
    ///
    /// The two deletions are separate statements. If removing the orphaned
    /// author fails, the book stays deleted and the author is left in place.
    pub async fn delete_book(&self, req: &DeleteBookRequest) -> Result<DeletedBook, DeleteBookError> {
        let book = self
            .repo
            .find_book(&FindBookRequest::new(req.id()))
            .await
            .map_err(|err| match err {
                FindBookError::NotFound { id } => DeleteBookError::NotFound { id },
                FindBookError::Other(err) => DeleteBookError::Other(err),
            })?;
        let author_id = book.author_id();

        self.repo.delete_book(req).await?;
        info!(id = book.id(), title = %book.title(), "Deleted book");

        let author_removed = match self.remove_if_orphaned(author_id).await {
            Ok(removed) => removed,
            Err(err) => {
                warn!(author_id, "Failed to remove orphaned author: {err:#}");
                false
            }
        };

        Ok(DeletedBook::new(book, author_removed))
    }

    async fn remove_if_orphaned(&self, author_id: i64) -> anyhow::Result<bool> {
        let remaining = self
            .repo
            .count_books_by_author(author_id)
            .await
            .map_err(|err| err.0)?;
        if remaining > 0 {
            return Ok(false);
        }

        self.repo
            .delete_author(&DeleteAuthorRequest::new(author_id))
            .await?;
        info!(author_id, "Removed orphaned author");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Sqlite;
    use crate::models::{
        AuthorName, BookOrder, BookTitle, CountBooksError, DeleteAuthorError, FindBooksError,
        Isbn, LifeDate, PublicationYear,
    };
    use crate::repositories::{AuthorRepository, BookRepository};
    use anyhow::anyhow;
    use async_trait::async_trait;

    async fn service() -> (CatalogService<Sqlite>, Arc<Sqlite>) {
        let store = Arc::new(Sqlite::in_memory().await.unwrap());
        (CatalogService::new(Arc::clone(&store)), store)
    }

    /// Delegates to SQLite but refuses to delete authors.
    struct StuckAuthors(Sqlite);

    #[async_trait]
    impl AuthorRepository for StuckAuthors {
        async fn create_author(
            &self,
            req: &CreateAuthorRequest,
        ) -> Result<Author, CreateAuthorError> {
            self.0.create_author(req).await
        }

        async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
            self.0.find_author(req).await
        }

        async fn find_authors_by_name(
            &self,
            name: &AuthorName,
        ) -> Result<Vec<Author>, FindAllAuthorsError> {
            self.0.find_authors_by_name(name).await
        }

        async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
            self.0.find_all_authors().await
        }

        async fn delete_author(&self, _: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
            Err(DeleteAuthorError::Other(anyhow!("database is locked")))
        }
    }

    #[async_trait]
    impl BookRepository for StuckAuthors {
        async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
            self.0.create_book(req).await
        }

        async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError> {
            self.0.find_book(req).await
        }

        async fn find_books_by_isbn(&self, isbn: &Isbn) -> Result<Vec<Book>, FindBooksError> {
            self.0.find_books_by_isbn(isbn).await
        }

        async fn search_books(&self, query: &str) -> Result<Vec<BookListing>, FindBooksError> {
            self.0.search_books(query).await
        }

        async fn find_all_books(
            &self,
            order: BookOrder,
        ) -> Result<Vec<BookListing>, FindBooksError> {
            self.0.find_all_books(order).await
        }

        async fn count_books_by_author(&self, author_id: i64) -> Result<u64, CountBooksError> {
            self.0.count_books_by_author(author_id).await
        }

        async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
            self.0.delete_book(req).await
        }
    }

    fn author_req(name: &str) -> CreateAuthorRequest {
        CreateAuthorRequest::new(AuthorName::new(name).unwrap(), None, None)
    }

    fn book_req(isbn: &str, title: &str, author_id: i64) -> CreateBookRequest {
        CreateBookRequest::new(
            Isbn::new(isbn).unwrap(),
            BookTitle::new(title).unwrap(),
            None,
            author_id,
        )
    }

    fn titles(books: &[BookListing]) -> Vec<String> {
        books.iter().map(|b| b.book().title().to_string()).collect()
    }

    #[tokio::test]
    async fn add_author_twice_keeps_one() {
        let (service, store) = service().await;
        service.add_author(&author_req("Orwell")).await.unwrap();

        let err = service.add_author(&author_req("Orwell")).await.unwrap_err();
        assert!(matches!(err, CreateAuthorError::Duplicate { name } if name == "Orwell"));

        let authors = store.find_all_authors().await.unwrap();
        assert_eq!(authors.len(), 1);
    }

    #[tokio::test]
    async fn same_name_with_other_birth_date_is_duplicate() {
        let (service, _) = service().await;
        let first = CreateAuthorRequest::new(
            AuthorName::new("John Smith").unwrap(),
            Some(LifeDate::new("1900").unwrap()),
            None,
        );
        let second = CreateAuthorRequest::new(
            AuthorName::new("John Smith").unwrap(),
            Some(LifeDate::new("1950").unwrap()),
            None,
        );
        service.add_author(&first).await.unwrap();

        let err = service.add_author(&second).await.unwrap_err();
        assert!(matches!(err, CreateAuthorError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn author_name_match_is_case_sensitive() {
        let (service, store) = service().await;
        service.add_author(&author_req("Orwell")).await.unwrap();
        service.add_author(&author_req("orwell")).await.unwrap();

        assert_eq!(store.find_all_authors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn add_book_twice_keeps_one() {
        let (service, store) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        service
            .add_book(&book_req("A1", "1984", orwell.id()))
            .await
            .unwrap();

        let err = service
            .add_book(&book_req("A1", "Nineteen Eighty-Four", orwell.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateBookError::DuplicateIsbn { isbn } if isbn == "A1"));

        assert_eq!(store.count_books_by_author(orwell.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn add_book_requires_existing_author() {
        let (service, store) = service().await;
        let err = service
            .add_book(&book_req("A1", "1984", 7))
            .await
            .unwrap_err();
        assert!(matches!(err, CreateBookError::UnknownAuthor { author_id: 7 }));

        assert!(store.find_all_books(BookOrder::Title).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_book_keeps_publication_year() {
        let (service, _) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        let req = CreateBookRequest::new(
            Isbn::new("A1").unwrap(),
            BookTitle::new("1984").unwrap(),
            Some(PublicationYear::new(1949)),
            orwell.id(),
        );

        let book = service.add_book(&req).await.unwrap();
        assert_eq!(book.publication_year(), Some(PublicationYear::new(1949)));
        assert_eq!(book.author_id(), orwell.id());
    }

    #[tokio::test]
    async fn search_takes_precedence_over_sort() {
        let (service, _) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        service
            .add_book(&book_req("A1", "1984", orwell.id()))
            .await
            .unwrap();
        service
            .add_book(&book_req("A2", "Animal Farm", orwell.id()))
            .await
            .unwrap();

        for order in [BookOrder::Title, BookOrder::Author] {
            let req = ListBooksRequest::new(Some("1984"), order);
            let books = service.list_books(&req).await.unwrap();
            assert_eq!(titles(&books), ["1984"]);
        }
    }

    #[tokio::test]
    async fn list_books_by_author_then_title() {
        let (service, _) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        let austen = service.add_author(&author_req("Austen")).await.unwrap();
        service
            .add_book(&book_req("A1", "Animal Farm", orwell.id()))
            .await
            .unwrap();
        service
            .add_book(&book_req("B1", "Persuasion", austen.id()))
            .await
            .unwrap();
        service
            .add_book(&book_req("B2", "Emma", austen.id()))
            .await
            .unwrap();

        let by_author = ListBooksRequest::new(None, BookOrder::Author);
        let books = service.list_books(&by_author).await.unwrap();
        assert_eq!(titles(&books), ["Emma", "Persuasion", "Animal Farm"]);

        let by_title = ListBooksRequest::new(Some("  "), BookOrder::Title);
        let books = service.list_books(&by_title).await.unwrap();
        assert_eq!(titles(&books), ["Animal Farm", "Emma", "Persuasion"]);
    }

    #[tokio::test]
    async fn delete_unknown_book_is_not_found() {
        let (service, _) = service().await;
        let err = service
            .delete_book(&DeleteBookRequest::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteBookError::NotFound { id: 1 }));
    }

    #[tokio::test]
    async fn deleting_last_book_removes_author() {
        let (service, store) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        let nineteen = service
            .add_book(&book_req("A1", "1984", orwell.id()))
            .await
            .unwrap();
        let farm = service
            .add_book(&book_req("A2", "Animal Farm", orwell.id()))
            .await
            .unwrap();

        let by_title = ListBooksRequest::new(None, BookOrder::Title);
        let books = service.list_books(&by_title).await.unwrap();
        assert_eq!(titles(&books), ["1984", "Animal Farm"]);

        let deleted = service
            .delete_book(&DeleteBookRequest::new(nineteen.id()))
            .await
            .unwrap();
        assert_eq!(deleted.book().title().to_string(), "1984");
        assert!(!deleted.author_removed());
        assert!(
            store
                .find_author(&FindAuthorRequest::new(orwell.id()))
                .await
                .is_ok()
        );
        let books = service.list_books(&by_title).await.unwrap();
        assert_eq!(titles(&books), ["Animal Farm"]);

        let deleted = service
            .delete_book(&DeleteBookRequest::new(farm.id()))
            .await
            .unwrap();
        assert!(deleted.author_removed());
        let err = store
            .find_author(&FindAuthorRequest::new(orwell.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, FindAuthorError::NotFound { .. }));
    }

    #[tokio::test]
    async fn deleting_book_leaves_other_authors_alone() {
        let (service, store) = service().await;
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        let huxley = service.add_author(&author_req("Huxley")).await.unwrap();
        let nineteen = service
            .add_book(&book_req("A1", "1984", orwell.id()))
            .await
            .unwrap();
        service
            .add_book(&book_req("H1", "Brave New World", huxley.id()))
            .await
            .unwrap();

        service
            .delete_book(&DeleteBookRequest::new(nineteen.id()))
            .await
            .unwrap();

        let authors = store.find_all_authors().await.unwrap();
        let names: Vec<_> = authors.iter().map(|a| a.name().to_string()).collect();
        assert_eq!(names, ["Huxley"]);
        assert_eq!(store.count_books_by_author(huxley.id()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn failed_orphan_cleanup_still_deletes_book() {
        let store = Arc::new(StuckAuthors(Sqlite::in_memory().await.unwrap()));
        let service = CatalogService::new(Arc::clone(&store));
        let orwell = service.add_author(&author_req("Orwell")).await.unwrap();
        let nineteen = service
            .add_book(&book_req("A1", "1984", orwell.id()))
            .await
            .unwrap();

        let deleted = service
            .delete_book(&DeleteBookRequest::new(nineteen.id()))
            .await
            .unwrap();
        assert!(!deleted.author_removed());

        let err = store
            .find_book(&FindBookRequest::new(nineteen.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, FindBookError::NotFound { .. }));
        assert!(
            store
                .find_author(&FindAuthorRequest::new(orwell.id()))
                .await
                .is_ok()
        );
    }
}
