use crate::models::{
    Author, AuthorName, Book, BookListing, BookOrder, BookTitle, CountBooksError,
    CreateAuthorError, CreateAuthorRequest, CreateBookError, CreateBookRequest, DeleteAuthorError,
    DeleteAuthorRequest, DeleteBookError, DeleteBookRequest, FindAllAuthorsError,
    FindAuthorError, FindAuthorRequest, FindBookError, FindBookRequest, FindBooksError, Isbn,
    LifeDate, PublicationYear,
};
use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{FromRow, Row, SqlitePool};
use std::str::FromStr;

static MIGRATOR: Migrator = sqlx::migrate!();

const BOOK_LISTING_SELECT: &str = "SELECT book.id, book.isbn, book.title, book.publication_year, \
     book.author_id, author.name AS author_name \
     FROM book LEFT JOIN author ON author.id = book.author_id";

#[derive(Debug, Clone)]
pub struct Sqlite {
    pool: SqlitePool,
}

impl Sqlite {
    /// Opens (creating if missing) the database at `path` and runs pending migrations.
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str(path)
            .with_context(|| format!("Invalid database path {path}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePool::connect_with(opts)
            .await
            .with_context(|| format!("Failed to open database at {path}"))?;

        Self::migrate(pool).await
    }

    /// A private in-memory database. Every pooled connection would see its own
    /// empty database, so the pool is pinned to a single connection.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory database options")?
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .context("Failed to open in-memory database")?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> anyhow::Result<Self> {
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self { pool })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Author {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let name = row.try_get("name")?;
        let birth_date: Option<&str> = row.try_get("birth_date")?;
        let date_of_death: Option<&str> = row.try_get("date_of_death")?;

        let name = AuthorName::new_unchecked(name);
        let birth_date = birth_date.map(LifeDate::new_unchecked);
        let date_of_death = date_of_death.map(LifeDate::new_unchecked);
        Ok(Self::new(id, name, birth_date, date_of_death))
    }
}

impl<'r> FromRow<'r, SqliteRow> for Book {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id = row.try_get("id")?;
        let isbn = row.try_get("isbn")?;
        let title = row.try_get("title")?;
        let publication_year: Option<i32> = row.try_get("publication_year")?;
        let author_id = row.try_get("author_id")?;

        let isbn = Isbn::new_unchecked(isbn);
        let title = BookTitle::new_unchecked(title);
        let publication_year = publication_year.map(PublicationYear::new);
        Ok(Self::new(id, isbn, title, publication_year, author_id))
    }
}

impl<'r> FromRow<'r, SqliteRow> for BookListing {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let book = Book::from_row(row)?;
        let author_name: Option<&str> = row.try_get("author_name")?;

        Ok(Self::new(book, author_name.map(AuthorName::new_unchecked)))
    }
}

#[async_trait]
impl AuthorRepository for Sqlite {
    async fn create_author(&self, req: &CreateAuthorRequest) -> Result<Author, CreateAuthorError> {
        let author = sqlx::query_as(
            "INSERT INTO author (name, birth_date, date_of_death) VALUES (?, ?, ?) \
             RETURNING id, name, birth_date, date_of_death",
        )
        .bind(req.name().to_string())
        .bind(req.birth_date().map(ToString::to_string))
        .bind(req.date_of_death().map(ToString::to_string))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateAuthorError::Duplicate {
                    name: req.name().to_string(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create author with name "{}""#,
                    req.name()
                ));
                CreateAuthorError::Other(err)
            }
        })?;

        Ok(author)
    }

    async fn find_author(&self, req: &FindAuthorRequest) -> Result<Author, FindAuthorError> {
        let author =
            sqlx::query_as("SELECT id, name, birth_date, date_of_death FROM author WHERE id = ?")
                .bind(req.id())
                .fetch_one(&self.pool)
                .await
                .map_err(|err| {
                    if matches!(err, sqlx::Error::RowNotFound) {
                        FindAuthorError::NotFound { id: req.id() }
                    } else {
                        let err = anyhow!(err).context(format!(
                            r#"Failed to retrieve author with id "{}""#,
                            req.id()
                        ));
                        FindAuthorError::Other(err)
                    }
                })?;

        Ok(author)
    }

    async fn find_authors_by_name(
        &self,
        name: &AuthorName,
    ) -> Result<Vec<Author>, FindAllAuthorsError> {
        let authors =
            sqlx::query_as("SELECT id, name, birth_date, date_of_death FROM author WHERE name = ?")
                .bind(name.to_string())
                .fetch_all(&self.pool)
                .await
                .map_err(|err| {
                    let err = anyhow!(err)
                        .context(format!(r#"Failed to retrieve authors named "{name}""#));
                    FindAllAuthorsError(err)
                })?;

        Ok(authors)
    }

    async fn find_all_authors(&self) -> Result<Vec<Author>, FindAllAuthorsError> {
        let authors = sqlx::query_as(
            "SELECT id, name, birth_date, date_of_death FROM author ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err = anyhow!(err).context("Failed to retrieve all authors");
            FindAllAuthorsError(err)
        })?;

        Ok(authors)
    }

    async fn delete_author(&self, req: &DeleteAuthorRequest) -> Result<(), DeleteAuthorError> {
        let result = sqlx::query("DELETE FROM author WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to delete author with id "{}""#, req.id()))
            })?;

        if result.rows_affected() == 0 {
            return Err(DeleteAuthorError::NotFound { id: req.id() });
        }

        Ok(())
    }
}

#[async_trait]
impl BookRepository for Sqlite {
    async fn create_book(&self, req: &CreateBookRequest) -> Result<Book, CreateBookError> {
        let book = sqlx::query_as(
            "INSERT INTO book (isbn, title, publication_year, author_id) VALUES (?, ?, ?, ?) \
             RETURNING id, isbn, title, publication_year, author_id",
        )
        .bind(req.isbn().to_string())
        .bind(req.title().to_string())
        .bind(req.publication_year().map(PublicationYear::value))
        .bind(req.author_id())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                CreateBookError::DuplicateIsbn {
                    isbn: req.isbn().to_string(),
                }
            } else if is_foreign_key_violation(&err) {
                CreateBookError::UnknownAuthor {
                    author_id: req.author_id(),
                }
            } else {
                let err = anyhow!(err).context(format!(
                    r#"Failed to create book with ISBN "{}""#,
                    req.isbn()
                ));
                CreateBookError::Other(err)
            }
        })?;

        Ok(book)
    }

    async fn find_book(&self, req: &FindBookRequest) -> Result<Book, FindBookError> {
        let book = sqlx::query_as(
            "SELECT id, isbn, title, publication_year, author_id FROM book WHERE id = ?",
        )
        .bind(req.id())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if matches!(err, sqlx::Error::RowNotFound) {
                FindBookError::NotFound { id: req.id() }
            } else {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to retrieve book with id "{}""#, req.id()));
                FindBookError::Other(err)
            }
        })?;

        Ok(book)
    }

    async fn find_books_by_isbn(&self, isbn: &Isbn) -> Result<Vec<Book>, FindBooksError> {
        let books = sqlx::query_as(
            "SELECT id, isbn, title, publication_year, author_id FROM book WHERE isbn = ?",
        )
        .bind(isbn.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| {
            let err =
                anyhow!(err).context(format!(r#"Failed to retrieve books with ISBN "{isbn}""#));
            FindBooksError(err)
        })?;

        Ok(books)
    }

    async fn search_books(&self, query: &str) -> Result<Vec<BookListing>, FindBooksError> {
        let sql = format!(
            r"{BOOK_LISTING_SELECT} WHERE lower(book.title) LIKE lower(?) ESCAPE '\' ORDER BY book.id"
        );
        let books = sqlx::query_as(&sql)
            .bind(format!("%{}%", escape_like(query)))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err)
                    .context(format!(r#"Failed to search books by title "{query}""#));
                FindBooksError(err)
            })?;

        Ok(books)
    }

    async fn find_all_books(&self, order: BookOrder) -> Result<Vec<BookListing>, FindBooksError> {
        let order_by = match order {
            BookOrder::Title => "book.title, book.id",
            BookOrder::Author => "author.name, book.title, book.id",
        };
        let sql = format!("{BOOK_LISTING_SELECT} ORDER BY {order_by}");
        let books = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(
                    "Failed to retrieve all books ordered by {}",
                    order.as_str()
                ));
                FindBooksError(err)
            })?;

        Ok(books)
    }

    async fn count_books_by_author(&self, author_id: i64) -> Result<u64, CountBooksError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                let err = anyhow!(err).context(format!(
                    r#"Failed to count books of author with id "{author_id}""#
                ));
                CountBooksError(err)
            })?;

        u64::try_from(count)
            .map_err(|err| CountBooksError(anyhow!(err).context("Negative book count")))
    }

    async fn delete_book(&self, req: &DeleteBookRequest) -> Result<(), DeleteBookError> {
        let result = sqlx::query("DELETE FROM book WHERE id = ?")
            .bind(req.id())
            .execute(&self.pool)
            .await
            .map_err(|err| {
                anyhow!(err).context(format!(r#"Failed to delete book with id "{}""#, req.id()))
            })?;

        if result.rows_affected() == 0 {
            return Err(DeleteBookError::NotFound { id: req.id() });
        }

        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_unique_violation();
    }

    false
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.is_foreign_key_violation();
    }

    false
}

/// Makes `%`, `_` and `\` match literally in a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> Sqlite {
        Sqlite::in_memory().await.unwrap()
    }

    async fn author(store: &Sqlite, name: &str) -> Author {
        let req = CreateAuthorRequest::new(AuthorName::new(name).unwrap(), None, None);
        store.create_author(&req).await.unwrap()
    }

    async fn book(store: &Sqlite, isbn: &str, title: &str, author_id: i64) -> Book {
        let req = CreateBookRequest::new(
            Isbn::new(isbn).unwrap(),
            BookTitle::new(title).unwrap(),
            None,
            author_id,
        );
        store.create_book(&req).await.unwrap()
    }

    fn titles(books: &[BookListing]) -> Vec<String> {
        books.iter().map(|b| b.book().title().to_string()).collect()
    }

    #[tokio::test]
    async fn create_and_find_author() {
        let store = store().await;
        let req = CreateAuthorRequest::new(
            AuthorName::new("George Orwell").unwrap(),
            Some(LifeDate::new("1903-06-25").unwrap()),
            None,
        );
        let created = store.create_author(&req).await.unwrap();

        let found = store
            .find_author(&FindAuthorRequest::new(created.id()))
            .await
            .unwrap();
        assert_eq!(found.name().as_str(), "George Orwell");
        assert_eq!(found.birth_date().map(ToString::to_string).as_deref(), Some("1903-06-25"));
        assert!(found.date_of_death().is_none());
    }

    #[tokio::test]
    async fn missing_author_is_not_found() {
        let store = store().await;
        let err = store
            .find_author(&FindAuthorRequest::new(42))
            .await
            .unwrap_err();
        assert!(matches!(err, FindAuthorError::NotFound { id: 42 }));
    }

    #[tokio::test]
    async fn duplicate_author_name_violates_unique_constraint() {
        let store = store().await;
        author(&store, "Orwell").await;

        let req = CreateAuthorRequest::new(AuthorName::new("Orwell").unwrap(), None, None);
        let err = store.create_author(&req).await.unwrap_err();
        assert!(matches!(err, CreateAuthorError::Duplicate { name } if name == "Orwell"));
    }

    #[tokio::test]
    async fn book_with_unknown_author_violates_foreign_key() {
        let store = store().await;
        let req = CreateBookRequest::new(
            Isbn::new("A1").unwrap(),
            BookTitle::new("1984").unwrap(),
            Some(PublicationYear::new(1949)),
            99,
        );
        let err = store.create_book(&req).await.unwrap_err();
        assert!(matches!(err, CreateBookError::UnknownAuthor { author_id: 99 }));
    }

    #[tokio::test]
    async fn duplicate_isbn_violates_unique_constraint() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        book(&store, "A1", "1984", orwell.id()).await;

        let req = CreateBookRequest::new(
            Isbn::new("A1").unwrap(),
            BookTitle::new("Another").unwrap(),
            None,
            orwell.id(),
        );
        let err = store.create_book(&req).await.unwrap_err();
        assert!(matches!(err, CreateBookError::DuplicateIsbn { isbn } if isbn == "A1"));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        book(&store, "A1", "Animal Farm", orwell.id()).await;
        book(&store, "A2", "1984", orwell.id()).await;
        book(&store, "A3", "Homage to Catalonia", orwell.id()).await;

        let books = store.search_books("ANIMAL").await.unwrap();
        assert_eq!(titles(&books), ["Animal Farm"]);
        assert_eq!(
            books[0].author_name().map(AuthorName::as_str),
            Some("Orwell")
        );

        let books = store.search_books("a").await.unwrap();
        assert_eq!(titles(&books), ["Animal Farm", "Homage to Catalonia"]);
    }

    #[tokio::test]
    async fn search_matches_wildcards_literally() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        book(&store, "A1", "100% Orwell", orwell.id()).await;
        book(&store, "A2", "1984", orwell.id()).await;

        let books = store.search_books("%").await.unwrap();
        assert_eq!(titles(&books), ["100% Orwell"]);

        let books = store.search_books("_").await.unwrap();
        assert!(books.is_empty());
    }

    #[tokio::test]
    async fn search_folds_ascii_case_only() {
        let store = store().await;
        let hoffmann = author(&store, "Hoffmann").await;
        book(&store, "D1", "Über Alles", hoffmann.id()).await;

        let books = store.search_books("über").await.unwrap();
        assert!(books.is_empty());

        let books = store.search_books("Über ALLES").await.unwrap();
        assert_eq!(titles(&books), ["Über Alles"]);
    }

    #[tokio::test]
    async fn books_are_ordered_by_title_or_author() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        let huxley = author(&store, "Huxley").await;
        book(&store, "A1", "Animal Farm", orwell.id()).await;
        book(&store, "H1", "Brave New World", huxley.id()).await;
        book(&store, "A2", "1984", orwell.id()).await;

        let books = store.find_all_books(BookOrder::Title).await.unwrap();
        assert_eq!(titles(&books), ["1984", "Animal Farm", "Brave New World"]);

        let books = store.find_all_books(BookOrder::Author).await.unwrap();
        assert_eq!(titles(&books), ["Brave New World", "1984", "Animal Farm"]);
    }

    #[tokio::test]
    async fn count_and_delete_books() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        let first = book(&store, "A1", "1984", orwell.id()).await;
        book(&store, "A2", "Animal Farm", orwell.id()).await;
        assert_eq!(store.count_books_by_author(orwell.id()).await.unwrap(), 2);

        store
            .delete_book(&DeleteBookRequest::new(first.id()))
            .await
            .unwrap();
        assert_eq!(store.count_books_by_author(orwell.id()).await.unwrap(), 1);

        let err = store
            .delete_book(&DeleteBookRequest::new(first.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteBookError::NotFound { .. }));
    }

    #[tokio::test]
    async fn author_with_books_cannot_be_deleted() {
        let store = store().await;
        let orwell = author(&store, "Orwell").await;
        book(&store, "A1", "1984", orwell.id()).await;

        let err = store
            .delete_author(&DeleteAuthorRequest::new(orwell.id()))
            .await
            .unwrap_err();
        assert!(matches!(err, DeleteAuthorError::Other(_)));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
