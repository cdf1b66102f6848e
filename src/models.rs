use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorName(String);

impl AuthorName {
    pub fn new(raw: &str) -> Result<Self, AuthorNameEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(AuthorNameEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Author name cannot be empty")]
pub struct AuthorNameEmptyError;

/// A possibly partial calendar date: `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifeDate(String);

impl LifeDate {
    /// Blank input means the date is unknown.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, LifeDateError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Self::new(trimmed).map(Some)
    }

    pub fn new(raw: &str) -> Result<Self, LifeDateError> {
        let trimmed = raw.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.into()))
        } else {
            Err(LifeDateError(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }

    fn is_valid(s: &str) -> bool {
        static RE: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^\d{4}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$").unwrap()
        });
        RE.is_match(s)
    }
}

impl std::fmt::Display for LifeDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("\"{0}\" is not a valid date, expected YYYY, YYYY-MM or YYYY-MM-DD")]
pub struct LifeDateError(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isbn(String);

impl Isbn {
    pub fn new(raw: &str) -> Result<Self, IsbnEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(IsbnEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for Isbn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("ISBN cannot be empty")]
pub struct IsbnEmptyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTitle(String);

impl BookTitle {
    pub fn new(raw: &str) -> Result<Self, BookTitleEmptyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Err(BookTitleEmptyError)
        } else {
            Ok(Self(trimmed.into()))
        }
    }

    pub fn new_unchecked(raw: &str) -> Self {
        Self(raw.into())
    }
}

impl std::fmt::Display for BookTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug)]
#[error("Book title cannot be empty")]
pub struct BookTitleEmptyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicationYear(i32);

impl PublicationYear {
    /// Blank input means the year is unknown.
    pub fn parse_optional(raw: &str) -> Result<Option<Self>, PublicationYearError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        trimmed
            .parse()
            .map(|year| Some(Self(year)))
            .map_err(|_| PublicationYearError(trimmed.into()))
    }

    pub const fn new(year: i32) -> Self {
        Self(year)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for PublicationYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug)]
#[error("\"{0}\" is not a valid publication year")]
pub struct PublicationYearError(String);

pub fn parse_author_id(raw: &str) -> Result<i64, AuthorIdError> {
    let trimmed = raw.trim();
    trimmed
        .parse()
        .map_err(|_| AuthorIdError(trimmed.into()))
}

#[derive(Error, Debug)]
#[error("\"{0}\" is not a valid author id")]
pub struct AuthorIdError(String);

#[derive(Debug, Clone)]
pub struct Author {
    id: i64,
    name: AuthorName,
    birth_date: Option<LifeDate>,
    date_of_death: Option<LifeDate>,
}

impl Author {
    pub const fn new(
        id: i64,
        name: AuthorName,
        birth_date: Option<LifeDate>,
        date_of_death: Option<LifeDate>,
    ) -> Self {
        Self {
            id,
            name,
            birth_date,
            date_of_death,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn birth_date(&self) -> Option<&LifeDate> {
        self.birth_date.as_ref()
    }

    pub const fn date_of_death(&self) -> Option<&LifeDate> {
        self.date_of_death.as_ref()
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let birth = self.birth_date.as_ref().map_or("?", |d| d.0.as_str());
        let death = self.date_of_death.as_ref().map_or("", |d| d.0.as_str());
        write!(f, "{} ({birth} - {death})", self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Book {
    id: i64,
    isbn: Isbn,
    title: BookTitle,
    publication_year: Option<PublicationYear>,
    author_id: i64,
}

impl Book {
    pub const fn new(
        id: i64,
        isbn: Isbn,
        title: BookTitle,
        publication_year: Option<PublicationYear>,
        author_id: i64,
    ) -> Self {
        Self {
            id,
            isbn,
            title,
            publication_year,
            author_id,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn publication_year(&self) -> Option<PublicationYear> {
        self.publication_year
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }
}

impl std::fmt::Display for Book {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.publication_year {
            Some(year) => write!(f, "{} ({year})", self.title),
            None => write!(f, "{}", self.title),
        }
    }
}

/// A book joined with the name of its author, as shown in listings.
#[derive(Debug, Clone)]
pub struct BookListing {
    book: Book,
    author_name: Option<AuthorName>,
}

impl BookListing {
    pub const fn new(book: Book, author_name: Option<AuthorName>) -> Self {
        Self { book, author_name }
    }

    pub const fn book(&self) -> &Book {
        &self.book
    }

    pub const fn author_name(&self) -> Option<&AuthorName> {
        self.author_name.as_ref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookOrder {
    #[default]
    Title,
    Author,
}

impl BookOrder {
    /// Anything other than `author` falls back to ordering by title.
    pub fn from_key(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("author") => Self::Author,
            _ => Self::Title,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Author => "author",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListBooksRequest {
    search: Option<String>,
    order: BookOrder,
}

impl ListBooksRequest {
    /// A blank search query is treated as no search at all.
    pub fn new(search: Option<&str>, order: BookOrder) -> Self {
        let search = search
            .map(str::trim)
            .filter(|query| !query.is_empty())
            .map(String::from);
        Self { search, order }
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub const fn order(&self) -> BookOrder {
        self.order
    }
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct ListBooksError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct CreateAuthorRequest {
    name: AuthorName,
    birth_date: Option<LifeDate>,
    date_of_death: Option<LifeDate>,
}

impl CreateAuthorRequest {
    pub const fn new(
        name: AuthorName,
        birth_date: Option<LifeDate>,
        date_of_death: Option<LifeDate>,
    ) -> Self {
        Self {
            name,
            birth_date,
            date_of_death,
        }
    }

    pub const fn name(&self) -> &AuthorName {
        &self.name
    }

    pub const fn birth_date(&self) -> Option<&LifeDate> {
        self.birth_date.as_ref()
    }

    pub const fn date_of_death(&self) -> Option<&LifeDate> {
        self.date_of_death.as_ref()
    }
}

#[derive(Error, Debug)]
pub enum CreateAuthorError {
    #[error("Author with name \"{name}\" already exists")]
    Duplicate { name: String },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindAuthorRequest {
    id: i64,
}

impl FindAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindAllAuthorsError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct DeleteAuthorRequest {
    id: i64,
}

impl DeleteAuthorRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteAuthorError {
    #[error("Author with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct CreateBookRequest {
    isbn: Isbn,
    title: BookTitle,
    publication_year: Option<PublicationYear>,
    author_id: i64,
}

impl CreateBookRequest {
    pub const fn new(
        isbn: Isbn,
        title: BookTitle,
        publication_year: Option<PublicationYear>,
        author_id: i64,
    ) -> Self {
        Self {
            isbn,
            title,
            publication_year,
            author_id,
        }
    }

    pub const fn isbn(&self) -> &Isbn {
        &self.isbn
    }

    pub const fn title(&self) -> &BookTitle {
        &self.title
    }

    pub const fn publication_year(&self) -> Option<PublicationYear> {
        self.publication_year
    }

    pub const fn author_id(&self) -> i64 {
        self.author_id
    }
}

#[derive(Error, Debug)]
pub enum CreateBookError {
    #[error("Book with ISBN \"{isbn}\" already exists")]
    DuplicateIsbn { isbn: String },
    #[error("Author with id \"{author_id}\" does not exist")]
    UnknownAuthor { author_id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug)]
pub struct FindBookRequest {
    id: i64,
}

impl FindBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum FindBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Error, Debug)]
#[error(transparent)]
pub struct FindBooksError(#[from] pub anyhow::Error);

#[derive(Error, Debug)]
#[error(transparent)]
pub struct CountBooksError(#[from] pub anyhow::Error);

#[derive(Debug)]
pub struct DeleteBookRequest {
    id: i64,
}

impl DeleteBookRequest {
    pub const fn new(id: i64) -> Self {
        Self { id }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum DeleteBookError {
    #[error("Book with id \"{id}\" does not exist")]
    NotFound { id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outcome of deleting a book, including whether the cascade removed its author.
#[derive(Debug)]
pub struct DeletedBook {
    book: Book,
    author_removed: bool,
}

impl DeletedBook {
    pub const fn new(book: Book, author_removed: bool) -> Self {
        Self {
            book,
            author_removed,
        }
    }

    pub const fn book(&self) -> &Book {
        &self.book
    }

    pub const fn author_removed(&self) -> bool {
        self.author_removed
    }
}
