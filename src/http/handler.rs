use crate::http::AppState;
use crate::models::{
    Author, AuthorIdError, AuthorName, AuthorNameEmptyError, BookListing, BookOrder, BookTitle,
    BookTitleEmptyError, CreateAuthorError, CreateAuthorRequest, CreateBookError,
    CreateBookRequest, DeleteBookError, DeleteBookRequest, DeletedBook, Isbn, IsbnEmptyError,
    LifeDate, LifeDateError, ListBooksRequest, PublicationYear, PublicationYearError,
};
use crate::repositories::CatalogRepository;
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

#[derive(Debug)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<ApiResponse<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub const fn new(status: StatusCode, data: T) -> Self {
        Self(status, Json(ApiResponse::new(status, data)))
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> axum::response::Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    status_code: u16,
    data: T,
}

impl<T: Serialize> ApiResponse<T> {
    const fn new(status: StatusCode, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    InternalServerError(String),
    NotFound(String),
    Conflict(String),
    UnprocessableEntity(String),
}

impl ApiError {
    fn internal(cause: &anyhow::Error) -> Self {
        error!("{cause:?}");
        Self::InternalServerError("Internal server error".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg) = match self {
            Self::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };
        (status, Json(ApiResponse::new(status, msg))).into_response()
    }
}

impl From<ParseCreateAuthorHttpRequestError> for ApiError {
    fn from(err: ParseCreateAuthorHttpRequestError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<ParseCreateBookHttpRequestError> for ApiError {
    fn from(err: ParseCreateBookHttpRequestError) -> Self {
        Self::UnprocessableEntity(err.to_string())
    }
}

impl From<CreateAuthorError> for ApiError {
    fn from(err: CreateAuthorError) -> Self {
        match err {
            CreateAuthorError::Duplicate { .. } => Self::Conflict(err.to_string()),
            CreateAuthorError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<CreateBookError> for ApiError {
    fn from(err: CreateBookError) -> Self {
        match err {
            CreateBookError::DuplicateIsbn { .. } => Self::Conflict(err.to_string()),
            CreateBookError::UnknownAuthor { .. } => Self::UnprocessableEntity(err.to_string()),
            CreateBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

impl From<DeleteBookError> for ApiError {
    fn from(err: DeleteBookError) -> Self {
        match err {
            DeleteBookError::NotFound { .. } => Self::NotFound(err.to_string()),
            DeleteBookError::Other(cause) => Self::internal(&cause),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseCreateAuthorHttpRequestError {
    #[error(transparent)]
    Name(#[from] AuthorNameEmptyError),
    #[error("Invalid birth date: {0}")]
    BirthDate(LifeDateError),
    #[error("Invalid date of death: {0}")]
    DateOfDeath(LifeDateError),
}

#[derive(Debug, Error)]
pub enum ParseCreateBookHttpRequestError {
    #[error(transparent)]
    Isbn(#[from] IsbnEmptyError),
    #[error(transparent)]
    Title(#[from] BookTitleEmptyError),
    #[error(transparent)]
    PublicationYear(#[from] PublicationYearError),
    #[error(transparent)]
    AuthorId(#[from] AuthorIdError),
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorHttpRequest {
    name: String,
    #[serde(default)]
    birth_date: Option<String>,
    #[serde(default)]
    date_of_death: Option<String>,
}

impl TryFrom<CreateAuthorHttpRequest> for CreateAuthorRequest {
    type Error = ParseCreateAuthorHttpRequestError;

    fn try_from(value: CreateAuthorHttpRequest) -> Result<Self, Self::Error> {
        let name = AuthorName::new(&value.name)?;
        let birth_date = LifeDate::parse_optional(value.birth_date.as_deref().unwrap_or(""))
            .map_err(ParseCreateAuthorHttpRequestError::BirthDate)?;
        let date_of_death = LifeDate::parse_optional(value.date_of_death.as_deref().unwrap_or(""))
            .map_err(ParseCreateAuthorHttpRequestError::DateOfDeath)?;
        Ok(Self::new(name, birth_date, date_of_death))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateBookHttpRequest {
    isbn: String,
    title: String,
    #[serde(default)]
    publication_year: Option<i32>,
    author_id: i64,
}

impl TryFrom<CreateBookHttpRequest> for CreateBookRequest {
    type Error = ParseCreateBookHttpRequestError;

    fn try_from(value: CreateBookHttpRequest) -> Result<Self, Self::Error> {
        let isbn = Isbn::new(&value.isbn)?;
        let title = BookTitle::new(&value.title)?;
        let publication_year = value.publication_year.map(PublicationYear::new);
        Ok(Self::new(isbn, title, publication_year, value.author_id))
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedHttpResponse {
    id: i64,
}

#[derive(Debug, Serialize)]
pub struct AuthorHttpResponse {
    id: i64,
    name: String,
    birth_date: Option<String>,
    date_of_death: Option<String>,
}

impl From<&Author> for AuthorHttpResponse {
    fn from(value: &Author) -> Self {
        Self {
            id: value.id(),
            name: value.name().to_string(),
            birth_date: value.birth_date().map(ToString::to_string),
            date_of_death: value.date_of_death().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookHttpResponse {
    id: i64,
    isbn: String,
    title: String,
    publication_year: Option<i32>,
    author_id: i64,
    author_name: Option<String>,
}

impl From<&BookListing> for BookHttpResponse {
    fn from(value: &BookListing) -> Self {
        let book = value.book();
        Self {
            id: book.id(),
            isbn: book.isbn().to_string(),
            title: book.title().to_string(),
            publication_year: book.publication_year().map(PublicationYear::value),
            author_id: book.author_id(),
            author_name: value.author_name().map(ToString::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteBookHttpResponse {
    id: i64,
    title: String,
    author_removed: bool,
}

impl From<DeletedBook> for DeleteBookHttpResponse {
    fn from(value: DeletedBook) -> Self {
        Self {
            id: value.book().id(),
            title: value.book().title().to_string(),
            author_removed: value.author_removed(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListBooksHttpQuery {
    search: Option<String>,
    sort: Option<String>,
}

pub async fn list_books<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Query(query): Query<ListBooksHttpQuery>,
) -> Result<ApiSuccess<Vec<BookHttpResponse>>, ApiError> {
    let order = BookOrder::from_key(query.sort.as_deref());
    let req = ListBooksRequest::new(query.search.as_deref(), order);
    state
        .catalog
        .list_books(&req)
        .await
        .map_err(|err| ApiError::internal(&err.0))
        .map(|books| {
            let books = books.iter().map(BookHttpResponse::from).collect();
            ApiSuccess::new(StatusCode::OK, books)
        })
}

pub async fn list_authors<R: CatalogRepository>(
    State(state): State<AppState<R>>,
) -> Result<ApiSuccess<Vec<AuthorHttpResponse>>, ApiError> {
    state
        .catalog
        .list_authors()
        .await
        .map_err(|err| ApiError::internal(&err.0))
        .map(|authors| {
            let authors = authors.iter().map(AuthorHttpResponse::from).collect();
            ApiSuccess::new(StatusCode::OK, authors)
        })
}

pub async fn create_author<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Json(body): Json<CreateAuthorHttpRequest>,
) -> Result<ApiSuccess<CreatedHttpResponse>, ApiError> {
    let req = CreateAuthorRequest::try_from(body)?;
    state
        .catalog
        .add_author(&req)
        .await
        .map_err(ApiError::from)
        .map(|author| ApiSuccess::new(StatusCode::CREATED, CreatedHttpResponse { id: author.id() }))
}

pub async fn create_book<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Json(body): Json<CreateBookHttpRequest>,
) -> Result<ApiSuccess<CreatedHttpResponse>, ApiError> {
    let req = CreateBookRequest::try_from(body)?;
    state
        .catalog
        .add_book(&req)
        .await
        .map_err(ApiError::from)
        .map(|book| ApiSuccess::new(StatusCode::CREATED, CreatedHttpResponse { id: book.id() }))
}

pub async fn delete_book<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Path(book_id): Path<i64>,
) -> Result<ApiSuccess<DeleteBookHttpResponse>, ApiError> {
    state
        .catalog
        .delete_book(&DeleteBookRequest::new(book_id))
        .await
        .map_err(ApiError::from)
        .map(|deleted| ApiSuccess::new(StatusCode::OK, deleted.into()))
}
