use super::Templates;
use super::handler::{ParseCreateAuthorHttpRequestError, ParseCreateBookHttpRequestError};
use crate::http::AppState;
use crate::models::{
    Author, AuthorName, BookListing, BookOrder, BookTitle, CreateAuthorError, CreateAuthorRequest,
    CreateBookError, CreateBookRequest, DeleteBookError, DeleteBookRequest, Isbn, LifeDate,
    ListBooksRequest, PublicationYear, parse_author_id,
};
use crate::repositories::CatalogRepository;
use axum::extract::rejection::PathRejection;
use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug)]
pub struct Page(StatusCode, Html<String>);

impl Page {
    fn render<T: Serialize>(templates: &Templates, status: StatusCode, name: &str, data: &T) -> Self {
        match templates.render(name, data) {
            Ok(html) => Self(status, Html(html)),
            Err(err) => {
                error!("Failed to render page {name}: {err}");
                Self(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html("Internal server error".to_string()),
                )
            }
        }
    }

    fn error(templates: &Templates, status: StatusCode, message: &str) -> Self {
        let view = ErrorView {
            page_title: status.canonical_reason().unwrap_or("Error"),
            message,
        };
        Self::render(templates, status, "error", &view)
    }

    fn internal(templates: &Templates, cause: &anyhow::Error) -> Self {
        error!("{cause:?}");
        Self::error(
            templates,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
        )
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// A one-shot message shown above the page content.
#[derive(Debug, Serialize)]
struct Notice {
    kind: &'static str,
    message: String,
}

impl Notice {
    fn success(message: String) -> Self {
        Self {
            kind: "success",
            message,
        }
    }

    fn rejection(message: String) -> Self {
        Self {
            kind: "error",
            message,
        }
    }

    /// A notice read back from a query string. Anyone can craft the link, so
    /// it is shown as neutral information rather than a confirmation.
    fn carried(message: String) -> Self {
        Self {
            kind: "info",
            message,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorView<'a> {
    page_title: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct BookView {
    id: i64,
    isbn: String,
    title: String,
    publication_year: Option<i32>,
    author: Option<String>,
}

impl From<&BookListing> for BookView {
    fn from(value: &BookListing) -> Self {
        let book = value.book();
        Self {
            id: book.id(),
            isbn: book.isbn().to_string(),
            title: book.title().to_string(),
            publication_year: book.publication_year().map(PublicationYear::value),
            author: value.author_name().map(AuthorName::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthorView {
    id: i64,
    label: String,
}

impl From<&Author> for AuthorView {
    fn from(value: &Author) -> Self {
        Self {
            id: value.id(),
            label: value.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct HomeView {
    page_title: &'static str,
    books: Vec<BookView>,
    search: String,
    sort: &'static str,
    notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
struct AddAuthorView {
    page_title: &'static str,
    notice: Option<Notice>,
}

#[derive(Debug, Serialize)]
struct AddBookView {
    page_title: &'static str,
    authors: Vec<AuthorView>,
    notice: Option<Notice>,
}

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    search: Option<String>,
    sort: Option<String>,
    notice: Option<String>,
}

pub async fn index<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Query(query): Query<IndexQuery>,
) -> Page {
    let order = BookOrder::from_key(query.sort.as_deref());
    let req = ListBooksRequest::new(query.search.as_deref(), order);
    let books = match state.catalog.list_books(&req).await {
        Ok(books) => books,
        Err(err) => return Page::internal(&state.templates, &err.0),
    };

    let view = HomeView {
        page_title: "Library",
        books: books.iter().map(BookView::from).collect(),
        search: req.search().unwrap_or_default().to_string(),
        sort: order.as_str(),
        notice: query.notice.map(Notice::carried),
    };
    Page::render(&state.templates, StatusCode::OK, "home", &view)
}

#[derive(Debug, Deserialize)]
pub struct AddAuthorForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    birthdate: String,
    #[serde(default)]
    date_of_death: String,
}

impl TryFrom<AddAuthorForm> for CreateAuthorRequest {
    type Error = ParseCreateAuthorHttpRequestError;

    fn try_from(value: AddAuthorForm) -> Result<Self, Self::Error> {
        let name = AuthorName::new(&value.name)?;
        let birth_date = LifeDate::parse_optional(&value.birthdate)
            .map_err(ParseCreateAuthorHttpRequestError::BirthDate)?;
        let date_of_death = LifeDate::parse_optional(&value.date_of_death)
            .map_err(ParseCreateAuthorHttpRequestError::DateOfDeath)?;
        Ok(Self::new(name, birth_date, date_of_death))
    }
}

pub async fn add_author_form<R: CatalogRepository>(State(state): State<AppState<R>>) -> Page {
    let view = AddAuthorView {
        page_title: "Add author",
        notice: None,
    };
    Page::render(&state.templates, StatusCode::OK, "add_author", &view)
}

pub async fn add_author<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Form(form): Form<AddAuthorForm>,
) -> Page {
    let (status, notice) = match CreateAuthorRequest::try_from(form) {
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Notice::rejection(err.to_string()),
        ),
        Ok(req) => match state.catalog.add_author(&req).await {
            Ok(author) => (
                StatusCode::OK,
                Notice::success(format!("Author '{}' added successfully!", author.name())),
            ),
            Err(err @ CreateAuthorError::Duplicate { .. }) => {
                (StatusCode::CONFLICT, Notice::rejection(err.to_string()))
            }
            Err(CreateAuthorError::Other(cause)) => {
                return Page::internal(&state.templates, &cause);
            }
        },
    };

    let view = AddAuthorView {
        page_title: "Add author",
        notice: Some(notice),
    };
    Page::render(&state.templates, status, "add_author", &view)
}

#[derive(Debug, Deserialize)]
pub struct AddBookForm {
    #[serde(default)]
    isbn: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    publication_year: String,
    #[serde(default)]
    author_id: String,
}

impl TryFrom<AddBookForm> for CreateBookRequest {
    type Error = ParseCreateBookHttpRequestError;

    fn try_from(value: AddBookForm) -> Result<Self, Self::Error> {
        let isbn = Isbn::new(&value.isbn)?;
        let title = BookTitle::new(&value.title)?;
        let publication_year = PublicationYear::parse_optional(&value.publication_year)?;
        let author_id = parse_author_id(&value.author_id)?;
        Ok(Self::new(isbn, title, publication_year, author_id))
    }
}

async fn render_add_book<R: CatalogRepository>(
    state: &AppState<R>,
    status: StatusCode,
    notice: Option<Notice>,
) -> Page {
    let authors = match state.catalog.list_authors().await {
        Ok(authors) => authors,
        Err(err) => return Page::internal(&state.templates, &err.0),
    };

    let view = AddBookView {
        page_title: "Add book",
        authors: authors.iter().map(AuthorView::from).collect(),
        notice,
    };
    Page::render(&state.templates, status, "add_book", &view)
}

pub async fn add_book_form<R: CatalogRepository>(State(state): State<AppState<R>>) -> Page {
    render_add_book(&state, StatusCode::OK, None).await
}

/// A rejected book never produces a success notice.
pub async fn add_book<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    Form(form): Form<AddBookForm>,
) -> Page {
    let (status, notice) = match CreateBookRequest::try_from(form) {
        Err(err) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Notice::rejection(err.to_string()),
        ),
        Ok(req) => match state.catalog.add_book(&req).await {
            Ok(book) => (
                StatusCode::OK,
                Notice::success(format!("Book '{}' added successfully!", book.title())),
            ),
            Err(err @ CreateBookError::DuplicateIsbn { .. }) => {
                (StatusCode::CONFLICT, Notice::rejection(err.to_string()))
            }
            Err(err @ CreateBookError::UnknownAuthor { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Notice::rejection(err.to_string()),
            ),
            Err(CreateBookError::Other(cause)) => {
                return Page::internal(&state.templates, &cause);
            }
        },
    };

    render_add_book(&state, status, Some(notice)).await
}

pub async fn delete_book<R: CatalogRepository>(
    State(state): State<AppState<R>>,
    book_id: Result<Path<i64>, PathRejection>,
) -> Response {
    let Ok(Path(book_id)) = book_id else {
        return Page::error(&state.templates, StatusCode::NOT_FOUND, "Book does not exist")
            .into_response();
    };

    let deleted = match state
        .catalog
        .delete_book(&DeleteBookRequest::new(book_id))
        .await
    {
        Ok(deleted) => deleted,
        Err(err @ DeleteBookError::NotFound { .. }) => {
            return Page::error(&state.templates, StatusCode::NOT_FOUND, &err.to_string())
                .into_response();
        }
        Err(DeleteBookError::Other(cause)) => {
            return Page::internal(&state.templates, &cause).into_response();
        }
    };

    let notice = format!("Book '{}' deleted successfully!", deleted.book().title());
    match serde_urlencoded::to_string([("notice", notice.as_str())]) {
        Ok(query) => Redirect::to(&format!("/?{query}")).into_response(),
        Err(err) => Page::internal(&state.templates, &anyhow::Error::from(err)).into_response(),
    }
}
