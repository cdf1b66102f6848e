mod handler;
mod page;
mod templates;

use crate::repositories::CatalogRepository;
use crate::service::CatalogService;
use anyhow::Context;
use axum::Router;
use axum::routing::{delete, get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use templates::Templates;

#[derive(Debug)]
pub struct AppState<R> {
    catalog: CatalogService<R>,
    templates: Arc<Templates>,
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            catalog: self.catalog.clone(),
            templates: Arc::clone(&self.templates),
        }
    }
}

impl<R: CatalogRepository> AppState<R> {
    pub fn new(catalog: CatalogService<R>) -> anyhow::Result<Self> {
        let templates = Templates::new().context("Failed to compile page templates")?;
        Ok(Self {
            catalog,
            templates: Arc::new(templates),
        })
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    port: u16,
}

impl HttpServerConfig {
    pub const fn new(port: u16) -> Self {
        Self { port }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<R: CatalogRepository>(
        state: AppState<R>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
            .await
            .with_context(|| format!("Failed to bind to port {}", config.port))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self
            .listener
            .local_addr()
            .context("Failed to read listener address")?;
        info!("Listening on {addr}");

        axum::serve(self.listener, self.router)
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

pub fn router<R: CatalogRepository>(state: AppState<R>) -> Router {
    Router::new()
        .route("/", get(page::index::<R>))
        .route(
            "/add_author",
            get(page::add_author_form::<R>).post(page::add_author::<R>),
        )
        .route(
            "/add_book",
            get(page::add_book_form::<R>).post(page::add_book::<R>),
        )
        .route("/book/{book_id}/delete", post(page::delete_book::<R>))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes<R: CatalogRepository>() -> Router<AppState<R>> {
    Router::new()
        .route(
            "/authors",
            get(handler::list_authors::<R>).post(handler::create_author::<R>),
        )
        .route(
            "/books",
            get(handler::list_books::<R>).post(handler::create_book::<R>),
        )
        .route("/books/{book_id}", delete(handler::delete_book::<R>))
}
