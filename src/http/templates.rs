use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

const PARTIALS: [(&str, &str); 2] = [
    ("header", include_str!("../../templates/partials/header.hbs")),
    ("footer", include_str!("../../templates/partials/footer.hbs")),
];

const PAGES: [(&str, &str); 4] = [
    ("home", include_str!("../../templates/home.hbs")),
    ("add_author", include_str!("../../templates/add_author.hbs")),
    ("add_book", include_str!("../../templates/add_book.hbs")),
    ("error", include_str!("../../templates/error.hbs")),
];

/// HTML page templates, compiled once at startup.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in PARTIALS {
            registry.register_partial(name, source)?;
        }
        for (name, source) in PAGES {
            registry.register_template_string(name, source)?;
        }

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry.render(name, data)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("pages", &PAGES.map(|(name, _)| name))
            .finish_non_exhaustive()
    }
}
