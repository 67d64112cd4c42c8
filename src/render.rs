// src/render.rs

//! Markdown to HTML page rendering with a three-tier fallback.
//!
//! A request walks `Primary → NotFound → Error`. Each tier either produces a
//! page or hands over to the next one, and the error tier always terminates,
//! so the status code matches the outcome even when no body can be rendered.

use crate::config::ServerConfig;
use crate::error::RenderError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::Environment;
use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use std::io;
use std::path::Path;
use tracing::{error, info};

const PAGE_TEMPLATE_NAME: &str = "page.html";
const PAGE_TEMPLATE: &str = include_str!("../assets/page.html");

const NOT_FOUND_LABEL: &str = "File Not Found";
const NOT_FOUND_CONTENT: &str = "<h1>404: Page Not Found</h1>";
const ERROR_LABEL: &str = "Internal Server Error";

/// Converts GitHub-flavoured Markdown to an HTML fragment.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM;
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

/// Per-request data handed to the page template.
#[derive(Debug, Clone, Serialize)]
pub struct RenderRequest {
    pub file_path: String,
    pub display_name: String,
    pub html_content: String,
    pub port: u16,
    pub live_reload: bool,
}

/// Something that can turn a [`RenderRequest`] into a full HTML page.
pub trait PageTemplate: Send + Sync {
    fn render(&self, page: &RenderRequest) -> Result<String, RenderError>;
}

/// The built-in page template, auto-escaped except for the article body.
pub struct HtmlTemplate {
    env: Environment<'static>,
}

impl HtmlTemplate {
    pub fn new() -> Result<Self, RenderError> {
        let mut env = Environment::new();
        env.add_template(PAGE_TEMPLATE_NAME, PAGE_TEMPLATE)?;
        Ok(Self { env })
    }
}

impl PageTemplate for HtmlTemplate {
    fn render(&self, page: &RenderRequest) -> Result<String, RenderError> {
        let template = self.env.get_template(PAGE_TEMPLATE_NAME)?;
        Ok(template.render(page)?)
    }
}

/// Which tier produced the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    NotFound,
    InternalError,
}

impl Outcome {
    pub fn status(self) -> StatusCode {
        match self {
            Outcome::Rendered => StatusCode::OK,
            Outcome::NotFound => StatusCode::NOT_FOUND,
            Outcome::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A finished response. The body may be empty if even the error page failed.
#[derive(Debug, Clone)]
pub struct Page {
    pub outcome: Outcome,
    pub body: String,
}

impl Page {
    pub fn status(&self) -> StatusCode {
        self.outcome.status()
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        (self.status(), Html(self.body)).into_response()
    }
}

enum Tier {
    Primary(io::Result<Vec<u8>>),
    NotFound,
    Error(String),
}

impl Tier {
    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Tier::NotFound,
            _ => Tier::Error(err.to_string()),
        }
    }
}

enum Step {
    Done(Page),
    Next(Tier),
}

/// Reads, converts and templates Markdown files, falling back to error pages.
pub struct RenderPipeline {
    template: Box<dyn PageTemplate>,
    port: u16,
    live_reload: bool,
}

impl RenderPipeline {
    pub fn new(template: impl PageTemplate + 'static, config: &ServerConfig) -> Self {
        Self {
            template: Box::new(template),
            port: config.port,
            live_reload: config.live_reload,
        }
    }

    /// Renders the Markdown file at `path`. Never fails: every error becomes
    /// a 404 or 500 page.
    pub async fn render(&self, path: &Path) -> Page {
        info!("Rendering {}", path.display());
        let read = tokio::fs::read(path).await;
        self.run(path, Tier::Primary(read))
    }

    /// Builds the page for a failed file access, entering the fallback at the
    /// not-found tier for missing files and at the error tier otherwise.
    pub fn fallback(&self, path: &Path, err: &io::Error) -> Page {
        self.run(path, Tier::from_io(err))
    }

    fn run(&self, path: &Path, mut tier: Tier) -> Page {
        loop {
            tier = match self.step(path, tier) {
                Step::Done(page) => return page,
                Step::Next(next) => next,
            };
        }
    }

    fn step(&self, path: &Path, tier: Tier) -> Step {
        match tier {
            Tier::Primary(Ok(bytes)) => {
                let markdown = String::from_utf8_lossy(&bytes);
                let page = self.request(path, base_name(path), markdown_to_html(&markdown));
                match self.template.render(&page) {
                    Ok(body) => Step::Done(Page {
                        outcome: Outcome::Rendered,
                        body,
                    }),
                    Err(e) => Step::Next(Tier::Error(e.to_string())),
                }
            }
            Tier::Primary(Err(e)) => Step::Next(Tier::from_io(&e)),
            Tier::NotFound => {
                let page = self.request(path, NOT_FOUND_LABEL.into(), NOT_FOUND_CONTENT.into());
                match self.template.render(&page) {
                    Ok(body) => Step::Done(Page {
                        outcome: Outcome::NotFound,
                        body,
                    }),
                    Err(e) => Step::Next(Tier::Error(e.to_string())),
                }
            }
            Tier::Error(cause) => {
                let content = format!(
                    "<h1>500 Internal Server Error: {}</h1>",
                    escape_html(&cause)
                );
                let page = self.request(path, ERROR_LABEL.into(), content);
                let body = self.template.render(&page).unwrap_or_else(|e| {
                    error!("Failed to render error page for {}: {}", path.display(), e);
                    String::new()
                });
                Step::Done(Page {
                    outcome: Outcome::InternalError,
                    body,
                })
            }
        }
    }

    fn request(&self, path: &Path, display_name: String, html_content: String) -> RenderRequest {
        RenderRequest {
            file_path: path.display().to_string(),
            display_name,
            html_content,
            port: self.port,
            live_reload: self.live_reload,
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
