//! Editorial content: the blog and the curated homepage. News items are plain catalog
//! resources and live in [`crate::catalog`].

pub mod blog;
pub mod homepage;

use axum::Router;

use crate::http::AppContext;

pub use blog::{BlogPost, BlogPostInput, BlogPostPatch};
pub use homepage::{render as render_homepage, HomepageSection, SectionKind, SectionView};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(blog::routes())
        .merge(homepage::routes())
}
