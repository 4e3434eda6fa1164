//! Catalog route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::OptionalUser;
use crate::models::{CurrentUser, Product};
use crate::routes::MessageQuery;
use crate::state::AppState;

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub user: Option<CurrentUser>,
    pub products: Vec<Product>,
    pub error: Option<&'static str>,
    pub success: Option<&'static str>,
}

/// Display the catalog page.
///
/// Renders for everyone; the add-to-cart forms POST to a protected route, so
/// a signed-out visitor who submits one lands on the login page instead of
/// writing anything.
///
/// A catalog fetch failure degrades to an empty grid with an error banner
/// rather than an error page.
#[instrument(skip(state, user))]
pub async fn index(
    State(state): State<AppState>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let (products, load_error) = match state.catalog().list_products().await {
        Ok(products) => (products, None),
        Err(error) => {
            tracing::error!(%error, "Failed to load catalog");
            (Vec::new(), Some("The catalog is unavailable right now."))
        }
    };

    CatalogTemplate {
        user,
        products,
        error: load_error.or_else(|| query.error_text()),
        success: query.success_text(),
    }
}
