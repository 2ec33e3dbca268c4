// Jivbook backend: configuration, wiring and the HTTP application
pub mod app_state;
pub mod service_factory;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// The full HTTP application: health check plus the notification API under `/api`.
pub fn build_router(state: &AppState) -> Router {
    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the Jivbook API!" }))
        .merge(jivbook_notifications::routes(state.notifications.clone()));

    #[allow(unused_mut)] // mutated only with the openapi feature
    let mut app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_router);

    #[cfg(feature = "openapi")]
    {
        use jivbook_notifications::doc::NotificationApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Jivbook API",
                version = "0.1.0",
                description = "Jivbook push notification API"
            ),
            components(),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(NotificationApiDoc::openapi());
        tracing::info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
