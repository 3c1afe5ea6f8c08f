use askama::Template;
use axum::{
    Extension, Json, Router,
    extract::OriginalUri,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde_json::Value;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use urs_jwt::{
    CurrentUser, Payload, Urs, callback::callback_url, config::load_config_or_panic, require_jwt,
};

fn initialize_standard_tracing() {
    let default_directives = "urs_jwt=info,urs_jwt_demo=info,hyper=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    login_url: String,
}

async fn index(
    Extension(urs): Extension<Urs>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let redirect_uri = callback_url(urs.config(), &uri, &headers);
    let page = IndexTemplate {
        login_url: urs.authorize_url(&redirect_uri),
    };
    match page.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render index template: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

async fn me(CurrentUser(user): CurrentUser) -> Json<Payload> {
    Json(user)
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    initialize_standard_tracing();

    let config = load_config_or_panic();
    let bind_address = config.bind_address.clone();

    let urs = Urs::builder(config)
        .payload_handler(|mut profile| {
            profile.insert(
                "custom_data".to_string(),
                Value::String("Some custom data".to_string()),
            );
            profile
        })
        .build()?;

    let protected = Router::new().route("/me", get(me)).route_layer(
        middleware::from_fn_with_state(urs.jwt_required(None), require_jwt::<Payload>),
    );

    let app = Router::new()
        .route("/", get(index))
        .merge(protected)
        .merge(urs.router())
        .layer(Extension(urs.clone()))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(addr = %bind_address, callback = %urs.redirect_url_rule(), "Server running");
    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
