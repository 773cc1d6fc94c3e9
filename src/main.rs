use anyhow::Result;
use atelier_storefront::{
    bootstrap::{self, bootstrap},
    config, db, routes, swagger,
};
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let api = routes::payments::routes_with_openapi()
        .merge(routes::carts::routes_with_openapi())
        .merge(routes::orders::routes_with_openapi());

    let mut openapi = api.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Atelier Storefront API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new()
        .merge(api)
        .merge(swagger_ui)
        .merge(routes::products::routes())
        .merge(routes::professions::routes())
        .merge(routes::users::routes())
        .merge(routes::policies::routes())
        .merge(routes::testimonials::routes())
        .merge(routes::newsletter::routes())
        .merge(routes::draws::routes())
        .merge(routes::contact::routes());

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    bootstrap("StorefrontService", app).await?;
    Ok(())
}
