pub mod auth;
pub mod config;
pub mod err;
pub mod gate;
pub mod models;
pub mod pages;
pub mod theses;
pub mod token;
pub mod upload;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::handler::Handler;
use axum::routing::{get, post};
use axum::{middleware, Extension, Router};
use clap::Parser;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;

use crate::config::Config;
use crate::err::{Error, Success};
use crate::token::TokenKeys;

pub type Payload<T> = Result<Success<T>, Error>;

pub fn proceeds<V>(value: V) -> Payload<V>
where
    V: Serialize,
{
    Ok(Success::of(value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::parse();
    let keys = TokenKeys::new(&config.token_secret)?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await
        .context("Could not connect to database")?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("Database connection check failed")?;
    log::info!("Database connected successfully");

    upload::prepare_upload_dir(&config.upload_dir)
        .await
        .context("Could not prepare upload directory")?;

    let professor_pages = Router::new()
        .route("/teacher", get(pages::teacher_page))
        .route_layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(gate::authenticate))
                .layer(middleware::from_fn(gate::require_professor)),
        );
    let student_pages = Router::new()
        .route("/student", get(pages::student_page))
        .route_layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(gate::authenticate))
                .layer(middleware::from_fn(gate::require_student)),
        );
    let session_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/api/theses", get(theses::list_theses))
        .route("/api/theses/new", post(theses::create_thesis))
        .route("/upload", post(upload::upload_pdf))
        .route_layer(middleware::from_fn(gate::authenticate));

    let app = Router::new()
        .route("/", get(pages::index))
        .route("/login", get(pages::login_page).post(auth::login))
        .merge(professor_pages)
        .merge(student_pages)
        .merge(session_routes)
        .fallback(err::handler404.into_service())
        .layer(
            ServiceBuilder::new()
                .layer(Extension(pool))
                .layer(Extension(keys))
                .layer(Extension(config.clone())),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    log::info!("Starting thesis server on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
