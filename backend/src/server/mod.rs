//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::{AppConfig, BuildMode};
pub use state_builders::build_http_state;

use std::net::SocketAddr;

use actix_cors::Cors;
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::Condition;
use actix_web::{App, HttpServer, http::header, web};

use pantry_backend::Trace;
#[cfg(debug_assertions)]
use pantry_backend::doc::ApiDoc;
use pantry_backend::inbound::http::credits::{add_credits, get_wallet, list_transactions};
use pantry_backend::inbound::http::health::{HealthState, live, ready};
use pantry_backend::inbound::http::pantries::{
    add_member, create_pantry, list_ingredients, remove_member,
};
use pantry_backend::inbound::http::recipes::{
    chat, generate_recipes, get_recipe, list_recipes, save_recipes,
};
use pantry_backend::inbound::http::shopping_lists::generate_shopping_list;
use pantry_backend::inbound::http::state::HttpState;
use pantry_backend::inbound::http::validation::{json_config, query_config};
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

/// Listener settings plus the handler state shared by every worker.
pub struct ServerConfig {
    bind_addr: SocketAddr,
    http_state: web::Data<HttpState>,
    cors_origin: Option<String>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, http_state: web::Data<HttpState>) -> Self {
        Self {
            bind_addr,
            http_state,
            cors_origin: None,
        }
    }

    /// Allow browser calls from one origin.
    #[must_use]
    pub fn with_cors_origin(mut self, origin: Option<String>) -> Self {
        self.cors_origin = origin;
        self
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    cors_origin: Option<String>,
}

fn cors(origin: Option<&str>) -> Cors {
    match origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allowed_methods(["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .expose_headers(["trace-id"])
            .max_age(3600),
        None => Cors::default(),
    }
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        cors_origin,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .app_data(query_config())
        .wrap(Trace)
        .wrap(Condition::new(
            cors_origin.is_some(),
            cors(cors_origin.as_deref()),
        ))
        .service(get_wallet)
        .service(list_transactions)
        .service(add_credits)
        .service(generate_recipes)
        .service(chat)
        .service(save_recipes)
        .service(list_recipes)
        .service(get_recipe)
        .service(generate_shopping_list)
        .service(create_pantry)
        .service(list_ingredients)
        .service(add_member)
        .service(remove_member)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    app
}

/// Construct an Actix HTTP server using the provided health state and configuration.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let server_health_state = health_state.clone();
    let ServerConfig {
        bind_addr,
        http_state,
        cors_origin,
    } = config;

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            cors_origin: cors_origin.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
