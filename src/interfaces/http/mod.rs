use crate::application::use_cases::prompt_relay::PromptRelayUseCase;
use crate::domain::endpoint::EndpointProfile;
use crate::domain::error::AppError;
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::config::{AppConfig, ServerConfig};
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{dev::Server, get, web, App, HttpResponse, HttpServer, Responder, ResponseError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub struct HttpState {
    pub relay_use_case: Arc<PromptRelayUseCase>,
    pub llm_config: LLMConfig,
    pub profile_names: Vec<String>,
}

#[derive(Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    profiles: &'a [String],
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let detail = match self {
            AppError::ValidationError(msg) => msg.clone(),
            AppError::Upstream { message, .. } => message.clone(),
            _ => "Internal server error".to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "detail": detail }))
    }
}

#[get("/health")]
async fn health(data: web::Data<HttpState>) -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        profiles: &data.profile_names,
    })
}

async fn relay(
    data: web::Data<HttpState>,
    profile: web::Data<EndpointProfile>,
    body: web::Json<Map<String, Value>>,
) -> HttpResponse {
    match data
        .relay_use_case
        .execute(&data.llm_config, &profile, &body)
        .await
    {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            match &e {
                AppError::ValidationError(_) => {
                    warn!("[{}] Rejected request: {}", profile.name, e)
                }
                AppError::Upstream { .. } => {
                    error!("[{}] HTTP error while calling provider: {}", profile.name, e)
                }
                _ => error!("[{}] Unexpected error: {}", profile.name, e),
            }
            e.error_response()
        }
    }
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .error_handler(|err, _req| {
            let detail = err.to_string();
            warn!("Rejected request body: {}", detail);
            actix_web::error::InternalError::from_response(
                err,
                HttpResponse::UnprocessableEntity().json(json!({ "detail": detail })),
            )
            .into()
        })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, endpoints: &[EndpointProfile]) {
    cfg.app_data(json_config()).service(health);
    for profile in endpoints {
        cfg.service(
            web::resource(profile.path.clone())
                .app_data(web::Data::new(profile.clone()))
                .route(web::post().to(relay)),
        );
    }
}

fn build_cors(server: &ServerConfig) -> Cors {
    if server.allows_any_origin() {
        return Cors::permissive();
    }
    server.allowed_origins.iter().fold(
        Cors::default().allow_any_method().allow_any_header(),
        |cors, origin| cors.allowed_origin(origin.trim_end_matches('/')),
    )
}

pub fn start_server(
    config: &AppConfig,
    relay_use_case: Arc<PromptRelayUseCase>,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState {
        relay_use_case,
        llm_config: config.llm.clone(),
        profile_names: config.endpoints.iter().map(|p| p.name.clone()).collect(),
    });
    let server_config = config.server.clone();
    let endpoints = config.endpoints.clone();

    for profile in &endpoints {
        info!(
            "Route POST {} -> {} ({:?})",
            profile.path, profile.name, profile.shape
        );
    }

    let server = HttpServer::new(move || {
        let endpoints = endpoints.clone();
        App::new()
            .wrap(build_cors(&server_config))
            .app_data(state.clone())
            .configure(move |cfg| configure_routes(cfg, &endpoints))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run();

    info!(
        "Listening on http://{}:{}",
        config.server.host, config.server.port
    );
    Ok(server)
}
