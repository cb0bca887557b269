use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, Responder, get, web};
use farm_dashboard::{api, config::Config, state::AppState};
use std::io;
use std::sync::Mutex;

#[get("/")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "Farm Dashboard Backend",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(io::Error::other)?;
    let state = AppState::new(&config.admin_password)
        .map_err(|e| io::Error::other(e.to_string()))?;
    let state = web::Data::new(Mutex::new(state));

    let bind = (config.bind_address.clone(), config.port);
    let payload_limit = config.max_upload_bytes;
    let config = web::Data::new(config);

    log::info!("Starting Farm Dashboard Backend at http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .app_data(config.clone())
            .app_data(web::PayloadConfig::new(payload_limit))
            .service(health_check)
            .configure(api::config)
    })
    .bind(bind)?
    .run()
    .await
}
