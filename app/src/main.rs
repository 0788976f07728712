use std::io;

use actix_web::{middleware, App, HttpServer};
use log::info;

use site_security_app::config::AppConfig;
use site_security_app::{site_service, SiteSecurity};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;
    let key = config.session_key().map_err(io::Error::other)?;
    let users = config.load_users().map_err(io::Error::other)?;
    info!(
        "Loaded {} account(s), rule ordering {:?}",
        users.len(),
        config.rule_ordering
    );

    let security = SiteSecurity::new(users, config.rule_ordering, config.secure_cookies);
    for rule in security.policy.rules() {
        info!("Access rule {}", rule);
    }

    let secure_cookies = config.secure_cookies;
    info!("Listening on http://{}", config.bind);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .service(site_service(&security, key.clone(), secure_cookies))
    })
    .bind(config.bind)?
    .run()
    .await
}
