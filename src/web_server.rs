use std::sync::Arc;

use actix_web::{App, HttpServer, dev::Server, middleware, web};

use crate::config::ServerConfig;
use crate::queue::JobQueue;
use crate::routes;
use crate::verifier::Verifier;

pub fn build_server(
    server_config: ServerConfig,
    verifier: Arc<Verifier>,
    job_queue: Arc<JobQueue>,
) -> std::io::Result<Server> {
    let verifier = web::Data::from(verifier);
    let job_queue = web::Data::from(job_queue);

    let bind_address = server_config
        .bind_address
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let bind_port = server_config.bind_port.unwrap_or(12345);
    log::info!("Listening on {bind_address}:{bind_port}");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(verifier.clone())
            .app_data(job_queue.clone())
            .wrap(middleware::Logger::default())
            .configure(routes::configure)
    })
    .bind((bind_address, bind_port))?
    .run();

    Ok(server)
}
