use std::net::TcpListener;

use axum::{Router, Server};
use common::config::Endpoints;

/// Start a mock remote service on a random local port.
///
/// Returns the base URL of the started server.
pub(crate) async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("unable to bind mock server");
    let address = listener.local_addr().expect("unable to get mock server address");

    let server = Server::from_tcp(listener)
        .expect("unable to create mock server")
        .serve(router.into_make_service());

    tokio::spawn(server);

    format!("http://{address}")
}

/// Endpoints pointing at a mock remote service.
pub(crate) fn endpoints(base: &str) -> Endpoints {
    Endpoints {
        deploy_url: format!("{base}/deploy-from-cli"),
        upload_url: format!("{base}/upload-file"),
    }
}
