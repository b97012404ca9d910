use axum::Router;
use tokio::net::TcpListener;

/// Serve `app` on a random local port and return its base URL.
///
/// Used to stand in for Firefly III, Telegram, the importer and the health
/// check service.
pub(crate) async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test listener");
    let address = listener
        .local_addr()
        .expect("Could not get test listener address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server stopped unexpectedly");
    });

    format!("http://{address}")
}
