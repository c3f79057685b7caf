use axum::Router;
use tokio::net::TcpListener;

/// Serves `app` on a random local port and returns its base URL.
pub async fn spawn_upstream(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Upstream failed");
    });
    format!("http://{}", addr)
}
