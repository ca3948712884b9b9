#[tokio::main]
async fn main() {
    stockbook_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let addr = std::env::var("STOCKBOOK_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let app = stockbook_api::app::build_app(jwt_secret).await;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", addr);

    axum::serve(listener, app).await.expect("server terminated");
}
