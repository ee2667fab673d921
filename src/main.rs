#[tokio::main]
async fn main() {
    agromart::start_server().await;
}
