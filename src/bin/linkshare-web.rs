//! linkshare-web: link-in-bio server binary.

#[tokio::main]
async fn main() {
    linkshare::web::run().await;
}
