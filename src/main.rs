#[tokio::main]
async fn main() {
    if let Err(e) = flip_estimator::api::cli::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
