#[tokio::main]
async fn main() {
    if let Err(err) = fetch_events::cli::run_all().await {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}
