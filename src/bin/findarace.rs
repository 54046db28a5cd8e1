use fetch_events::{cli, spiders::SpiderKind};

#[tokio::main]
async fn main() {
    if let Err(err) = cli::run_spider(SpiderKind::FindARace).await {
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}
