use std::time::Duration;

use tracing::{info, level_filters::LevelFilter};

#[strand::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    info!("hello");

    strand::time::sleep(Duration::from_millis(100)).await;

    info!("world");
}
