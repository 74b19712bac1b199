#[tokio::main]
async fn main() {
    if let Err(e) = reelrelay_lib::run().await {
        eprintln!("Server error: {:#}", e);
        std::process::exit(1);
    }
}
