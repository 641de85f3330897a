#[tokio::main]
async fn main() {
    if let Err(err) = careledger::run().await {
        eprintln!("careledger failed to start: {err}");
        std::process::exit(1);
    }
}
