#[tokio::main]
async fn main() {
    // Delegate to the server framework entry point.
    if let Err(e) = sim_server::run_with_config().await {
        eprintln!("sim_server failed: {e}");
        std::process::exit(1);
    }
}
