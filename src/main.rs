#[tokio::main]
async fn main() {
    if let Err(e) = prescreen_lib::run().await {
        eprintln!("prescreen: {e}");
        std::process::exit(1);
    }
}
