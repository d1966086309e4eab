#[actix_web::main]
async fn main() {
    if let Err(err) = prompt_relay_lib::run().await {
        eprintln!("prompt-relay: {}", err);
        std::process::exit(1);
    }
}
