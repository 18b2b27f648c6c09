use aml_screening_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("aml-screening: {err}");
        std::process::exit(1);
    }
}
