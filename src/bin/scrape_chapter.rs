use std::process::ExitCode;

use clap::Parser;

use chapter_extract::batch;
use chapter_extract::config::BatchConfig;

#[tokio::main]
async fn main() -> ExitCode {
    chapter_extract::init_tracing();
    let config = BatchConfig::parse();

    let outcome = match config.extract.build_extractor() {
        Ok(extractor) => batch::run(&extractor, &config.url, &config.output)
            .await
            .map(|_| ()),
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e:#}");
            println!("Failed to scrape chapter");
            ExitCode::FAILURE
        }
    }
}
