mod cli;
mod demo;
mod infra;

use hiring_pipeline::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
