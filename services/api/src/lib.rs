mod cli;
mod demo;
mod infra;
mod mocks;
mod routes;
mod rules;
mod server;

use loan_orchestrator::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
