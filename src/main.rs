use std::{process, sync::Arc};

use cf2pdf::{
    application::{
        convert::ConversionService,
        error::AppError,
        render::{RenderStrategy, RenderToolchain},
    },
    config,
    domain::problem::ProblemRef,
    infra::{fetch::HttpProblemSource, pdf::WeasyprintBuilder, telemetry},
};
use tracing::{debug, dispatcher, error};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(target = "cf2pdf", error = %error, "conversion failed");
        return;
    }

    let dispatch = telemetry::fallback_dispatch();
    dispatcher::with_default(&dispatch, || {
        error!(target = "cf2pdf", error = %error, "conversion failed");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let problem = ProblemRef::new(cli_args.contest_id, cli_args.problem.as_str())?;
    let mode = settings.render.mode;
    debug!(
        target = "cf2pdf",
        op = "startup",
        problem = %problem,
        mode = %mode,
        base_url = %settings.fetch.base_url,
        "Starting conversion"
    );

    let source = HttpProblemSource::new(&settings.fetch)?;
    let renderer = RenderStrategy::from_mode(mode, &RenderToolchain::from(&settings.render));
    let pdf = WeasyprintBuilder::new(&settings.pdf);

    let service = ConversionService::new(
        Arc::new(source),
        Arc::new(renderer),
        Arc::new(pdf),
        mode,
        settings.render.scratch_dir.clone(),
    );
    service.convert(&problem, &cli_args.output_dir).await?;
    Ok(())
}
