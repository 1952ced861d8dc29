use std::{process, sync::Arc};

use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use yander::{
    application::{
        content::{ContentService, ListingLimits},
        dispatch::{DestinationSlot, Dispatcher},
        error::AppError,
        render::{AssetUrlBuilder, render_document, render_service},
        submissions::{ContactSalesService, WaitlistService},
    },
    config::{self, RenderArgs, Settings},
    domain::content::Document,
    infra::{
        cms::{CdnAssetUrls, CmsClient, NoAssetUrls},
        destinations::DestinationSet,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_writer(std::io::stderr)
        .with_max_level(Level::ERROR)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(&settings, args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let state = build_http_state(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            let _ = stop_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            return result.map_err(|err| AppError::unexpected(format!("server error: {err}")));
        }
        _ = stop_rx.wait_for(|stopping| *stopping) => {}
    }

    info!(
        grace_seconds = settings.server.graceful_shutdown.as_secs(),
        "draining in-flight requests"
    );
    match tokio::time::timeout(settings.server.graceful_shutdown, server).await {
        Ok(result) => result.map_err(|err| AppError::unexpected(format!("server error: {err}"))),
        Err(_) => {
            warn!("graceful shutdown timed out; dropping remaining connections");
            Ok(())
        }
    }
}

async fn wait_for_shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

fn build_http_state(settings: &Settings) -> Result<HttpState, AppError> {
    let destinations = DestinationSet::from_settings(&settings.destinations)?;
    for slot in [
        &destinations.email,
        &destinations.crm,
        &destinations.spreadsheet,
    ] {
        if let DestinationSlot::NotConfigured { name } = slot {
            warn!(destination = *name, "destination not configured; it will be skipped");
        }
    }

    let dispatcher = Dispatcher::new(settings.destinations.timeout);
    let waitlist = WaitlistService::new(
        dispatcher,
        destinations.crm.clone(),
        destinations.spreadsheet.clone(),
    );
    let contact_sales = ContactSalesService::new(
        dispatcher,
        destinations.email,
        destinations.crm,
        destinations.spreadsheet,
    );

    let content = match (
        CmsClient::from_settings(&settings.content)?,
        CdnAssetUrls::from_settings(&settings.content)?,
    ) {
        (Some(source), Some(assets)) => {
            info!(query_url = %source.query_url(), "content store configured");
            Some(Arc::new(ContentService::new(
                Arc::new(source),
                render_service(),
                Arc::new(assets),
                ListingLimits {
                    posts_per_page: settings.listing.posts_per_page.get(),
                    integrations_per_page: settings.listing.integrations_per_page.get(),
                },
            )))
        }
        _ => {
            warn!("content store not configured; content routes will answer 503");
            None
        }
    };

    Ok(HttpState {
        waitlist: Arc::new(waitlist),
        contact_sales: Arc::new(contact_sales),
        content,
    })
}

async fn run_render(settings: &Settings, args: RenderArgs) -> Result<(), AppError> {
    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let value: serde_json::Value = serde_json::from_str(&raw).map_err(|err| {
        AppError::unexpected(format!("{} is not valid JSON: {err}", args.file.display()))
    })?;
    let document = Document::from_json(&value);

    let cdn = CdnAssetUrls::from_settings(&settings.content)?;
    let assets: &dyn AssetUrlBuilder = match &cdn {
        Some(cdn) => cdn,
        None => &NoAssetUrls,
    };

    let renderer = render_service();
    let output = render_document(renderer.as_ref(), &document, assets);
    if !output.degradations.is_empty() {
        warn!(
            omitted = output.degradations.len(),
            "some blocks were left out of the output"
        );
    }

    println!("{}", output.html);
    if args.toc {
        let toc = serde_json::to_string_pretty(&output.toc)
            .map_err(|err| AppError::unexpected(format!("failed to encode toc: {err}")))?;
        println!("{toc}");
    }
    Ok(())
}
