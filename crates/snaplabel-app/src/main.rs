//! `snaplabel` command-line shell.
//!
//! Runs one capture cycle against a still image file, or lists stored
//! history.

use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use snaplabel_app::{
    AppConfig, AppError, CaptureCoordinator, RequestDispatch, app_version, project_runtime_status,
    redact_sensitive,
};
use snaplabel_capture::FileCaptureBackend;
use snaplabel_client::{HttpLabelTransport, LabelRequestClient, RequestConfig};
use snaplabel_history::{FileKeyValueStore, HistoryStore};
use snaplabel_ui::UiState;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str =
    "snaplabel=info,snaplabel_app=info,snaplabel_client=info,snaplabel_history=info";

const USAGE: &str = "usage: snaplabel <snap IMAGE_PATH | history | --version>";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("--version") | Some("-V") => {
            println!("snaplabel {}", app_version());
            Ok(())
        }
        Some("snap") => match args.get(1) {
            Some(path) => run_snap(path),
            None => {
                eprintln!("{USAGE}");
                return ExitCode::from(2);
            }
        },
        Some("history") => run_history(),
        _ => {
            eprintln!("{USAGE}");
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("snaplabel: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_snap(image_path: &str) -> Result<(), AppError> {
    let config = AppConfig::from_env();
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| AppError::Config("SNAPLABEL_API_KEY is not set".to_string()))?;

    info!(
        stage = "startup",
        action = "config_loaded",
        endpoint = %redact_sensitive(&config.endpoint),
        history_dir = %config.history_dir.display(),
        timeout_ms = config.request_timeout.as_millis() as u64,
    );

    let transport = HttpLabelTransport::new(api_key, config.request_timeout)?;
    let client = LabelRequestClient::new(
        &config.endpoint,
        RequestConfig {
            max_results: config.max_results,
        },
        Arc::new(transport),
    )?;
    let history = HistoryStore::new(Arc::new(FileKeyValueStore::new(&config.history_dir)));
    let camera = Arc::new(FileCaptureBackend::new(image_path));

    let mut coordinator =
        CaptureCoordinator::new(camera, client, history).with_dispatch(RequestDispatch::Background);
    coordinator.set_capture_enabled(config.capture_enabled);

    let ui = Arc::new(Mutex::new(UiState::new()));
    let ui_sink = Arc::clone(&ui);
    coordinator.register_handler(move |event| {
        if let Ok(mut state) = ui_sink.lock() {
            state.apply_event(event);
        }
    });

    coordinator.start_session()?;
    if let Ok(mut state) = ui.lock() {
        state.begin_capture();
    }
    let cycle = coordinator
        .trigger()
        .and_then(|_| coordinator.run_until_idle());
    coordinator.stop_session();

    let snapshot = {
        let state = ui.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        project_runtime_status(coordinator.state(), config.capture_enabled, &state)
    };

    if !config.capture_enabled {
        println!("capture is disabled (SNAPLABEL_CAPTURE_ENABLED)");
    } else if let Some(headline) = &snapshot.headline {
        println!("{headline}");
    } else if let Some(alert) = &snapshot.alert {
        println!("{alert}");
    }

    cycle.map(|_| ())
}

fn run_history() -> Result<(), AppError> {
    let config = AppConfig::from_env();
    let history = HistoryStore::new(Arc::new(FileKeyValueStore::new(&config.history_dir)));

    let entries = history.read_all()?;
    if entries.is_empty() {
        println!("no history yet");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}\t{} bytes\t{}",
            entry.word,
            entry.image.len(),
            entry.recorded_at_ms
        );
    }
    Ok(())
}
