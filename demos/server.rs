use std::env;

use ble_hid_peripheral::{Application, Config, Peripheral};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = match env::args().nth(1) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("ERROR: failed to load {}: {}", path, err);
                return;
            }
        },
        None => Config::default(),
    };

    let mut logger = pretty_env_logger::formatted_builder();
    match &config.log_level {
        Some(level) => logger.parse_filters(level),
        None => logger.parse_filters(&env::var("RUST_LOG").unwrap_or_else(|_| "info".into())),
    };
    if let Err(err) = logger.try_init() {
        eprintln!("WARNING: failed to initialize logging framework: {}", err);
    }

    let mut app = match Application::from_config(&config) {
        Ok(app) => app,
        Err(err) => {
            log::error!("failed to build {:?} profile: {}", config.profile, err);
            return;
        }
    };
    let mut peripheral = match Peripheral::with_adapter(config.adapter.as_deref()).await {
        Ok(peripheral) => peripheral,
        Err(err) => {
            log::error!("failed to open adapter: {}", err);
            return;
        }
    };

    log::info!(
        "serving {:?} as {:?}, press Ctrl-C to stop",
        config.profile,
        config.local_name
    );
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("cannot listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };
    if let Err(err) = app.serve(&mut peripheral, shutdown).await {
        log::error!("{}", err);
    }
}
