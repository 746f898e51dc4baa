//! Main application entry point (native).

#[cfg(feature = "native")]
fn main() {
    env_logger::init();
    log::info!("Starting PanelKit demo");

    let script = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(script) => script,
            Err(e) => {
                log::error!("Failed to read script {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => panelkit_app::DEFAULT_SCRIPT.to_string(),
    };

    match panelkit_app::run_demo(&script) {
        Ok(report) => {
            log::info!(
                "Demo finished: {} of {} steps handled",
                report.handled,
                report.steps
            );
            println!("{:#?}", report);
        }
        Err(e) => {
            log::error!("Demo failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
