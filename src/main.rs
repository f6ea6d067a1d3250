use anyhow::Result;
use hvac_price_control::{config, controller, telemetry};
use config::Config;
use controller::HvacController;
use telemetry::init_tracing;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    if cfg.heating.indoor_sensors.is_empty() {
        warn!("no indoor sensors configured, indoor corrections stay at zero");
    }

    let controller = HvacController::new(&cfg);

    info!(
        tick_seconds = cfg.controller.tick_seconds,
        input = %cfg.controller.input_path.display(),
        tolerance = cfg.heating.tolerance,
        "starting hvac price control"
    );

    tokio::select! {
        res = controller.run(&cfg.controller) => {
            if let Err(e) = res {
                error!(error = %e, "controller loop stopped");
                return Err(e);
            }
        }
        _ = telemetry::shutdown_signal() => {}
    }

    warn!("shutdown complete");
    Ok(())
}
