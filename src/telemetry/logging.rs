use std::sync::OnceLock;

const HEADER_LINE: &str = "-------------------------------------------------------------------------------";
const HEADER_TITLE: &str = "Tibia - Graphical Multi-User-Dungeon";

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Installs `env_logger` behind the `log` facade. `filter` uses the
/// `RUST_LOG` syntax, e.g. `info,light=debug`; a second call is a no-op.
pub fn init(filter: &str) -> Result<(), String> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }
    env_logger::Builder::new()
        .parse_filters(filter)
        .format_timestamp_millis()
        .try_init()
        .map_err(|err| format!("log system init failed: {}", err))?;
    let _ = INITIALIZED.set(());

    log::info!(target: "game", "{HEADER_LINE}");
    log::info!(target: "game", "{HEADER_TITLE}");
    log::info!(target: "game", "client core started, filter '{}'", filter);
    Ok(())
}

pub fn log_game(message: &str) {
    log::info!(target: "game", "{}", message);
}

pub fn log_error(message: &str) {
    log::error!(target: "game", "{}", message);
}

/// Frames that ran over their budget.
pub fn log_lag(message: &str) {
    log::warn!(target: "lag", "{}", message);
}

pub fn log_render(message: &str) {
    log::debug!(target: "render", "{}", message);
}
