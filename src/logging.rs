use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const FALLBACK_LEVEL: usize = 1;

/// Installs the stderr subscriber. `RUST_LOG` wins over the configured level;
/// each `-v` raises the configured level one step.
pub fn init_logging(config_level: &str, verbose: u8) -> Result<(), anyhow::Error> {
    let (level, known) = effective_level(config_level, verbose);
    let debug = level == "debug" || level == "trace";

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("warn,mhtshelf={level},mhtshelf_core={level}"))
    })?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug)
                .with_file(debug)
                .with_line_number(debug),
        )
        .with(env_filter)
        .init();

    if !known {
        tracing::warn!(level = config_level, "unknown log level in config, using warn");
    }
    Ok(())
}

/// Configured level raised by `verbose` steps, capped at `trace`. The flag
/// is false when the configured name was not recognized.
fn effective_level(config_level: &str, verbose: u8) -> (&'static str, bool) {
    let configured = config_level.trim().to_lowercase();
    let position = LEVELS.iter().position(|l| *l == configured);
    let base = position.unwrap_or(FALLBACK_LEVEL);
    let index = (base + usize::from(verbose)).min(LEVELS.len() - 1);
    (LEVELS[index], position.is_some())
}
