use tracing_subscriber::EnvFilter;

pub fn init_logging(verbose: bool) {
    // RUST_LOG wins; otherwise the -v flag picks the level. The engine's
    // probe/transport chatter stays quiet unless verbose is requested.
    let default_directives = if verbose {
        "debug"
    } else {
        "info,crmv.engine=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .init();
}
