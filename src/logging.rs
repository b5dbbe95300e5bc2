//! Log setup shared by both binaries.

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose {
        "warn,mkvert=debug,mkvert_av=debug,mp4maker=debug"
    } else {
        "warn,mkvert=info,mkvert_av=info,mp4maker=info"
    }
}

/// Install the global subscriber. Logs go to stderr; stdout is reserved for
/// progress and results.
pub fn init(verbose: bool, quiet: bool) {
    // Respect RUST_LOG env var if set, otherwise use defaults based on flags
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| default_filter(verbose, quiet).to_string());

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
