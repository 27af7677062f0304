//! helpers for logging.
//!
//! Libraries in this workspace only talk to the `log` facade.  Binaries pick a backend here.

/// What gets through when `RUST_LOG` isn't set.  The walkthrough prints its results to stdout, so by default we only
/// want to hear about problems.
pub const DEFAULT_FILTER: &str = "warn";

fn builder() -> env_logger::Builder {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(DEFAULT_FILTER))
}

/// Log to stderr, filtered by `RUST_LOG`.
///
/// If called multiple times in the same process, only applies once.
pub fn log_to_stderr() {
    static ONCE: std::sync::Once = std::sync::Once::new();

    ONCE.call_once(|| {
        builder()
            .format(|buf, record| {
                use std::io::Write;

                let now = time::OffsetDateTime::now_utc();

                writeln!(
                    buf,
                    "{} {} time={} target={}",
                    record.level(),
                    record.args(),
                    now,
                    record.target()
                )
            })
            .target(env_logger::Target::Stderr)
            .init();
    });
}

/// Route logs through the test harness's capture, so that they show up next to the failing test.
///
/// Safe to call from every test.
pub fn log_for_tests() {
    let _ = builder().is_test(true).try_init();
}
