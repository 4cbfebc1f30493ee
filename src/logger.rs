//! `log` backend. In the browser records go to the devtools console at the
//! matching severity; native builds (tests, tools) go through `env_logger`.
//! Both print the same `[LEVEL] target: message` line.

use log::{LevelFilter, Record};

fn format_line(record: &Record) -> String {
    format!(
        "[{}] {}: {}",
        record.level(),
        record.target(),
        record.args()
    )
}

#[cfg(target_arch = "wasm32")]
mod console {
    use log::{Level, Log, Metadata, Record};
    use wasm_bindgen::JsValue;
    use web_sys::console;

    pub(super) struct ConsoleLogger;

    pub(super) static LOGGER: ConsoleLogger = ConsoleLogger;

    impl Log for ConsoleLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            let value = JsValue::from_str(&super::format_line(record));
            match record.level() {
                Level::Error => console::error_1(&value),
                Level::Warn => console::warn_1(&value),
                Level::Info => console::info_1(&value),
                Level::Debug | Level::Trace => console::log_1(&value),
            }
        }

        fn flush(&self) {}
    }

    pub(super) fn install() -> bool {
        log::set_logger(&LOGGER).is_ok()
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn install(level: LevelFilter) -> bool {
    use std::io::Write;

    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "{}", format_line(record)))
        .is_test(cfg!(test))
        .try_init()
        .is_ok()
}

/// Install the logger. Safe to call more than once; later calls only
/// change the level.
pub fn init(level: LevelFilter) {
    #[cfg(target_arch = "wasm32")]
    let first = console::install();
    #[cfg(not(target_arch = "wasm32"))]
    let first = install(level);

    log::set_max_level(level);
    if first {
        log::debug!("logger installed at {}", level);
    }
}
