// src/utils/log.rs

//! Console formatting helpers on top of the `log` facade.
//!
//! Plain messages go through the facade unchanged; headers, steps and
//! summaries get a consistent layout so progress reads well in a terminal.

/// Log a debug message
pub fn debug(message: &str) {
    ::log::debug!("{}", message);
}

/// Log an info message
pub fn info(message: &str) {
    ::log::info!("{}", message);
}

/// Log a warning message
pub fn warn(message: &str) {
    ::log::warn!("{}", message);
}

/// Log an error message
pub fn error(message: &str) {
    ::log::error!("{}", message);
}

/// Log a success message (always shown as INFO)
pub fn success(message: &str) {
    ::log::info!("✓ {}", message);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    ::log::info!("[STEP {}/{}] {}", step_num, total, message);
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    ::log::info!("    {}", message);
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    ::log::info!("{}", border);
    ::log::info!("  {}", title);
    ::log::info!("{}", border);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    for line in summary_lines(title, items) {
        ::log::info!("{}", line);
    }
}

/// Render a summary section as lines.
pub fn summary_lines(title: &str, items: &[(&str, String)]) -> Vec<String> {
    std::iter::once(format!("[SUMMARY] {title}"))
        .chain(items.iter().map(|(key, value)| format!("    {key}: {value}")))
        .collect()
}
