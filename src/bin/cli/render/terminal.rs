/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
}

pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Transient user-facing message, printed to stderr
pub fn notice(message: &str, use_color: bool) {
    eprintln!("{}", paint(message, Color::YELLOW, use_color));
}

pub fn failure(message: &str, use_color: bool) {
    eprintln!("{}", paint(message, Color::RED, use_color));
}

pub fn success(message: &str, use_color: bool) {
    println!("{}", paint(message, Color::GREEN, use_color));
}

/// Render a progress percentage as a fixed-width bar
pub fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
