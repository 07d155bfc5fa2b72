use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TICKS: &str = "⠁⠉⠙⠚⠒⠂⠲⠴⠤⠄⠤⠦⠖⠒⠐⠓⠋ ";

pub fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        pb.set_style(style.tick_chars(SPINNER_TICKS));
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Progress bar measured in milliseconds of encoded media.
pub fn create_encode_bar(total_seconds: f64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new((total_seconds.max(0.0) * 1000.0) as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏ "));
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message.to_string());
    pb
}
