use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// A progress bar counting finished requests, or a hidden one when progress is disabled.
///
/// The bar is drawn through the reporter's console so that trace lines printed while it is shown
/// land above it.
pub(crate) fn request_progress(
    console: &MultiProgress,
    request_count: usize,
    enabled: bool,
) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = console.add(ProgressBar::new(request_count as u64));
    match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} requests [{elapsed_precise}]",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => log::debug!("Using the default progress style: {e}"),
    }

    pb
}
