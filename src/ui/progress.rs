use crate::linker::LinkStats;
use crate::ui::theme;
use crate::ui::Icons;
use indicatif::{HumanDuration, ProgressBar};
use owo_colors::OwoColorize;
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    /// A ticking spinner on terminals, hidden otherwise
    pub fn new(message: &str) -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_message(message.to_string());
        Self { pb }
    }

    pub fn finish_and_clear(&self) {
        self.pb.finish_and_clear();
    }
}

pub fn link_summary(duration: Duration, stats: &LinkStats) {
    println!();
    println!(
        "{} {}",
        Icons::CHECK.style(theme().success.clone()),
        format!("Linked in {}", HumanDuration(duration)).style(theme().success.clone())
    );
    println!(
        "  {} {}/{}  {} {}  {} {}",
        Icons::TAG.style(theme().info.clone()),
        stats.linked,
        stats.markers,
        Icons::VARIABLE.style(theme().info.clone()),
        stats.variables,
        Icons::LINK.style(theme().info.clone()),
        stats.edges_created
    );
    if stats.unresolved > 0 {
        println!(
            "  {} {}",
            Icons::WARN.style(theme().warn.clone()),
            format!("{} markers unresolved (run with --verbose for details)", stats.unresolved)
                .style(theme().warn.clone())
        );
    }
}
