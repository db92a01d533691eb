use crate::annotator::{Skipped, WrappedBinding};
use crate::linker::AnnotationSummary;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn file_written(path: &str) {
    println!("{} {}", Icons::FILE.style(theme().success.clone()), path);
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// Status messages go to stderr when stdout carries instrumented source
pub fn wrapped_binding(binding: &WrappedBinding) {
    eprintln!(
        "  {} {} {}",
        Icons::TAG.style(theme().success.clone()),
        binding.identifier.style(theme().name.clone()),
        muted(&format!("line {} ({})", binding.line, binding.shape))
    );
}

pub fn skipped_binding(skipped: &Skipped) {
    eprintln!(
        "  {} {}",
        Icons::SKIP.style(theme().muted.clone()),
        muted(&format!("line {}: {}", skipped.line, skipped.reason))
    );
}

pub fn annotation_line(annotation: &AnnotationSummary) {
    let line = annotation
        .line_number
        .map(|l| l.to_string())
        .unwrap_or_else(|| "?".to_string());
    println!(
        "{} {} {}",
        Icons::TAG,
        annotation.name.style(theme().name.clone()),
        muted(&format!("{}:{}", annotation.filename, line))
    );
    for variable in &annotation.variables {
        println!(
            "    {} {} {}",
            Icons::LINK.style(theme().info.clone()),
            variable.name.as_deref().unwrap_or("<unnamed>"),
            muted(&variable.id.to_string())
        );
    }
}
