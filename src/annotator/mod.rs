//! Source Annotator - wraps variable bindings in marker calls
//!
//! A pure text-to-text transform:
//! - inserts the instrumentation header after leading comments/attributes
//! - rewrites `let <binding>;` into `annotate!(<binding>, "<ident>", line!());`
//!
//! Malformed or unrecognized input is passed through unchanged; the
//! annotator never fails.

pub mod declaration;
pub mod header;
pub mod marker;

pub use declaration::{BindingShape, DeclarationMatch, SkipReason, Skipped};
pub use marker::{render_marker_macro, write_marker_macro};

use serde::{Deserialize, Serialize};

/// Annotator settings, the `[annotator]` table of `annolink.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotatorConfig {
    /// Name of the marker macro (without `!`)
    pub macro_name: String,
    /// Path written into the `include!` header line
    pub macro_path: String,
    /// Crate-level attribute enabling the intrinsic
    pub feature_line: String,
    /// Third marker argument, resolved by the compiler
    pub line_token: String,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            macro_name: "annotate".to_string(),
            macro_path: "annotation_macro.rs".to_string(),
            feature_line: "#![feature(link_llvm_intrinsics)]".to_string(),
            line_token: "line!()".to_string(),
        }
    }
}

/// A binding that was wrapped in a marker call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrappedBinding {
    pub identifier: String,
    pub shape: String,
    /// 1-indexed line in the input text
    pub line: u32,
}

/// Output of [`SourceAnnotator::annotate_with_report`]
#[derive(Debug, Clone)]
pub struct Annotated {
    pub text: String,
    pub wrapped: Vec<WrappedBinding>,
    pub skipped: Vec<Skipped>,
    /// Input already carried the instrumentation header and was left as is
    pub already_instrumented: bool,
}

/// Rewrites source text so traceable bindings carry marker calls.
#[derive(Debug, Clone, Default)]
pub struct SourceAnnotator {
    config: AnnotatorConfig,
}

impl SourceAnnotator {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self { config }
    }

    /// Instrument `source`, returning only the rewritten text
    pub fn annotate(&self, source: &str) -> String {
        self.annotate_with_report(source).text
    }

    /// Instrument `source` and report what was wrapped or skipped.
    pub fn annotate_with_report(&self, source: &str) -> Annotated {
        if self.is_instrumented(source) {
            tracing::debug!("Source already instrumented, leaving it unchanged");
            return Annotated {
                text: source.to_string(),
                wrapped: Vec::new(),
                skipped: Vec::new(),
                already_instrumented: true,
            };
        }

        let scan = declaration::scan(source);
        let mut text = String::with_capacity(source.len() + scan.matches.len() * 32);
        let mut cursor = 0;
        let mut wrapped = Vec::with_capacity(scan.matches.len());

        for decl in &scan.matches {
            text.push_str(&source[cursor..decl.start]);
            text.push_str(&self.marker_call(decl));
            cursor = decl.end;
            wrapped.push(WrappedBinding {
                identifier: decl.identifier.clone(),
                shape: decl.shape.to_string(),
                line: decl.line,
            });
        }
        text.push_str(&source[cursor..]);

        for skip in &scan.skipped {
            tracing::trace!("Skipped binding at line {}: {}", skip.line, skip.reason);
        }
        tracing::debug!("Wrapped {} bindings, skipped {}", wrapped.len(), scan.skipped.len());

        Annotated {
            text: header::insert_header(&text, &self.header_lines()),
            wrapped,
            skipped: scan.skipped,
            already_instrumented: false,
        }
    }

    /// The lines inserted at the top of every instrumented source
    pub fn header_lines(&self) -> Vec<String> {
        vec![self.config.feature_line.clone(), self.include_line()]
    }

    /// True if `source` already includes the marker macro definition
    pub fn is_instrumented(&self, source: &str) -> bool {
        let include = self.include_line();
        source.lines().any(|line| line.trim() == include)
    }

    /// Render the marker call replacing `decl`
    pub fn marker_call(&self, decl: &DeclarationMatch) -> String {
        format!(
            "{}!({}, \"{}\", {});",
            self.config.macro_name, decl.binding, decl.identifier, self.config.line_token
        )
    }

    fn include_line(&self) -> String {
        format!("include!(\"{}\");", self.config.macro_path.replace('\\', "\\\\"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "#![feature(link_llvm_intrinsics)]\ninclude!(\"annotation_macro.rs\");\n";

    fn annotate(src: &str) -> String {
        SourceAnnotator::default().annotate(src)
    }

    #[test]
    fn test_wraps_each_shape_once() {
        let src = "fn main() {\n    let mut x: i32 = 5;\n    let mut n = 0;\n    let s: &str = \"a\";\n    let y = 10;\n}\n";
        let out = annotate(src);
        let expected = format!(
            "{}fn main() {{\n    annotate!(mut x: i32 = 5, \"x\", line!());\n    annotate!(mut n = 0, \"n\", line!());\n    annotate!(s: &str = \"a\", \"s\", line!());\n    annotate!(y = 10, \"y\", line!());\n}}\n",
            HEADER
        );
        assert_eq!(out, expected);
        assert_eq!(out.matches("annotate!(").count(), 4);
    }

    #[test]
    fn test_exclusions_are_untouched() {
        let src = "fn f(opt: Option<u8>) {\n    if let Some(y) = opt { drop(y); }\n    let _ = compute();\n    while let x = next() { break; }\n}\n";
        let out = annotate(src);
        assert_eq!(out, format!("{}{}", HEADER, src));
    }

    #[test]
    fn test_header_once_after_leading_comments() {
        let src = "// demo\n#![allow(unused)]\nfn main() { let a = 1; }\n";
        let out = annotate(src);
        assert_eq!(
            out,
            "// demo\n#![allow(unused)]\n#![feature(link_llvm_intrinsics)]\ninclude!(\"annotation_macro.rs\");\nfn main() { annotate!(a = 1, \"a\", line!()); }\n"
        );
        assert_eq!(out.matches("#![feature(link_llvm_intrinsics)]").count(), 1);
    }

    #[test]
    fn test_reapplication_is_guarded() {
        let once = annotate("let y = 10;\n");
        let twice = SourceAnnotator::default().annotate_with_report(&once);
        assert!(twice.already_instrumented);
        assert_eq!(twice.text, once);
    }

    #[test]
    fn test_deterministic() {
        let src = "let a = vec![1; 3];\nlet b: u8 = a[0];\n";
        assert_eq!(annotate(src), annotate(src));
    }

    #[test]
    fn test_nested_terminator_kept_inside_call() {
        let out = annotate("let v = vec![1; 3];\n");
        assert!(out.ends_with("annotate!(v = vec![1; 3], \"v\", line!());\n"));
    }

    #[test]
    fn test_report_lists_wrapped_and_skipped() {
        let report = SourceAnnotator::default().annotate_with_report("let y = 10;\nlet _ = foo();");
        assert_eq!(
            report.wrapped,
            vec![WrappedBinding { identifier: "y".into(), shape: "immutable".into(), line: 1 }]
        );
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Discard);
        assert!(report.text.ends_with("annotate!(y = 10, \"y\", line!());\nlet _ = foo();"));
    }

    #[test]
    fn test_non_ascii_identifier_is_wrapped() {
        let report = SourceAnnotator::default().annotate_with_report("let café = 1;\n");
        assert_eq!(report.wrapped.len(), 1);
        assert_eq!(report.wrapped[0].identifier, "café");
        assert!(report.text.ends_with("annotate!(café = 1, \"café\", line!());\n"));
    }

    #[test]
    fn test_type_with_equals_is_kept_verbatim() {
        let out = annotate("let it: Box<dyn Iterator<Item = u8>> = Box::new(v);\n");
        assert!(out.ends_with(
            "annotate!(it: Box<dyn Iterator<Item = u8>> = Box::new(v), \"it\", line!());\n"
        ));
    }

    #[test]
    fn test_custom_config() {
        let annotator = SourceAnnotator::new(AnnotatorConfig {
            macro_name: "trace_var".into(),
            macro_path: "/opt/marker.rs".into(),
            ..AnnotatorConfig::default()
        });
        let out = annotator.annotate("let z = 1;");
        assert!(out.contains("include!(\"/opt/marker.rs\");"));
        assert!(out.ends_with("trace_var!(z = 1, \"z\", line!());"));
    }
}
