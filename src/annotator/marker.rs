//! The `annotate!` marker macro definition
//!
//! Instrumented sources `include!` this file. Each arm re-creates the original
//! binding and then passes its address, name, file and line to the
//! `llvm.ptr.annotation.p0` intrinsic, which survives lowering into the CPG as
//! a call with four operator arguments.

use std::path::Path;

use crate::Result;

/// Placeholder replaced by the configured macro name
const NAME_PLACEHOLDER: &str = "__MARKER__";

const TEMPLATE: &str = r#"extern "C" {
    #[link_name = "llvm.ptr.annotation.p0"]
    fn llvm_ptr_annotation_p0(
        val: *const u8,
        annotation: *const u8,
        file: *const u8,
        line: i32,
    ) -> *const u8;
}

#[macro_export]
macro_rules! __MARKER__ {
    (mut $var:ident : $ty:ty = $value:expr, $name:literal, $line:expr) => {
        let mut $var: $ty = $value;
        __MARKER__!(@emit $var, $name, $line);
    };
    (mut $var:ident = $value:expr, $name:literal, $line:expr) => {
        let mut $var = $value;
        __MARKER__!(@emit $var, $name, $line);
    };
    ($var:ident : $ty:ty = $value:expr, $name:literal, $line:expr) => {
        let $var: $ty = $value;
        __MARKER__!(@emit $var, $name, $line);
    };
    ($var:ident = $value:expr, $name:literal, $line:expr) => {
        let $var = $value;
        __MARKER__!(@emit $var, $name, $line);
    };
    (@emit $var:ident, $name:literal, $line:expr) => {
        unsafe {
            llvm_ptr_annotation_p0(
                &$var as *const _ as *const u8,
                concat!($name, "\0").as_ptr(),
                concat!(file!(), "\0").as_ptr(),
                $line as i32,
            );
        }
    };
}
"#;

/// Render the marker macro definition under `macro_name`
pub fn render_marker_macro(macro_name: &str) -> String {
    TEMPLATE.replace(NAME_PLACEHOLDER, macro_name)
}

/// Write the marker macro definition to `path`
pub fn write_marker_macro(path: &Path, macro_name: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, render_marker_macro(macro_name))?;
    tracing::debug!("Wrote marker macro `{}!` to {}", macro_name, path.display());
    Ok(())
}
