//! Gradle Configuration Export
//!
//! The `emit` operation renders a resolved configuration into a form the
//! Gradle build of an Android application module can consume. Settings are
//! exported as project properties below the `osiris.android.` namespace,
//! using the camel-case names of the Android Gradle DSL. A setting
//! `min_sdk` is thus exported as `osiris.android.minSdk`, and dependency
//! entries like `dependencies.core_library_desugaring` as
//! `osiris.android.dependencies.coreLibraryDesugaring`.
//!
//! Gradle only picks up `project.property(...)` values from its own
//! `gradle.properties` files and from the command-line. The emitted file is
//! therefore a standalone properties file, which the build script loads
//! explicitly:
//!
//! ```kotlin
//! val osiris = java.util.Properties().apply {
//!     rootProject.file("osiris-config.properties").inputStream().use { load(it) }
//! }
//! android {
//!     compileSdk = osiris.getProperty("osiris.android.compileSdk").toInt()
//! }
//! ```
//!
//! The emitted file is replaced entirely, so it must not be pointed at a
//! `gradle.properties` with other content. Alternatively, pass the settings
//! as project properties via `render_arguments()`, which makes them
//! available to `project.property(...)`.

use crate::resolver::Resolved;

/// Namespace of all exported properties.
pub const NAMESPACE: &str = "osiris.android.";

/// Emit Errors
///
/// This is the exhaustive list of possible errors raised by the emit
/// operation. See each error for details.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Creation of the directory at the specified path failed with the
    /// given error.
    #[error("cannot create directory {0:?}: {1}")]
    DirectoryCreation(std::ffi::OsString, std::io::Error),
    /// Updating the file at the specified path failed with the given error.
    #[error("cannot update {0:?}: {1}")]
    FileUpdate(std::ffi::OsString, std::io::Error),
}

// Convert a snake-case key segment to camel-case
//
// `core_library_desugaring` becomes `coreLibraryDesugaring`. Segments
// without underscores are returned unchanged.
fn camel_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut upper = false;

    for c in segment.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }

    out
}

/// Map a setting key to its Gradle property name
///
/// Every dot-separated segment is converted to camel-case, and the result
/// is prefixed with `NAMESPACE`.
pub fn property_name(key: &str) -> String {
    let mut s = NAMESPACE.to_string();

    for (i, segment) in key.split('.').enumerate() {
        if i > 0 {
            s.push('.');
        }
        s.push_str(&camel_case(segment));
    }

    s
}

// Escape a Java properties value
//
// Ensure `data` is suitably escaped to be used verbatim as value in a Java
// properties file. Leading whitespace would be stripped by the parser, so
// it is escaped as well. `java.util.Properties` reads files as ISO-8859-1,
// hence anything outside of printable ASCII is written as `\uXXXX`, using
// UTF-16 surrogate pairs beyond the basic plane.
fn escape_property_value(data: &str) -> String {
    let mut out = String::with_capacity(data.len());

    for (i, c) in data.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0c}' => out.push_str("\\f"),
            ' ' if i == 0 => out.push_str("\\ "),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut buf = [0u16; 2];
                for unit in c.encode_utf16(&mut buf).iter() {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            },
        }
    }

    out
}

/// Render as Gradle properties
///
/// Render all settings of the resolved configuration as content of a Java
/// properties file, ordered by key. The content is plain ASCII.
pub fn render_properties(resolved: &Resolved) -> String {
    let mut content = String::from("# Generated by osiris-config\n");

    if let Some(variant) = resolved.variant() {
        content.push_str(&format!("# Variant: {}\n", variant));
    }

    for (key, value) in resolved.iter() {
        content.push_str(&property_name(key));
        content.push('=');
        content.push_str(&escape_property_value(&value.to_string()));
        content.push('\n');
    }

    content
}

/// Render as Gradle arguments
///
/// Return the command-line arguments passing all settings as Gradle
/// project properties, i.e., `--project-prop KEY=VALUE` for each setting
/// ordered by key. No escaping is needed, since every value is passed as a
/// single argument.
pub fn render_arguments(resolved: &Resolved) -> Vec<std::ffi::OsString> {
    let mut args = Vec::with_capacity(resolved.len() * 2);

    for (key, value) in resolved.iter() {
        let mut arg = std::ffi::OsString::new();

        arg.push(property_name(key));
        arg.push("=");
        arg.push(value.to_string());

        args.push("--project-prop".into());
        args.push(arg);
    }

    args
}

// Update a file if required
//
// This writes the given content to the specified file, but only if the file
// content does not already match the new content. This avoids modifying a file
// unless necessary. Thus, the file timestamp is only modified if the content
// really changed, and Gradle does not needlessly reconfigure the project.
//
// Returns whether the file was modified.
fn update_file(
    path: &std::path::Path,
    content: &str,
) -> Result<bool, Error> {
    let file_error = |v: std::io::Error| Error::FileUpdate(path.as_os_str().to_os_string(), v);

    // Open the file read+write and create it if it does not exist, yet.
    let mut f = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .map_err(file_error)?;

    // Read the entire file content into memory.
    let mut old = String::new();
    <std::fs::File as std::io::Read>::read_to_string(&mut f, &mut old)
        .map_err(file_error)?;

    if old == content {
        return Ok(false);
    }

    // Rewind the position, truncate the file and write the new contents.
    <std::fs::File as std::io::Seek>::rewind(&mut f).map_err(file_error)?;
    f.set_len(0).map_err(file_error)?;
    <std::fs::File as std::io::Write>::write_all(&mut f, content.as_bytes())
        .map_err(file_error)?;

    // Sync the file now to ensure errors are caught properly.
    f.sync_all().map_err(file_error)?;

    Ok(true)
}

/// Emit Gradle properties
///
/// Write the resolved configuration as Gradle properties to the file at
/// `path`. Parent directories are created if necessary. The file is only
/// rewritten if its content changes, but then replaced entirely. Returns
/// whether the file was modified.
pub fn emit(
    resolved: &Resolved,
    path: &std::path::Path,
) -> Result<bool, Error> {
    if let Some(parent) = path.parent().filter(|v| !v.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(
            |v| Error::DirectoryCreation(parent.as_os_str().to_os_string(), v)
        )?;
    }

    let changed = update_file(path, &render_properties(resolved))?;

    tracing::info!(path = %path.display(), changed, "gradle properties emitted");

    Ok(changed)
}
