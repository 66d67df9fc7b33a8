//! Archive layout: namespaces and virtual path derivation.
//!
//! Repository content lives under [`REPOSITORY_PREFIX`], swept working-folder
//! content under [`LOCAL_FILES_PREFIX`], and the two export records sit at the
//! archive root. No derived path can escape its namespace, so entries from the
//! different producers never collide.

/// Namespace for current and base-version content fetched from the repository.
pub const REPOSITORY_PREFIX: &str = "repository";

/// Namespace for files admitted by the local file sweep.
pub const LOCAL_FILES_PREFIX: &str = "localfiles";

/// Manifest listing every processed change.
pub const MANIFEST_ENTRY: &str = "Files.txt";

/// Export provenance record.
pub const INFO_ENTRY: &str = "Info.txt";

/// Insert `.C<version>` before the extension of the final path component.
///
/// `src/Foo.cs` at 7 becomes `src/Foo.C7.cs`; `src/Makefile` at 3 becomes
/// `src/Makefile.C3`. A leading dot does not start an extension, so
/// `.gitignore` at 2 becomes `.gitignore.C2`.
pub fn base_version_path(relative: &str, version: u32) -> String {
    let name_start = relative.rfind('/').map(|i| i + 1).unwrap_or(0);
    let name = &relative[name_start..];
    match name.rfind('.') {
        Some(dot) if dot > 0 => {
            let split = name_start + dot;
            format!("{}.C{}{}", &relative[..split], version, &relative[split..])
        }
        _ => format!("{}.C{}", relative, version),
    }
}

/// Virtual path for repository content at a server-relative path.
pub fn repository_path(relative: &str) -> String {
    join(REPOSITORY_PREFIX, relative)
}

/// Virtual path for a swept file, keyed by the root it was found under.
pub fn local_files_path(root_name: &str, relative: &str) -> String {
    join(LOCAL_FILES_PREFIX, &join(root_name, relative))
}

/// Normalise a relative path to forward-slash components, dropping empty,
/// `.` and `..` segments so the result stays inside its namespace.
pub fn normalize_relative(path: &str) -> String {
    path.split(['/', '\\'])
        .filter(|seg| !seg.is_empty() && *seg != "." && *seg != "..")
        .collect::<Vec<_>>()
        .join("/")
}

fn join(prefix: &str, relative: &str) -> String {
    let relative = normalize_relative(relative);
    if relative.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_version_inserted_before_extension() {
        assert_eq!(base_version_path("src/Foo.cs", 7), "src/Foo.C7.cs");
    }

    #[test]
    fn base_version_without_extension_is_appended() {
        assert_eq!(base_version_path("src/Makefile", 3), "src/Makefile.C3");
    }

    #[test]
    fn base_version_uses_last_extension_only() {
        assert_eq!(base_version_path("web/app.min.js", 12), "web/app.min.C12.js");
    }

    #[test]
    fn base_version_ignores_dots_in_directories() {
        assert_eq!(base_version_path("v1.2/README", 4), "v1.2/README.C4");
    }

    #[test]
    fn base_version_dotfile_has_no_extension() {
        assert_eq!(base_version_path("proj/.gitignore", 2), "proj/.gitignore.C2");
    }

    #[test]
    fn namespaced_paths() {
        assert_eq!(repository_path("proj/a.cs"), "repository/proj/a.cs");
        assert_eq!(local_files_path("ws", "bin\\x.dll"), "localfiles/ws/bin/x.dll");
        assert_eq!(repository_path("../../etc/passwd"), "repository/etc/passwd");
    }
}
