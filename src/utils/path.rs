// Path helpers for code references

/// Code reference and base path helpers
pub struct PathUtils;

impl PathUtils {
    /// Module path relative to the run root, always with `/` separators
    pub fn base_path(file_path: &str, root_dir: &str) -> String {
        let relative = if root_dir.is_empty() {
            file_path
        } else {
            file_path.strip_prefix(root_dir).unwrap_or(file_path)
        };
        relative.replace('\\', "/")
    }

    /// Join a parent reference and an item title into a normalised code reference
    pub fn code_ref(base: &str, title: &str) -> String {
        base.split('/')
            .chain(title.split('/'))
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect::<Vec<_>>()
            .join("/")
    }
}
