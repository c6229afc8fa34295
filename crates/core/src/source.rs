use std::path::{Component, Path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Hidden,
    Yaml,
    Other,
}

/// Classifies a repository-relative path. Any dot-prefixed component hides the
/// whole path, so `.gitlab-ci.yml` and `.git/config` are never validated.
pub fn classify_path(path: &str) -> SourceKind {
    let hidden = path
        .split(['/', '\\'])
        .any(|component| component.starts_with('.') && component != "." && component != "..");
    if hidden {
        return SourceKind::Hidden;
    }
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("yml") | Some("yaml") => SourceKind::Yaml,
        _ => SourceKind::Other,
    }
}

/// `group/project` + `data/a.yml` -> `group/project/data/a.yml`.
pub fn source_label(project: &str, path: &Path) -> String {
    let relative = path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if project.is_empty() {
        relative
    } else if relative.is_empty() {
        project.trim_end_matches('/').to_string()
    } else {
        format!("{}/{relative}", project.trim_end_matches('/'))
    }
}
