//! Filesystem path sandbox.
//!
//! Classifies candidate paths into kernel (read-only) vs. workspace
//! (read-write) zones. [`PathPolicy`] is a pure decision function over two
//! static path tables — it holds no mutable state and is safe to share
//! across any number of concurrent skills.
//!
//! Writing and reading are two independent questions answered by two
//! independent functions: [`PathPolicy::can_write`] enforces
//! allow-list-over-deny-list ordering (kernel protection is checked before
//! workspace matching), while [`PathPolicy::can_read`] permits everything
//! except traversal escapes and a short list of secret-bearing files.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Why a write was denied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    #[strum(serialize = "absolute path")]
    AbsolutePath,
    #[strum(serialize = "parent traversal")]
    Traversal,
    #[strum(serialize = "kernel-protected file")]
    KernelFile,
    #[strum(serialize = "kernel-protected directory")]
    KernelDirectory,
    #[strum(serialize = "outside workspace")]
    OutsideWorkspace,
    #[strum(serialize = "secret-bearing file")]
    SecretFile,
}

/// Result of classifying a candidate path for a write attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,
    /// The kernel entry or workspace prefix that decided the outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

impl PathDecision {
    fn allow(matched: impl Into<String>) -> Self {
        Self {
            allowed: true,
            reason: None,
            matched: Some(matched.into()),
        }
    }

    fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            matched: None,
        }
    }

    fn deny_matched(reason: DenyReason, matched: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            matched: Some(matched.into()),
        }
    }
}

/// Static path tables defining the sandbox zones.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    kernel_dirs: Vec<String>,
    kernel_files: Vec<String>,
    workspace_prefixes: Vec<String>,
    secret_files: Vec<String>,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self {
            kernel_dirs: vec![
                "server".into(),
                "src".into(),
                "skills".into(),
                "web".into(),
                "scripts".into(),
            ],
            kernel_files: vec![
                "package.json".into(),
                "package-lock.json".into(),
                "Cargo.toml".into(),
                "Cargo.lock".into(),
                "tsconfig.json".into(),
                ".env".into(),
                ".env.local".into(),
            ],
            workspace_prefixes: vec!["workspace".into(), "output".into(), "tmp".into()],
            secret_files: vec![
                ".env".into(),
                ".env.local".into(),
                "credentials.json".into(),
            ],
        }
    }
}

impl PathPolicy {
    /// Create a policy with explicit tables.
    pub fn new(
        kernel_dirs: Vec<String>,
        kernel_files: Vec<String>,
        workspace_prefixes: Vec<String>,
    ) -> Self {
        Self {
            kernel_dirs,
            kernel_files,
            workspace_prefixes,
            ..Self::default()
        }
    }

    /// Classify a candidate path for a write attempt.
    ///
    /// Kernel protection is checked before workspace matching, so no
    /// workspace prefix can be crafted to shadow a kernel path. Default
    /// is deny.
    pub fn can_write(&self, path: &str) -> PathDecision {
        if is_absolute(path) {
            return PathDecision::deny(DenyReason::AbsolutePath);
        }
        if has_traversal(path) {
            return PathDecision::deny(DenyReason::Traversal);
        }
        let normalized = normalize(path);

        for file in &self.kernel_files {
            if &normalized == file {
                return PathDecision::deny_matched(DenyReason::KernelFile, file);
            }
        }
        for dir in &self.kernel_dirs {
            if &normalized == dir || normalized.starts_with(&format!("{dir}/")) {
                return PathDecision::deny_matched(DenyReason::KernelDirectory, dir);
            }
        }
        for prefix in &self.workspace_prefixes {
            if &normalized == prefix || normalized.starts_with(&format!("{prefix}/")) {
                return PathDecision::allow(prefix);
            }
        }
        PathDecision::deny(DenyReason::OutsideWorkspace)
    }

    /// Whether a candidate path may be read.
    ///
    /// Everything is readable except traversal escapes, absolute paths, and
    /// secret-bearing files (matched by normalized basename or full path).
    pub fn can_read(&self, path: &str) -> bool {
        self.read_denial(path).is_none()
    }

    /// Classified reason a read would be denied, if any.
    pub fn read_denial(&self, path: &str) -> Option<DenyReason> {
        if is_absolute(path) {
            return Some(DenyReason::AbsolutePath);
        }
        if has_traversal(path) {
            return Some(DenyReason::Traversal);
        }
        let normalized = normalize(path);
        let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
        if self
            .secret_files
            .iter()
            .any(|s| s == basename || s == &normalized)
        {
            return Some(DenyReason::SecretFile);
        }
        None
    }

    /// Human-readable reason for a `can_write` rejection.
    pub fn explain(&self, path: &str) -> String {
        let decision = self.can_write(path);
        match (decision.reason, decision.matched) {
            (None, _) => format!("'{path}' is writable"),
            (Some(DenyReason::AbsolutePath), _) => {
                format!("'{path}' is an absolute path; only workspace-relative paths may be written")
            }
            (Some(DenyReason::Traversal), _) => {
                format!("'{path}' contains a parent-traversal segment and could escape the workspace")
            }
            (Some(DenyReason::KernelFile), Some(m)) => {
                format!("'{path}' is the kernel-protected file '{m}' and is read-only")
            }
            (Some(DenyReason::KernelDirectory), Some(m)) => {
                format!("'{path}' is inside the kernel-protected directory '{m}/' and is read-only")
            }
            (Some(DenyReason::OutsideWorkspace), _) => {
                format!("'{path}' is outside the writable workspace; use one of: {}", self
                    .workspace_prefixes
                    .iter()
                    .map(|p| format!("{p}/"))
                    .collect::<Vec<_>>()
                    .join(", "))
            }
            // Kernel denials always carry the matched entry.
            (Some(reason), _) => format!("'{path}' denied: {reason}"),
        }
    }
}

fn is_absolute(path: &str) -> bool {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') {
        return true;
    }
    // Windows drive prefix such as "C:/".
    let mut chars = unified.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), Some(':')) if c.is_ascii_alphabetic()
    )
}

fn has_traversal(path: &str) -> bool {
    path.replace('\\', "/").split('/').any(|seg| seg == "..")
}

/// Lexical normalization: unify separators, drop `.` and empty segments.
///
/// Traversal segments are rejected before normalization, so none survive
/// to this point.
fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect::<Vec<_>>()
        .join("/")
}
