//! Core filesystem skills, always available to the engine.
//!
//! Each skill consults [`PathPolicy`] before touching the disk, so no skill
//! re-implements path logic. Violations surface as
//! [`KestrelError::Sandbox`] with the policy's `explain` text, which the
//! dispatch boundary converts into a `tool_error` event.

use std::sync::Arc;

use crate::error::KestrelError;
use crate::sandbox::PathPolicy;
use crate::skills::skill::{FnSkill, Skill, SkillParameters};

const READ_FILE_MAX_BYTES: usize = 65_536;
const LIST_DIR_MAX_ENTRIES: usize = 500;

fn truncate_utf8(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut cutoff = max_bytes;
    while cutoff > 0 && !s.is_char_boundary(cutoff) {
        cutoff -= 1;
    }
    s[..cutoff].to_string()
}

/// The `read_file` skill — reads a workspace-visible file as UTF-8 text.
///
/// Content is capped at 64 KB with a trailing note when truncated.
pub fn read_file_skill(policy: Arc<PathPolicy>) -> Arc<dyn Skill> {
    Arc::new(FnSkill::new(
        "read_file",
        "Read a file's contents as UTF-8 text",
        SkillParameters::object()
            .string("path", "Path to the file to read", true)
            .build(),
        move |args| {
            let policy = policy.clone();
            async move {
                let path = args.get_str("path")?.to_string();
                if let Some(reason) = policy.read_denial(&path) {
                    return Err(KestrelError::sandbox(
                        &path,
                        reason,
                        format!("'{path}' may not be read ({reason})"),
                    ));
                }

                let content = tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|e| KestrelError::skill("read_file", format!("{path}: {e}")))?;

                let total_bytes = content.len();
                let truncated = total_bytes > READ_FILE_MAX_BYTES;
                let display = if truncated {
                    let mut s = truncate_utf8(&content, READ_FILE_MAX_BYTES);
                    s.push_str("\n... (truncated)");
                    s
                } else {
                    content
                };

                Ok(serde_json::json!({
                    "content": display,
                    "bytes": total_bytes,
                    "truncated": truncated,
                }))
            }
        },
    ))
}

/// The `write_file` skill — writes content to a workspace path.
///
/// The path is classified by [`PathPolicy::can_write`] first; denials carry
/// the policy's explanation so the model sees which rule was violated.
pub fn write_file_skill(policy: Arc<PathPolicy>) -> Arc<dyn Skill> {
    Arc::new(FnSkill::new(
        "write_file",
        "Write content to a workspace file, creating parent directories if needed",
        SkillParameters::object()
            .string("path", "Workspace-relative path to write", true)
            .string("content", "Content to write to the file", true)
            .build(),
        move |args| {
            let policy = policy.clone();
            async move {
                let path = args.get_str("path")?.to_string();
                let content = args.get_str("content")?.to_string();

                let decision = policy.can_write(&path);
                if let Some(reason) = decision.reason {
                    return Err(KestrelError::sandbox(&path, reason, policy.explain(&path)));
                }

                if let Some(parent) = std::path::Path::new(&path).parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await.map_err(|e| {
                            KestrelError::skill(
                                "write_file",
                                format!("failed to create directories for {path}: {e}"),
                            )
                        })?;
                    }
                }

                let bytes = content.len();
                tokio::fs::write(&path, content)
                    .await
                    .map_err(|e| KestrelError::skill("write_file", format!("{path}: {e}")))?;

                Ok(serde_json::json!({
                    "success": true,
                    "path": path,
                    "bytes_written": bytes,
                }))
            }
        },
    ))
}

/// The `list_directory` skill — lists directory entries.
///
/// Returns a sorted array of entries with `name`, `type` and `size`.
pub fn list_directory_skill(policy: Arc<PathPolicy>) -> Arc<dyn Skill> {
    Arc::new(FnSkill::new(
        "list_directory",
        "List files and directories in a given path",
        SkillParameters::object()
            .string("path", "Path to the directory to list", true)
            .build(),
        move |args| {
            let policy = policy.clone();
            async move {
                let path = args.get_str("path")?.to_string();
                if let Some(reason) = policy.read_denial(&path) {
                    return Err(KestrelError::sandbox(
                        &path,
                        reason,
                        format!("'{path}' may not be listed ({reason})"),
                    ));
                }

                let mut read_dir = tokio::fs::read_dir(&path)
                    .await
                    .map_err(|e| KestrelError::skill("list_directory", format!("{path}: {e}")))?;

                let mut entries = Vec::new();
                while let Some(entry) = read_dir
                    .next_entry()
                    .await
                    .map_err(|e| KestrelError::skill("list_directory", e.to_string()))?
                {
                    if entries.len() >= LIST_DIR_MAX_ENTRIES {
                        break;
                    }
                    let metadata = entry
                        .metadata()
                        .await
                        .map_err(|e| KestrelError::skill("list_directory", e.to_string()))?;
                    let entry_type = if metadata.is_dir() {
                        "dir"
                    } else if metadata.is_file() {
                        "file"
                    } else {
                        "other"
                    };
                    entries.push(serde_json::json!({
                        "name": entry.file_name().to_string_lossy(),
                        "type": entry_type,
                        "size": metadata.len(),
                    }));
                }

                entries.sort_by(|a, b| {
                    let a_name = a["name"].as_str().unwrap_or("");
                    let b_name = b["name"].as_str().unwrap_or("");
                    a_name.cmp(b_name)
                });

                let count = entries.len();
                Ok(serde_json::json!({
                    "path": path,
                    "entries": entries,
                    "count": count,
                }))
            }
        },
    ))
}

/// All core skills, bound to one shared path policy.
pub fn core_skills(policy: Arc<PathPolicy>) -> Vec<Arc<dyn Skill>> {
    vec![
        read_file_skill(policy.clone()),
        write_file_skill(policy.clone()),
        list_directory_skill(policy),
    ]
}
