use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use walkdir::WalkDir;

/// Recursive best-effort execute-bit pass over the scripts tree, run once
/// at a gated entry point. Marks `.py`/`.sh` files and extensionless files
/// executable; every failure is swallowed and the walk continues.
pub fn mark_tree_executable(root: &Path) -> usize {
    let mut marked = 0;

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
    {
        let name = entry.file_name().to_string_lossy();
        let is_script = name.ends_with(".py") || name.ends_with(".sh") || !name.contains('.');
        if !is_script {
            continue;
        }

        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mut perms = meta.permissions();
        let mode = perms.mode();
        if mode & 0o111 == 0o111 {
            continue;
        }
        perms.set_mode(mode | 0o111);
        if fs::set_permissions(entry.path(), perms).is_ok() {
            marked += 1;
        }
    }

    marked
}
