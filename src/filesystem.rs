use std::path::{Path, PathBuf};

use crate::consts::{OLD_FILES_FOLDER, OLD_FILE_TIMESTAMP_FORMAT};

lazy_static::lazy_static! {
    static ref ILLEGAL_CHARS: regex::Regex = regex::Regex::new(r#"[<>:"/\\|?*]"#)
        .expect("illegal characters regex is valid");
}

/// Replace characters the host filesystem doesn't allow in file names with `-`
///
/// Only Windows disallows them, elsewhere the name is returned as is
pub fn clean_path(name: &str) -> String {
    if cfg!(windows) {
        clean_name(name)
    }

    else {
        name.to_string()
    }
}

/// Replace `< > : " / \ | ? *` with `-` regardless of the host
pub fn clean_name(name: &str) -> String {
    ILLEGAL_CHARS.replace_all(name, "-").into_owned()
}

/// Create folder with all its parents if it doesn't exist yet
pub fn ensure_dir(path: impl AsRef<Path>) -> std::io::Result<()> {
    let path = path.as_ref();

    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }

    Ok(())
}

/// Move the file into the `old` folder next to it, prefixing its name
/// with the current timestamp
///
/// `game/Game.zip` -> `game/old/2024-01-31T235959-Game.zip`
pub fn archive_old_file(file: impl AsRef<Path>) -> anyhow::Result<PathBuf> {
    let file = file.as_ref();

    let Some(folder) = file.parent() else {
        anyhow::bail!("File {file:?} has no parent folder");
    };

    let Some(name) = file.file_name() else {
        anyhow::bail!("Path {file:?} doesn't point to a file");
    };

    let old_folder = folder.join(OLD_FILES_FOLDER);

    ensure_dir(&old_folder)?;

    let timestamp = chrono::Local::now().format(OLD_FILE_TIMESTAMP_FORMAT);
    let name = name.to_string_lossy();

    let mut target = old_folder.join(format!("{timestamp}-{name}"));
    let mut copy = 1;

    // Same file archived twice within a second
    while target.exists() {
        target = old_folder.join(format!("{timestamp}-{copy}-{name}"));
        copy += 1;
    }

    tracing::debug!("Moving {file:?} to {target:?}");

    fs_extra::file::move_file(file, &target, &fs_extra::file::CopyOptions::new())?;

    Ok(target)
}
