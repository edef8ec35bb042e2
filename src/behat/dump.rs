//! Failure dumps -- echo Behat's HTML artifacts into the CI log.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::Result;

/// Write every `.html` artifact in `dir` to `out`, each bracketed by a
/// delimiter line carrying its file name so concatenated dumps stay
/// greppable. A missing directory is the success case: nothing failed, so
/// nothing was dumped.
pub fn dump_failures(dir: &Path, out: &mut dyn Write) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.extension().is_some_and(|ext| ext == "html") {
            continue;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = fs::read_to_string(&path)?;
        writeln!(out, "===== {} =====", name)?;
        writeln!(out, "{}", contents)?;
        writeln!(out, "===== {} =====", name)?;
    }

    Ok(())
}
