use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::Result;

/// Ask whether to overwrite `path`. Anything but `y`/`yes` declines,
/// including end of input.
pub fn confirm_overwrite(path: &Path, input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "File \"{}\" exists. Overwrite? [y/N] ", path.display())?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
