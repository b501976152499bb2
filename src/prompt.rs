use anyhow::{Context, Result};
use std::io::{self, Write};

/// Blocking stdin prompt. These flows are strictly sequential, so holding the
/// runtime for operator input is fine.
pub fn read_line(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    Ok(line.trim().to_string())
}
