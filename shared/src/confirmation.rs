use crate::types::Result;
use dialoguer::Confirm;
use std::io::IsTerminal;

pub fn recreate_prompt(index: &str) -> String {
    format!("Recreate {index}? Every indexed document will be deleted and embedded again.")
}

/// Ask before dropping an index. `assume_yes` answers for the user. With no
/// terminal on stdin nobody can answer, which counts as a no.
pub fn confirm_recreate(index: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        tracing::debug!(index, "recreate confirmed by flag");
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        tracing::warn!(index, "stdin is not a terminal, pass --yes to recreate");
        return Ok(false);
    }
    let choice = Confirm::new()
        .with_prompt(recreate_prompt(index))
        .default(false)
        .show_default(true)
        .interact()?;
    Ok(choice)
}
