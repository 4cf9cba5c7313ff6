//! Turning generated `.asm` files into an executable with the host
//! toolchain: `nasm` assembles, `gcc` links against libc.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::{driver::DriverError, error::Result};

fn find_tool(tool: &'static str) -> Result<PathBuf> {
    Ok(which::which(tool).map_err(|source| DriverError::ToolNotFound { tool, source })?)
}

fn run_tool(tool: &'static str, command: &mut Command) -> Result<()> {
    let status = command
        .status()
        .map_err(|source| DriverError::Spawn { tool, source })?;
    if !status.success() {
        return Err(DriverError::ToolFailed { tool, status }.into());
    }
    Ok(())
}

/// Assembles `asm` into an ELF64 object next to it and returns the object path.
pub fn assemble(asm: &Path) -> Result<PathBuf> {
    let nasm = find_tool("nasm")?;
    let object = asm.with_extension("o");

    info!(asm = %asm.display(), object = %object.display(), "assembling");
    run_tool(
        "nasm",
        Command::new(nasm)
            .args(["-f", "elf64", "-o"])
            .arg(&object)
            .arg(asm),
    )?;
    Ok(object)
}

/// Links `objects` with libc into `out_exe`.
pub fn link_exe(objects: &[PathBuf], out_exe: &Path) -> Result<()> {
    let gcc = find_tool("gcc")?;

    info!(objects = objects.len(), output = %out_exe.display(), "linking");
    run_tool("gcc", Command::new(gcc).args(objects).arg("-o").arg(out_exe))
}

/// True when both external tools can be found.
pub fn toolchain_available() -> bool {
    which::which("nasm").is_ok() && which::which("gcc").is_ok()
}
