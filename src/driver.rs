//! Per-file compilation and the sequential batch around it.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use miette::{Diagnostic, NamedSource, Report};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    backend,
    error::Result,
    lex::tokenize,
    link::{assemble, link_exe},
    parse::parse,
    symbol::SymbolTable,
};

pub const SOURCE_EXTENSION: &str = "em";

#[derive(Error, Debug, Diagnostic)]
pub enum DriverError {
    #[error("{path} - input file extension is not recognized")]
    #[diagnostic(code(driver::bad_extension), help("enma sources end in '.em'"))]
    BadExtension { path: String },

    #[error("{path} - failed to read")]
    #[diagnostic(code(driver::read))]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} - failed to write")]
    #[diagnostic(code(driver::write))]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' was not found")]
    #[diagnostic(code(driver::tool_not_found), help("install {tool} or pass --emit-asm"))]
    ToolNotFound {
        tool: &'static str,
        #[source]
        source: which::Error,
    },

    #[error("failed to start '{tool}'")]
    #[diagnostic(code(driver::spawn))]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' failed ({status})")]
    #[diagnostic(code(driver::tool_failed))]
    ToolFailed { tool: &'static str, status: ExitStatus },
}

#[derive(Debug, Clone)]
pub struct Options {
    /// Executable to produce from all inputs.
    pub output: PathBuf,
    /// Stop after writing the `.asm` files.
    pub emit_asm_only: bool,
    pub dump_tokens: bool,
    pub dump_ast: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            output: PathBuf::from("output"),
            emit_asm_only: false,
            dump_tokens: false,
            dump_ast: false,
        }
    }
}

#[derive(Debug)]
pub struct Driver {
    options: Options,
}

impl Driver {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Compiles every input in order, stopping at the first failure, then
    /// assembles and links the results unless only assembly was requested.
    pub fn run(&self, inputs: &[PathBuf]) -> miette::Result<()> {
        let mut asm_files = Vec::with_capacity(inputs.len());
        for input in inputs {
            asm_files.push(self.compile_file(input)?);
        }

        if self.options.emit_asm_only {
            return Ok(());
        }

        let objects = asm_files
            .iter()
            .map(|asm| assemble(asm))
            .collect::<Result<Vec<_>>>()?;
        link_exe(&objects, &self.options.output)?;

        info!(output = %self.options.output.display(), "built executable");
        Ok(())
    }

    /// Compiles `name.em` into `name.asm` and returns the written path.
    pub fn compile_file(&self, path: &Path) -> miette::Result<PathBuf> {
        let name = path.display().to_string();
        if path.extension() != Some(OsStr::new(SOURCE_EXTENSION)) {
            return Err(DriverError::BadExtension { path: name }.into());
        }

        let source = fs::read_to_string(path).map_err(|source| DriverError::Read {
            path: name.clone(),
            source,
        })?;

        info!(path = %name, "compiling");
        let asm = match self.compile(&source) {
            Ok(asm) => asm,
            Err(err) => {
                if err.is_internal() {
                    error!(path = %name, "internal compiler error");
                }
                return Err(Report::new(err).with_source_code(NamedSource::new(name, source)));
            }
        };

        let asm_path = path.with_extension("asm");
        fs::write(&asm_path, asm).map_err(|source| DriverError::Write {
            path: asm_path.display().to_string(),
            source,
        })?;
        info!(path = %asm_path.display(), "wrote assembly");
        Ok(asm_path)
    }

    /// Runs lex, parse and codegen over one unit with its own symbol table.
    pub fn compile(&self, source: &str) -> Result<String> {
        let mut symbols = SymbolTable::new();
        let tokens = tokenize(source, &mut symbols)?;
        if self.options.dump_tokens {
            println!("Tokens:");
            for token in &tokens {
                println!("{:?}\t{}\t{}", token.kind.class(), token.kind, token.lexeme);
            }
        }

        let ast = parse(tokens, &symbols)?;
        if self.options.dump_ast {
            println!("AST:");
            print!("{}", ast.render(&symbols)?);
        }

        backend::generate(&ast, &symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("enma-driver-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn asm_only() -> Driver {
        Driver::new(Options {
            emit_asm_only: true,
            ..Options::default()
        })
    }

    #[test]
    fn rejects_other_extensions() {
        let driver = asm_only();
        for name in ["prog.e", "prog.emm", "prog.rs", "prog"] {
            let err = driver.compile_file(Path::new(name)).unwrap_err();
            assert!(err.to_string().contains("extension"), "{name}");
        }
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = scratch("missing");
        let err = asm_only().compile_file(&dir.join("nope.em")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn writes_asm_next_to_source() {
        let dir = scratch("writes");
        let source = dir.join("prog.em");
        fs::write(&source, "let x = 3;\nprint(x + 4);\n").unwrap();

        let asm = asm_only().compile_file(&source).unwrap();
        assert_eq!(asm, dir.join("prog.asm"));
        assert!(fs::read_to_string(asm).unwrap().contains("main:"));
    }

    #[test]
    fn batch_stops_at_first_failure() {
        let dir = scratch("batch");
        let bad = dir.join("bad.em");
        let good = dir.join("good.em");
        fs::write(&bad, "print(y);").unwrap();
        fs::write(&good, "print(1);").unwrap();

        assert!(asm_only().run(&[bad, good.clone()]).is_err());
        assert!(!good.with_extension("asm").exists());
    }

    #[test]
    fn each_unit_gets_fresh_symbols() {
        let driver = asm_only();
        let first = driver.compile("let a = 1; let b = 2; print(b);").unwrap();
        let second = driver.compile("let b = 5; print(b);").unwrap();
        assert!(first.contains("var_1: dq 0 ; b"));
        assert!(second.contains("var_0: dq 0 ; b"));
    }
}
