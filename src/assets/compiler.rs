//! Source dialects and the external compilers that turn them into CSS/JS.
//!
//! Plain `.css` and `.js` files are read verbatim. Everything else is handed
//! to an external program whose stdout becomes the compiled output:
//!
//! | Dialect        | Extension      | Command                    |
//! |----------------|----------------|----------------------------|
//! | Sass / SCSS    | `.scss` `.sass`| `sass --no-source-map FILE`|
//! | Stylus         | `.styl`        | `stylus < FILE`            |
//! | Less           | `.less`        | `lessc FILE`               |
//! | CoffeeScript   | `.coffee`      | `coffee --print FILE`      |

use std::fs::{self, File};
use std::path::Path;
use std::process::{Command, Stdio};

use bytes::Bytes;
use tracing::debug;

use crate::error::AssetError;

use super::cache::AssetKind;

// =============================================================================
// Dialects
// =============================================================================

/// A recognized stylesheet or script source format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceDialect {
    Css,
    Scss,
    Sass,
    Stylus,
    Less,
    JavaScript,
    CoffeeScript,
}

const STYLESHEET_SOURCES: [SourceDialect; 4] = [
    SourceDialect::Scss,
    SourceDialect::Sass,
    SourceDialect::Stylus,
    SourceDialect::Less,
];

const SCRIPT_SOURCES: [SourceDialect; 1] = [SourceDialect::CoffeeScript];

impl SourceDialect {
    /// Detect the dialect from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "css" => Some(SourceDialect::Css),
            "scss" => Some(SourceDialect::Scss),
            "sass" => Some(SourceDialect::Sass),
            "styl" => Some(SourceDialect::Stylus),
            "less" => Some(SourceDialect::Less),
            "js" => Some(SourceDialect::JavaScript),
            "coffee" => Some(SourceDialect::CoffeeScript),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceDialect::Css => "css",
            SourceDialect::Scss => "scss",
            SourceDialect::Sass => "sass",
            SourceDialect::Stylus => "styl",
            SourceDialect::Less => "less",
            SourceDialect::JavaScript => "js",
            SourceDialect::CoffeeScript => "coffee",
        }
    }

    pub fn kind(&self) -> AssetKind {
        match self {
            SourceDialect::Css
            | SourceDialect::Scss
            | SourceDialect::Sass
            | SourceDialect::Stylus
            | SourceDialect::Less => AssetKind::Stylesheet,
            SourceDialect::JavaScript | SourceDialect::CoffeeScript => AssetKind::Script,
        }
    }

    /// Whether an external compiler is needed.
    pub fn needs_compiler(&self) -> bool {
        !matches!(self, SourceDialect::Css | SourceDialect::JavaScript)
    }

    /// Dialects that compile to `kind`, excluding the plain one.
    pub fn compiled_dialects(kind: AssetKind) -> &'static [SourceDialect] {
        match kind {
            AssetKind::Stylesheet => &STYLESHEET_SOURCES,
            AssetKind::Script => &SCRIPT_SOURCES,
        }
    }
}

// =============================================================================
// AssetCompiler Trait
// =============================================================================

/// Turns a source file into compiled bytes.
///
/// The watcher is generic over this so tests can count invocations without
/// spawning processes.
pub trait AssetCompiler: Send + Sync {
    /// Compile `source`, which has already been classified as `dialect`.
    fn compile(&self, source: &Path, dialect: SourceDialect) -> Result<Bytes, AssetError>;
}

// =============================================================================
// External Compiler
// =============================================================================

/// Program names for each external compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommands {
    pub sass: String,
    pub stylus: String,
    pub lessc: String,
    pub coffee: String,
}

impl Default for CompilerCommands {
    fn default() -> Self {
        Self {
            sass: "sass".to_string(),
            stylus: "stylus".to_string(),
            lessc: "lessc".to_string(),
            coffee: "coffee".to_string(),
        }
    }
}

/// Compiler that shells out to the programs in [`CompilerCommands`].
#[derive(Debug, Clone, Default)]
pub struct ExternalCompiler {
    commands: CompilerCommands,
}

impl ExternalCompiler {
    pub fn new(commands: CompilerCommands) -> Self {
        Self { commands }
    }
}

impl AssetCompiler for ExternalCompiler {
    fn compile(&self, source: &Path, dialect: SourceDialect) -> Result<Bytes, AssetError> {
        let file = source.as_os_str();
        match dialect {
            SourceDialect::Css | SourceDialect::JavaScript => read_verbatim(source),
            SourceDialect::Scss | SourceDialect::Sass => {
                let mut cmd = Command::new(&self.commands.sass);
                cmd.arg("--no-source-map").arg(file);
                run(cmd, &self.commands.sass, source, None)
            }
            SourceDialect::Stylus => {
                let cmd = Command::new(&self.commands.stylus);
                run(cmd, &self.commands.stylus, source, Some(source))
            }
            SourceDialect::Less => {
                let mut cmd = Command::new(&self.commands.lessc);
                cmd.arg(file);
                run(cmd, &self.commands.lessc, source, None)
            }
            SourceDialect::CoffeeScript => {
                let mut cmd = Command::new(&self.commands.coffee);
                cmd.arg("--print").arg(file);
                run(cmd, &self.commands.coffee, source, None)
            }
        }
    }
}

fn read_verbatim(source: &Path) -> Result<Bytes, AssetError> {
    fs::read(source)
        .map(Bytes::from)
        .map_err(|e| AssetError::Io {
            path: source.to_path_buf(),
            source: e,
        })
}

/// Run a compiler to completion and return its stdout.
fn run(
    mut cmd: Command,
    program: &str,
    source: &Path,
    stdin: Option<&Path>,
) -> Result<Bytes, AssetError> {
    match stdin {
        Some(path) => {
            let input = File::open(path).map_err(|e| AssetError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            cmd.stdin(Stdio::from(input));
        }
        None => {
            cmd.stdin(Stdio::null());
        }
    }

    debug!(program = program, source = %source.display(), "Running compiler");

    let output = cmd.output().map_err(|e| AssetError::Spawn {
        program: program.to_string(),
        source: e,
    })?;

    if !output.status.success() {
        return Err(AssetError::CompilerFailed {
            program: program.to_string(),
            path: source.to_path_buf(),
            status: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(Bytes::from(output.stdout))
}

// =============================================================================
// Tests
// =============================================================================
