//! Codec adapters that shell out to the standard optimizer binaries.
//!
//! Each adapter sniffs the buffer, passes foreign formats through, and
//! otherwise runs its tool either over stdin/stdout or, for tools without
//! stream support, over a pair of scratch files.

use std::io::Write;
use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::debug;

use crate::processing::CodecAdapter;
use crate::utils::{CodecError, ImageFormat};

/// Placeholders substituted in file-mode argument templates.
const INPUT_PLACEHOLDER: &str = "{input}";
const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How a tool spells its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStyle {
    /// `--key=value`
    Long,
    /// `-key value`
    Short,
}

/// How data reaches the tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Stdio,
    /// Args contain `{input}` and `{output}` paths
    Files,
}

/// One external optimizer bound to one image format.
#[derive(Debug, Clone)]
pub struct ExternalCodec {
    name: String,
    program: String,
    format: ImageFormat,
    base_args: Vec<String>,
    flag_style: FlagStyle,
    io_mode: IoMode,
    options: Option<Value>,
}

impl ExternalCodec {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        format: ImageFormat,
        base_args: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            format,
            base_args: base_args.iter().map(|a| a.to_string()).collect(),
            flag_style: FlagStyle::Long,
            io_mode: IoMode::Stdio,
            options: None,
        }
    }

    pub fn flag_style(mut self, style: FlagStyle) -> Self {
        self.flag_style = style;
        self
    }

    pub fn io_mode(mut self, mode: IoMode) -> Self {
        self.io_mode = mode;
        self
    }

    /// Attach the user's options verbatim; they are only interpreted when the
    /// tool is invoked.
    pub fn with_options(mut self, options: Option<&Value>) -> Self {
        self.options = options.cloned();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Translate the options object into command-line flags.
    ///
    /// `true` becomes a bare flag, `false`/`null` drop the flag, scalars become
    /// values, and arrays are joined with `-` (e.g. pngquant's `65-80`).
    pub fn option_args(&self) -> Result<Vec<String>, CodecError> {
        let Some(options) = &self.options else {
            return Ok(Vec::new());
        };
        let Value::Object(map) = options else {
            return Err(CodecError::invalid_options(
                &self.name,
                format!("expected an options object, got {options}"),
            ));
        };

        let mut args = Vec::new();
        for (key, value) in map {
            let value = match value {
                Value::Null | Value::Bool(false) => continue,
                Value::Bool(true) => None,
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                Value::Array(items) => Some(join_scalars(&self.name, key, items)?),
                Value::Object(_) => {
                    return Err(CodecError::invalid_options(
                        &self.name,
                        format!("nested object for `{key}`"),
                    ));
                }
            };
            match (self.flag_style, value) {
                (FlagStyle::Long, None) => args.push(format!("--{key}")),
                (FlagStyle::Long, Some(v)) => args.push(format!("--{key}={v}")),
                (FlagStyle::Short, None) => args.push(format!("-{key}")),
                (FlagStyle::Short, Some(v)) => {
                    args.push(format!("-{key}"));
                    args.push(v);
                }
            }
        }
        Ok(args)
    }

    fn run_stdio(&self, args: Vec<String>, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CodecError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| CodecError::Io {
            tool: self.program.clone(),
            source: std::io::Error::other("stdin not captured"),
        })?;

        // Feed stdin from a second thread so a tool that streams output
        // before draining its input cannot deadlock on a full pipe.
        let (output, written) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(input));
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (output, written)
        });
        let output = output.map_err(|source| CodecError::Io {
            tool: self.program.clone(),
            source,
        })?;

        // A tool that bails out early closes its stdin; its exit status is the
        // more useful error.
        if !output.status.success() {
            return Err(CodecError::Failed {
                tool: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written.map_err(|source| CodecError::Io {
            tool: self.program.clone(),
            source,
        })?;
        Ok(output.stdout)
    }

    fn run_files(&self, mut args: Vec<String>, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let io_err = |source: std::io::Error| CodecError::Io {
            tool: self.program.clone(),
            source,
        };
        let scratch = tempfile::tempdir().map_err(io_err)?;
        let ext = self.format.primary_extension();
        let input_path = scratch.path().join(format!("input.{ext}"));
        let output_path = scratch.path().join(format!("output.{ext}"));
        std::fs::write(&input_path, input).map_err(io_err)?;

        for arg in &mut args {
            *arg = arg
                .replace(INPUT_PLACEHOLDER, &input_path.to_string_lossy())
                .replace(OUTPUT_PLACEHOLDER, &output_path.to_string_lossy());
        }

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CodecError::Spawn {
                tool: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CodecError::Failed {
                tool: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        std::fs::read(&output_path).map_err(io_err)
    }
}

fn join_scalars(codec: &str, key: &str, items: &[Value]) -> Result<String, CodecError> {
    let parts = items
        .iter()
        .map(|item| match item {
            Value::Number(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(CodecError::invalid_options(
                codec,
                format!("unsupported list item {other} in `{key}`"),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("-"))
}

impl CodecAdapter for ExternalCodec {
    fn name(&self) -> &str {
        &self.name
    }

    fn compress(&self, input: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        if ImageFormat::sniff(&input) != Some(self.format) {
            return Ok(input);
        }

        let mut args = self.option_args()?;
        args.extend(self.base_args.iter().cloned());
        debug!("Running {} {}", self.program, args.join(" "));

        match self.io_mode {
            IoMode::Stdio => self.run_stdio(args, &input),
            IoMode::Files => self.run_files(args, &input),
        }
    }
}

/// `gifsicle` over stdio.
pub fn gifsicle(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new("gifsicle", "gifsicle", ImageFormat::GIF, &[]).with_options(options)
}

/// `cwebp` re-encoding WebP input; it has no stream mode.
pub fn webp(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new(
        "webp",
        "cwebp",
        ImageFormat::WebP,
        &["-quiet", INPUT_PLACEHOLDER, "-o", OUTPUT_PLACEHOLDER],
    )
    .flag_style(FlagStyle::Short)
    .io_mode(IoMode::Files)
    .with_options(options)
}

/// mozjpeg's `cjpeg` over stdio.
pub fn mozjpeg(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new("mozjpeg", "cjpeg", ImageFormat::JPEG, &[])
        .flag_style(FlagStyle::Short)
        .with_options(options)
}

/// `pngquant`, reading `-` and writing to stdout.
pub fn pngquant(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new("pngquant", "pngquant", ImageFormat::PNG, &["-"]).with_options(options)
}

/// `optipng`, file based.
pub fn optipng(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new(
        "optipng",
        "optipng",
        ImageFormat::PNG,
        &["-quiet", "-out", OUTPUT_PLACEHOLDER, INPUT_PLACEHOLDER],
    )
    .flag_style(FlagStyle::Short)
    .io_mode(IoMode::Files)
    .with_options(options)
}

/// `svgo` with `-i - -o -`.
pub fn svgo(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new("svgo", "svgo", ImageFormat::SVG, &["-i", "-", "-o", "-"]).with_options(options)
}

/// Lossless `jpegtran` over stdio.
pub fn jpegtran(options: Option<&Value>) -> ExternalCodec {
    ExternalCodec::new("jpegTran", "jpegtran", ImageFormat::JPEG, &[])
        .flag_style(FlagStyle::Short)
        .with_options(options)
}
