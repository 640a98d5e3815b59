use std::path::Path;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;

use crate::error::WasmAssetError;

/// Parses generator-emitted ES module code. Top-level `return` is accepted so
/// that glue code written for CommonJS wrappers still parses.
pub fn parse_module<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
    path: &Path,
) -> Result<Program<'a>, WasmAssetError> {
    parse_with(allocator, source_text, path, SourceType::mjs())
}

/// Parses a classic script, the shape of wasm-bindgen's `--no-modules` output.
pub fn parse_script<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
    path: &Path,
) -> Result<Program<'a>, WasmAssetError> {
    parse_with(allocator, source_text, path, SourceType::cjs())
}

fn parse_with<'a>(
    allocator: &'a Allocator,
    source_text: &'a str,
    path: &Path,
    source_type: SourceType,
) -> Result<Program<'a>, WasmAssetError> {
    let options = ParseOptions {
        allow_return_outside_function: true,
        ..ParseOptions::default()
    };
    let parsed = Parser::new(allocator, source_text, source_type)
        .with_options(options)
        .parse();
    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(WasmAssetError::Parse {
            path: path.to_path_buf(),
            message: if message.is_empty() {
                "parser aborted".to_string()
            } else {
                message
            },
        });
    }
    Ok(parsed.program)
}
