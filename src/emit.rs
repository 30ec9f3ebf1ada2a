// Copyright 2018-2024 the Deno authors. MIT license.

use deno_ast::swc::ast::Module;
use deno_ast::swc::codegen::text_writer::JsWriter;
use deno_ast::swc::codegen::Emitter;
use deno_ast::swc::codegen::Node;
use deno_ast::swc::common::sync::Lrc;
use deno_ast::swc::common::SourceMap;
use deno_ast::swc_codegen_config;
use thiserror::Error;

#[derive(Debug, Error, deno_error::JsError)]
pub enum EmitError {
  #[class(inherit)]
  #[error(transparent)]
  Io(#[from] std::io::Error),
  #[class(generic)]
  #[error(transparent)]
  Utf8(#[from] std::string::FromUtf8Error),
}

/// Serializes a packed module to JavaScript source text.
pub fn emit_module(module: &Module) -> Result<String, EmitError> {
  let source_map = Lrc::new(SourceMap::default());
  let mut buf = vec![];
  {
    let mut writer =
      Box::new(JsWriter::new(source_map.clone(), "\n", &mut buf, None));
    writer.set_indent_str("  "); // two spaces

    let mut emitter = Emitter {
      cfg: swc_codegen_config(),
      comments: None,
      cm: source_map.clone(),
      wr: writer,
    };
    module.emit_with(&mut emitter)?;
  }
  Ok(String::from_utf8(buf)?)
}
