// Copyright 2018-2024 the Deno authors. MIT license.

use std::sync::Arc;

use deno_ast::swc::ast::Module;
use deno_ast::swc::ast::ModuleItem;
use deno_ast::swc::common::SyntaxContext;
use deno_ast::EmitOptions;
use deno_ast::MediaType;
use deno_ast::ParseDiagnostic;
use deno_ast::ParsedSource;
use deno_ast::ProgramRef;
use deno_ast::SourceMapOption;
use deno_ast::TranspileError;
use deno_ast::TranspileModuleOptions;
use deno_ast::TranspileOptions;
use thiserror::Error;

use crate::graph::PackError;
use crate::module_specifier::ModuleSpecifier;
use crate::source::Loader;

pub struct ParseOptions<'a> {
  pub specifier: &'a ModuleSpecifier,
  pub source: Arc<str>,
  pub media_type: MediaType,
}

#[derive(Debug, Error, deno_error::JsError)]
pub enum ParseError {
  #[class(syntax)]
  #[error(transparent)]
  Parse(#[from] ParseDiagnostic),
  #[class(generic)]
  #[error(transparent)]
  Transpile(#[from] TranspileError),
}

/// Parses modules to a ParsedSource.
///
/// The returned source must be a JavaScript module parsed with scope
/// analysis, as the packer relies on the syntax contexts of identifiers to
/// find top-level bindings.
pub trait ModuleParser {
  fn parse_module(
    &self,
    options: ParseOptions,
  ) -> Result<ParsedSource, ParseError>;
}

/// Parses JavaScript directly and transpiles TypeScript and JSX to
/// JavaScript before parsing it again with scope analysis.
#[derive(Default, Clone)]
pub struct DefaultModuleParser;

impl DefaultModuleParser {
  pub fn new() -> Self {
    Self
  }
}

fn parse_with_scope_analysis(
  specifier: &ModuleSpecifier,
  text: Arc<str>,
  media_type: MediaType,
) -> Result<ParsedSource, ParseDiagnostic> {
  deno_ast::parse_module(deno_ast::ParseParams {
    specifier: specifier.clone(),
    text,
    media_type,
    capture_tokens: false,
    scope_analysis: true,
    maybe_syntax: None,
  })
}

impl ModuleParser for DefaultModuleParser {
  fn parse_module(
    &self,
    options: ParseOptions,
  ) -> Result<ParsedSource, ParseError> {
    match options.media_type {
      MediaType::TypeScript
      | MediaType::Mts
      | MediaType::Cts
      | MediaType::Tsx
      | MediaType::Jsx => {
        let parsed = deno_ast::parse_module(deno_ast::ParseParams {
          specifier: options.specifier.clone(),
          text: options.source,
          media_type: options.media_type,
          capture_tokens: false,
          scope_analysis: false,
          maybe_syntax: None,
        })?;
        let emitted = parsed
          .transpile(
            &TranspileOptions::default(),
            &TranspileModuleOptions::default(),
            &EmitOptions {
              source_map: SourceMapOption::None,
              ..Default::default()
            },
          )?
          .into_source();
        Ok(parse_with_scope_analysis(
          options.specifier,
          emitted.text.into(),
          MediaType::JavaScript,
        )?)
      }
      MediaType::JavaScript | MediaType::Mjs | MediaType::Cjs => Ok(
        parse_with_scope_analysis(
          options.specifier,
          options.source,
          options.media_type,
        )?,
      ),
      // anything else is assumed to be javascript
      _ => Ok(parse_with_scope_analysis(
        options.specifier,
        options.source,
        MediaType::JavaScript,
      )?),
    }
  }
}

/// A parsed module ready to be packed.
#[derive(Debug, Clone)]
pub struct ParsedModule {
  pub module: Module,
  /// The syntax context of identifiers bound at the top level of the module.
  pub top_level_context: SyntaxContext,
}

impl ParsedModule {
  pub fn from_parsed_source(parsed_source: &ParsedSource) -> Self {
    let module = match parsed_source.program_ref() {
      ProgramRef::Module(module) => module.clone(),
      ProgramRef::Script(script) => Module {
        span: script.span,
        body: script
          .body
          .iter()
          .cloned()
          .map(ModuleItem::Stmt)
          .collect(),
        shebang: script.shebang.clone(),
      },
    };
    Self {
      module,
      top_level_context: parsed_source.top_level_context(),
    }
  }
}

/// Loads and parses modules.
pub struct ModuleSource<'a> {
  loader: &'a dyn Loader,
  parser: &'a dyn ModuleParser,
}

impl<'a> ModuleSource<'a> {
  pub fn new(loader: &'a dyn Loader, parser: &'a dyn ModuleParser) -> Self {
    Self { loader, parser }
  }

  pub fn load(
    &self,
    specifier: &ModuleSpecifier,
  ) -> Result<ParsedModule, PackError> {
    let response = self
      .loader
      .load(specifier)
      .map_err(|source| PackError::Load {
        specifier: specifier.clone(),
        source,
      })?
      .ok_or_else(|| PackError::ModuleNotFound(specifier.clone()))?;
    let parsed_source = self
      .parser
      .parse_module(ParseOptions {
        specifier,
        source: response.content,
        media_type: response.media_type,
      })
      .map_err(|source| PackError::Parse {
        specifier: specifier.clone(),
        source,
      })?;
    Ok(ParsedModule::from_parsed_source(&parsed_source))
  }
}
