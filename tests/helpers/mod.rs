// Copyright 2018-2024 the Deno authors. MIT license.

use deno_pack::emit_module;
use deno_pack::pack;
use deno_pack::plugin;
use deno_pack::source::MemoryLoader;
use deno_pack::PackConfig;
use deno_pack::PackError;
use deno_pack::PackOptions;
use deno_pack::PluginOptions;

pub struct TestBuilder {
  loader: MemoryLoader,
  entry_points: Vec<String>,
  config: PackConfig,
}

impl TestBuilder {
  pub fn new() -> Self {
    let _ = env_logger::builder().is_test(true).try_init();
    Self {
      loader: Default::default(),
      entry_points: vec!["/main.js".to_string()],
      config: Default::default(),
    }
  }

  pub fn with_loader(
    &mut self,
    mut action: impl FnMut(&mut MemoryLoader),
  ) -> &mut Self {
    action(&mut self.loader);
    self
  }

  pub fn entry_points(&mut self, values: &[&str]) -> &mut Self {
    self.entry_points = values.iter().map(|v| v.to_string()).collect();
    self
  }

  pub fn config(&mut self, config: PackConfig) -> &mut Self {
    self.config = config;
    self
  }

  pub fn pack(&self) -> Result<String, PackError> {
    let module = pack(
      self.entry_points.as_slice(),
      PackOptions {
        maybe_loader: Some(&self.loader),
        config: self.config,
        ..Default::default()
      },
    )?;
    Ok(emit_module(&module).unwrap())
  }

  pub fn plugin(&self) -> Result<String, PackError> {
    let module = plugin(
      self.entry_points.as_slice(),
      PluginOptions {
        maybe_loader: Some(&self.loader),
        ..Default::default()
      },
    )?;
    Ok(emit_module(&module).unwrap())
  }
}

/// Asserts the snippets appear in the text in the given order.
pub fn assert_in_order(text: &str, snippets: &[&str]) {
  let mut start = 0;
  for snippet in snippets {
    match text[start..].find(snippet) {
      Some(index) => start += index + snippet.len(),
      None => panic!("expected {:?} after offset {} in:\n{}", snippet, start, text),
    }
  }
}
