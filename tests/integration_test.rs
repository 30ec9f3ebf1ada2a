// Copyright 2018-2024 the Deno authors. MIT license.

// These tests go through the public API only, so they also ensure the types
// needed to drive the packer are exported.

use std::sync::Arc;

use deno_pack::PackConfig;
use deno_pack::PackError;
use pretty_assertions::assert_eq;

use crate::helpers::assert_in_order;
use crate::helpers::TestBuilder;

mod helpers;

fn no_exports() -> PackConfig {
  PackConfig {
    no_exports: true,
    ..Default::default()
  }
}

#[test]
fn test_pack_flattens_modules() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import f from './b.js';\nexport const v = 2;\nconsole.log(v + f());\n",
      );
      loader.add_source_with_text("/b.js", "export default () => 1;");
    })
    .config(no_exports())
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "const b_default = ",
      "const a_v = 2;",
      "console.log(a_v + b_default());",
    ],
  );
  assert!(!output.contains("export"), "{}", output);
  assert!(!output.contains("import"), "{}", output);
  assert!(!output.contains("imports"), "{}", output);
}

#[test]
fn test_pack_name_collisions() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import { x as y } from './lib.js';\nconst x = 'main';\nfunction show(x) { return x; }\nshow(x + y);\n",
      );
      loader.add_source_with_text(
        "/lib.js",
        "const x = 'lib';\nexport { x };\n",
      );
    })
    .config(no_exports())
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "const b_x = 'lib';",
      "const a_x = 'main';",
      "function a_show(x) {",
      "return x;",
      "a_show(a_x + b_x);",
    ],
  );
}

#[test]
fn test_pack_shared_dependency_once() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import './one.js';\nimport './two.js';\nconsole.log('main');",
      );
      loader.add_source_with_text(
        "/one.js",
        "import { shared } from './shared.js';\nconsole.log('one', shared);",
      );
      loader.add_source_with_text(
        "/two.js",
        "import { shared } from '/shared.js';\nconsole.log('two', shared);",
      );
      loader.add_source_with_text("/shared.js", "export const shared = 1;");
    })
    .config(no_exports())
    .pack()
    .unwrap();
  assert_eq!(output.matches("const c_shared = 1;").count(), 1);
  assert_in_order(
    &output,
    &[
      "const c_shared = 1;",
      "console.log('one', c_shared);",
      "console.log('two', c_shared);",
      "console.log('main');",
    ],
  );
}

#[test]
fn test_pack_export_primary() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "export { value } from './re.js';\nexport * from './all.js';\nexport default function main() {}\n",
      );
      loader.add_source_with_text(
        "/re.js",
        "export { value } from './lib.js';",
      );
      loader.add_source_with_text("/lib.js", "export let value = 1;");
      loader.add_source_with_text(
        "/all.js",
        "export const other = 2;\nexport default 3;\n",
      );
    })
    .config(PackConfig {
      export_primary: true,
      bare: true,
      ..Default::default()
    })
    .pack()
    .unwrap();
  assert!(
    output.contains(
      "export { a_main as default, d_other as other, c_value as value };"
    ),
    "{}",
    output
  );
  // star exports never forward a default export
  assert!(!output.contains("d_default as"), "{}", output);
  assert!(!output.contains("imports"), "{}", output);
}

#[test]
fn test_pack_loader_table() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import * as utils from './utils.js';\nconst lazy = await import('./lazy.js');\nconsole.log(utils.add(1, 2), lazy.value);\n",
      );
      loader.add_source_with_text(
        "/utils.js",
        "export function add(a, b) { return a + b; }",
      );
      loader.add_source_with_text("/lazy.js", "export const value = 'lazy';");
    })
    .config(PackConfig {
      parse_dynamic: true,
      bare: true,
      ..Default::default()
    })
    .pack()
    .unwrap();
  // every export of a served module gets its own accessor
  let compact = output
    .chars()
    .filter(|c| !c.is_whitespace())
    .collect::<String>();
  assert!(
    compact.starts_with(concat!(
      r#"constimports=newMap([["/lazy.js",["value",()=>c_value]],"#,
      r#"["/utils.js",["add",()=>b_add]]].map("#,
    )),
    "{}",
    output
  );
  assert!(!output.contains("\"/main.js\""), "{}", output);
  assert!(
    output.contains("Object.defineProperty(globalThis, \"include\""),
    "{}",
    output
  );
  assert!(
    output.contains("const a_lazy = await include(\"/lazy.js\");"),
    "{}",
    output
  );
  assert!(
    output.contains(
      "console.log(imports.get(\"/utils.js\").add(1, 2), a_lazy.value);"
    ),
    "{}",
    output
  );
}

#[test]
fn test_pack_serves_every_module_by_default() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import { b } from './b.js';\nexport const a = b;",
      );
      loader.add_source_with_text("/b.js", "export const b = 1;");
    })
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "const imports = new Map(",
      "\"/b.js\"",
      "\"/main.js\"",
      "Object.defineProperty(globalThis, \"include\"",
      "const b_b = 1;",
      "const a_a = b_b;",
    ],
  );
  assert!(!output.contains("export"), "{}", output);
}

#[test]
fn test_pack_import_meta() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import './nested/mod.js';\nconsole.log(import.meta.url);",
      );
      loader.add_source_with_text(
        "/nested/mod.js",
        "export const url = new URL('./data.json', import.meta.url);",
      );
    })
    .config(no_exports())
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "const o = location.origin",
      "b$meta = {",
      "url: o + \"/nested/mod.js\"",
      "a$meta = {",
      "url: o + \"/main.js\"",
      "const b_url = new URL('./data.json', b$meta.url);",
      "console.log(a$meta.url);",
    ],
  );
}

#[test]
fn test_pack_typescript() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "import { greet } from './greet.ts';\nconsole.log(greet('deno'));",
      );
      loader.add_source_with_text(
        "/greet.ts",
        "import type { Name } from './types.ts';\nexport function greet(name: Name): string {\n  return `hello ${name}`;\n}\n",
      );
    })
    .config(no_exports())
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "function b_greet(name) {",
      "console.log(b_greet('deno'));",
    ],
  );
  assert!(!output.contains("Name"), "{}", output);
}

#[test]
fn test_pack_reorder() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/main.js",
        "customElements.define('x-el', El);\nconst value = 1;\nclass El extends HTMLElement {}\n",
      );
    })
    .config(PackConfig {
      no_exports: true,
      reorder: true,
      ..Default::default()
    })
    .pack()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "class a_El extends HTMLElement",
      "customElements.define('x-el', a_El);",
      "const a_value = 1;",
    ],
  );
}

#[test]
fn test_pack_errors() {
  let err = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text("/main.js", "import './missing.js';");
    })
    .pack()
    .unwrap_err();
  assert!(matches!(err, PackError::ModuleNotFound(_)));
  assert_eq!(err.to_string(), "module not found: file:///missing.js");

  let err = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text("/main.js", "import { nope } from './b.js';");
      loader.add_source_with_text("/b.js", "export const yes = 1;");
    })
    .config(no_exports())
    .pack()
    .unwrap_err();
  assert_eq!(err.to_string(), "invalid export \"nope\" in file:///b.js");

  let err = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text("/main.js", "const = ;");
    })
    .pack()
    .unwrap_err();
  assert!(matches!(err, PackError::Parse { .. }));

  let err = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text("/main.js", "import './locked.js';");
      loader.add_error(
        "/locked.js",
        Arc::new(std::io::Error::new(
          std::io::ErrorKind::PermissionDenied,
          "denied",
        )),
      );
    })
    .pack()
    .unwrap_err();
  assert!(matches!(err, PackError::Load { .. }));

  let err = TestBuilder::new()
    .entry_points(&["main.js"])
    .pack()
    .unwrap_err();
  assert_eq!(
    err.to_string(),
    "added files must be absolute URLs: main.js"
  );

  let err = TestBuilder::new().entry_points(&[]).pack().unwrap_err();
  assert!(matches!(err, PackError::NoFiles));
}

#[test]
fn test_plugin() {
  let output = TestBuilder::new()
    .with_loader(|loader| {
      loader.add_source_with_text(
        "/plugins/chart.js",
        "import { render } from '../lib/render.js';\nimport * as theme from '/lib/theme.js';\nexport function draw(el) { render(el, theme.colors); }\n",
      );
    })
    .entry_points(&["/plugins/chart.js"])
    .plugin()
    .unwrap();
  assert_in_order(
    &output,
    &[
      "const [a, b] = await Promise.all([",
      "\"/lib/render.js\"",
      "\"/lib/theme.js\"",
      "].map(include));",
      "function __draw(el) {",
      "a.render(el, b.colors);",
    ],
  );

  let err = TestBuilder::new()
    .entry_points(&["/a.js", "/b.js"])
    .plugin()
    .unwrap_err();
  assert_eq!(
    err.to_string(),
    "plugin mode requires exactly one file, got 2"
  );
}
