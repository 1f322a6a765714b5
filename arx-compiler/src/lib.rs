//! Back end of the ARX compiler.
//!
//! Takes the parser's AST (the [`ast`] contract types), compiles each class
//! in its own code-generation context, merges the per-class streams with
//! offset relocation, resolves labels, links, and hands the result to the
//! `arx-mod` container writer.
//!
//! ```
//! use arx_compiler::{ast, build};
//!
//! let module = ast::Module::executable(
//!     "hello",
//!     vec![ast::Stmt::writeln(ast::Expr::str("Hello, World"))],
//! );
//! let compiled = build(&module).unwrap();
//! let image = compiled.to_bytes().unwrap();
//! assert!(!image.is_empty());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(unused_must_use)]

pub mod ast;
mod codegen;
mod error;
mod linker;

pub use codegen::{compile, plus_is_concat, CompiledModule};
pub use error::{CodegenWarning, LinkError};
pub use linker::link;

/// Compile and link a module in one step.
pub fn build(module: &ast::Module) -> Result<CompiledModule, LinkError> {
    let mut compiled = compile(module);
    link(&mut compiled)?;
    Ok(compiled)
}
