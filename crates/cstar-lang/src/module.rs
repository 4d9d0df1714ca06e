//! Module loading and the compile driver.
//!
//! [`ModuleGraph`] owns every loaded module. Loading is recursive: a
//! module's imports are resolved, read and parsed before the module
//! itself, so the `modules` list ends up in dependency order. Each
//! module parses as one statement block inside its own namespace scope
//! under the root, which is what makes `a::b` lookups work across
//! files.
//!
//! Before a token buffer is frozen, `include "file"` directives are cut
//! out and the named file's tokens spliced in their place, tagged with
//! the directive so diagnostics can point back to the include site.

use crate::ast::Node;
use crate::error::{pos_to_span, ModuleError, Warning};
use crate::parse::Ctx;
use crate::scope::{ScopeKind, Sid, Symbol, SID_GLOBAL};
use crate::stream::TokenBuffer;
use crate::token::{Token, TokenKind};
use crate::util::PathExt;
use cstar_val::{CstStr, StrExt};
use normalize_path::NormalizePath;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// One loaded source file, parsed into a statement block under its own
/// scope.
#[derive(Debug)]
pub struct Module {
    pub name: CstStr,
    pub path: PathBuf,
    pub sid: Sid,
    pub node: Node,
    /// Only a `.hst` header was found for this module.
    pub header_only: bool,
}

pub struct ModuleGraph {
    modules: Vec<Module>,
    /// Names that failed to resolve, so each is reported once.
    missing: Vec<CstStr>,
    /// Names currently being loaded; an import back into this set is a
    /// cycle and is skipped.
    loading: Vec<CstStr>,
    /// Files currently being spliced by `include`.
    including: Vec<PathBuf>,
    std_root: Option<PathBuf>,
    no_std_lang: bool,
}

impl ModuleGraph {
    pub fn new(no_std_lang: bool) -> Self {
        ModuleGraph {
            modules: Vec::new(),
            missing: Vec::new(),
            loading: Vec::new(),
            including: Vec::new(),
            std_root: std::env::var_os("CSTC_STD").map(|raw| expand_home(PathBuf::from(raw))),
            no_std_lang,
        }
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Compile `path` and everything it imports. Returns the root
    /// module's parsed block, or None when the file cannot be read.
    pub fn compile(&mut self, path: &Path, ctx: &mut Ctx) -> Option<&Module> {
        if !self.no_std_lang {
            self.load_std_lang(ctx);
        }
        let name = CstStr::from(path.file_stem()?.to_string_lossy().as_ref());
        let text = std::fs::read_to_string(path).ok()?;
        let header_only = path.extension().is_some_and(|e| e == "hst");
        let idx = self.load_text(name, path.to_path_buf(), text, header_only, ctx)?;
        self.modules.get(idx)
    }

    /// Resolve an imported module name and load it if it is new.
    /// Reports "module not found" once per name.
    pub fn load(
        &mut self,
        name: &CstStr,
        importer_dir: &Path,
        at: &Token,
        ctx: &mut Ctx,
    ) -> Option<usize> {
        if let Some(idx) = self.modules.iter().position(|m| m.name == *name) {
            return Some(idx);
        }
        if self.loading.contains(name) || self.missing.contains(name) {
            return None;
        }
        let Some((path, resolved, header_only)) = self.resolve(name, importer_dir) else {
            self.missing.push(name.clone());
            ctx.reporter.report_at(
                at,
                ModuleError::ModuleNotFound {
                    name: name.to_string(),
                    span: pos_to_span(&at.pos),
                },
            );
            return None;
        };
        if header_only {
            ctx.reporter.report_at(
                at,
                Warning::NoImplementationFile {
                    module: name.to_string(),
                    span: pos_to_span(&at.pos),
                },
            );
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => {
                self.missing.push(name.clone());
                ctx.reporter.report_at(
                    at,
                    ModuleError::FileNotFound {
                        path: path.display().to_string(),
                        span: pos_to_span(&at.pos),
                    },
                );
                return None;
            }
        };
        self.load_text(resolved, path, text, header_only, ctx)
    }

    fn load_text(
        &mut self,
        name: CstStr,
        path: PathBuf,
        text: String,
        header_only: bool,
        ctx: &mut Ctx,
    ) -> Option<usize> {
        self.loading.push(name.clone());
        let filename = path.unified();
        ctx.reporter.add_source(filename.clone(), text.clone());
        let mut buffer = crate::lexer::tokenize(&text, filename, &mut ctx.reporter);
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        self.splice_includes(&mut buffer, &path, ctx);
        // imported modules load (and parse) before this one
        for (imported, at) in scan_imports(&buffer) {
            self.load(&imported, &dir, &at, ctx);
        }
        let tokens = buffer.freeze();

        let sid = self.enter_module_scope(&name, ctx);
        if !self.no_std_lang && name.as_str() != "lang" {
            let lang = Sid::new("lang");
            if ctx.table.scope(&lang).is_some() {
                ctx.table.include(lang);
            }
        }
        let node = crate::parse::flow::parse_block(&tokens, 0, ctx);
        ctx.table.move_to(&SID_GLOBAL.clone());

        self.loading.pop();
        self.modules.push(Module {
            name,
            path,
            sid,
            node,
            header_only,
        });
        Some(self.modules.len() - 1)
    }

    /// `a::b` maps to `a/b.cst` under the importer's directory or the
    /// `CSTC_STD` root. On a miss the last segment is dropped and the
    /// rest retried, so `import math::twice` still finds `math.cst`.
    /// A `.hst` header is only picked up when no `.cst` exists.
    fn resolve(&self, name: &CstStr, importer_dir: &Path) -> Option<(PathBuf, CstStr, bool)> {
        let segments: Vec<&str> = name.split("::").collect();
        for take in (1..=segments.len()).rev() {
            let rel: PathBuf = segments[..take].iter().collect();
            let resolved = CstStr::from(segments[..take].join("::"));
            for dir in [Some(importer_dir), self.std_root.as_deref()]
                .into_iter()
                .flatten()
            {
                let cst = dir.join(rel.with_extension("cst")).normalize();
                if cst.is_file() {
                    return Some((cst, resolved, false));
                }
                let hst = dir.join(rel.with_extension("hst")).normalize();
                if hst.is_file() {
                    return Some((hst, resolved, true));
                }
            }
        }
        None
    }

    fn load_std_lang(&mut self, ctx: &mut Ctx) {
        let name = CstStr::from("lang");
        if self.modules.iter().any(|m| m.name == name) || self.missing.contains(&name) {
            return;
        }
        let Some(root) = self.std_root.clone() else { return };
        let path = root.join("lang.cst");
        let Ok(text) = std::fs::read_to_string(&path) else {
            // no stdlib shipped, nothing to auto-include
            self.missing.push(name);
            return;
        };
        self.load_text(name, path, text, false, ctx);
    }

    /// Cut every `include "file"` directive out of the buffer and
    /// splice the named file's tokens in its place.
    fn splice_includes(&mut self, buffer: &mut TokenBuffer, from: &Path, ctx: &mut Ctx) {
        let dir = from.parent().map(Path::to_path_buf).unwrap_or_default();
        self.including.push(from.to_path_buf());
        let mut i = 0;
        while i < buffer.len() {
            if buffer.get(i).map(|t| t.kind) != Some(TokenKind::Include) {
                i += 1;
                continue;
            }
            let directive = buffer.get(i).cloned();
            let target = buffer.get(i + 1).cloned();
            // cut the whole directive, trailing ';' included
            let mut cut_to = i + 2;
            if buffer.get(cut_to).map(|t| t.kind) == Some(TokenKind::EndCmd) {
                cut_to += 1;
            }
            let Some(target) = target.filter(|t| t.kind == TokenKind::Str) else {
                if let Some(directive) = &directive {
                    ctx.reporter.report_at(
                        directive,
                        ModuleError::FileNotFound {
                            path: String::new(),
                            span: pos_to_span(&directive.pos),
                        },
                    );
                }
                buffer.cut(i, cut_to.min(i + 2));
                continue;
            };
            buffer.cut(i, cut_to);

            let path = dir.join(target.text.unquote('"').as_str()).normalize();
            if self.including.contains(&path) {
                ctx.reporter.report_at(
                    &target,
                    ModuleError::IncludeCycle {
                        path: path.display().to_string(),
                        span: pos_to_span(&target.pos),
                    },
                );
                continue;
            }
            let Ok(text) = std::fs::read_to_string(&path) else {
                ctx.reporter.report_at(
                    &target,
                    ModuleError::FileNotFound {
                        path: path.display().to_string(),
                        span: pos_to_span(&target.pos),
                    },
                );
                continue;
            };
            let filename = path.unified();
            ctx.reporter.add_source(filename.clone(), text.clone());
            let mut included = crate::lexer::tokenize(&text, filename, &mut ctx.reporter);
            self.splice_includes(&mut included, &path, ctx);
            let spliced: Vec<Token> = included.iter().cloned().collect();
            let count = spliced.len();
            buffer.include(i, spliced, Rc::new(target));
            i += count;
        }
        self.including.pop();
    }

    /// Walk the `::` segments of a module name from the root, entering
    /// each as a namespace scope. Reuses scopes that already exist so
    /// `a::b` and `a::c` share the `a` level.
    fn enter_module_scope(&self, name: &CstStr, ctx: &mut Ctx) -> Sid {
        ctx.table.move_to(&SID_GLOBAL.clone());
        for segment in name.split("::") {
            let existing = ctx
                .table
                .cur_scope()
                .local(segment)
                .iter()
                .find_map(|s| match s {
                    Symbol::Scope(sid) => {
                        let scope = ctx.table.scope(sid)?;
                        (scope.kind == ScopeKind::Namespace).then(|| sid.clone())
                    }
                    Symbol::Var(_) => None,
                });
            match existing {
                Some(sid) => ctx.table.move_to(&sid),
                None => {
                    ctx.table.enter(segment, ScopeKind::Namespace);
                }
            }
        }
        ctx.table.cur_sid().clone()
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: PathBuf) -> PathBuf {
    if let (Ok(rest), Some(home)) = (path.strip_prefix("~"), dirs::home_dir()) {
        return home.join(rest);
    }
    path
}

/// Every `import` directive in the buffer, token-wise: the imported
/// module name and the token to hang diagnostics on.
fn scan_imports(buffer: &TokenBuffer) -> Vec<(CstStr, Token)> {
    let mut found = Vec::new();
    let mut i = 0;
    while i < buffer.len() {
        if buffer.get(i).map(|t| t.kind) != Some(TokenKind::Import) {
            i += 1;
            continue;
        }
        let Some(first) = buffer.get(i + 1).filter(|t| t.kind == TokenKind::Ident) else {
            i += 1;
            continue;
        };
        let at = first.clone();
        let mut name = first.text.to_string();
        let mut j = i + 2;
        while buffer.get(j).map(|t| t.kind) == Some(TokenKind::SubNs)
            && buffer.get(j + 1).map(|t| t.kind) == Some(TokenKind::Ident)
        {
            name.push_str("::");
            name.push_str(&buffer.get(j + 1).map(|t| t.text.clone()).unwrap_or_default());
            j += 2;
        }
        found.push((CstStr::from(name), at));
        i = j;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn compile(path: &Path) -> (Ctx, bool) {
        let mut ctx = Ctx::silent();
        let mut graph = ModuleGraph::new(true);
        let found = graph.compile(path, &mut ctx).is_some();
        (ctx, found)
    }

    #[test]
    fn test_import_across_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "math.cst", "int32 twice(int32 n) { return n * 2; }");
        let main = write(
            dir.path(),
            "main.cst",
            "import math; int32 main() { return math::twice(21); }",
        );
        let (ctx, found) = compile(&main);
        assert!(found);
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_missing_module_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(
            dir.path(),
            "main.cst",
            "import nothing; import nothing; int32 main() { return 0; }",
        );
        let (ctx, _) = compile(&main);
        let e401 = ctx.reporter.codes().iter().filter(|c| *c == "cst_module_E0401").count();
        assert_eq!(e401, 1);
    }

    #[test]
    fn test_member_import_finds_module_file() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "math.cst", "int32 twice(int32 n) { return n * 2; }");
        let main = write(
            dir.path(),
            "main.cst",
            "import math: { twice }; int32 main() { return twice(21); }",
        );
        let (ctx, _) = compile(&main);
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_include_splices_tokens() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "consts.cst", "const int32 LIMIT = 100;");
        let main = write(
            dir.path(),
            "main.cst",
            "include \"consts.cst\"\nint32 main() { return LIMIT; }",
        );
        let (ctx, _) = compile(&main);
        assert!(ctx.reporter.codes().is_empty(), "{:?}", ctx.reporter.codes());
    }

    #[test]
    fn test_include_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.cst", "include \"b.cst\"\n");
        write(dir.path(), "b.cst", "include \"a.cst\"\n");
        let main = write(dir.path(), "main.cst", "include \"a.cst\"\n");
        let (ctx, _) = compile(&main);
        assert!(ctx.reporter.codes().contains(&"cst_module_E0405".to_string()));
    }

    #[test]
    fn test_missing_include() {
        let dir = tempfile::tempdir().unwrap();
        let main = write(dir.path(), "main.cst", "include \"gone.cst\"\n");
        let (ctx, _) = compile(&main);
        assert_eq!(ctx.reporter.codes(), ["cst_module_E0402"]);
    }

    #[test]
    fn test_header_without_implementation() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "io.hst", "int32 put(int32 b) ...;");
        let main = write(
            dir.path(),
            "main.cst",
            "import io; int32 main() { return io::put(7); }",
        );
        let (ctx, _) = compile(&main);
        assert_eq!(ctx.reporter.codes(), ["cst_warn_W0008"]);
    }
}
