//! Symbol table with usage-linearity tracking.
//!
//! Scopes live in a flat map keyed by [`Sid`] paths. Name lookup walks
//! the local contents first, then each scope on the `includes` list.
//! A scope does not see its lexical parent unless something put the
//! parent on that list: blocks and functions do, namespaces do not.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use cstar_val::{self, CstStr, CstType, LinearFault, Perms, Status, Value};

use crate::ast::Node;
use crate::token::Token;

pub static SID_GLOBAL: LazyLock<Sid> = LazyLock::new(|| Sid::new(""));

/// Path of a scope inside the table, segments joined by `::`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sid {
    path: CstStr,
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}

impl From<&str> for Sid {
    fn from(value: &str) -> Self {
        Self {
            path: CstStr::from(value),
        }
    }
}

impl Sid {
    pub fn new(path: impl Into<CstStr>) -> Self {
        Self { path: path.into() }
    }

    pub fn kid_of(parent: &Sid, name: &str) -> Self {
        Self {
            path: if parent.is_global() {
                CstStr::from(name)
            } else {
                CstStr::from(format!("{}::{}", parent.path, name))
            },
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if let Some(pos) = self.path.rfind("::") {
            Some(Self {
                path: CstStr::from(&self.path[0..pos]),
            })
        } else if self.is_global() {
            None
        } else {
            Some(SID_GLOBAL.clone())
        }
    }

    pub fn name(&self) -> CstStr {
        if let Some(pos) = self.path.rfind("::") {
            CstStr::from(&self.path[pos + 2..])
        } else {
            self.path.clone()
        }
    }

    pub fn is_global(&self) -> bool {
        self.path.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Namespace,
    Function,
    Struct,
    Enum,
    Block,
}

/// What each kind of scope permits in its body. A block copies the
/// whole record from its parent instead of using the per-kind values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caps {
    /// Field declarations, `T name;` without static.
    pub var_decl: bool,
    /// Plain local variables.
    pub non_static: bool,
    pub statics: bool,
    pub consts: bool,
    pub expressions: bool,
    /// Control-flow bodies (`if`, `...`).
    pub sub_blocks: bool,
    pub functions: bool,
    /// Nested namespaces and structs.
    pub sub_classes: bool,
    /// `public`/`private`/`protected` prefixes.
    pub visibility: bool,
    pub enums: bool,
}

impl Default for Caps {
    fn default() -> Self {
        Self {
            var_decl: false,
            non_static: false,
            statics: true,
            consts: true,
            expressions: false,
            sub_blocks: false,
            functions: false,
            sub_classes: true,
            visibility: false,
            enums: false,
        }
    }
}

impl Caps {
    pub fn for_kind(kind: ScopeKind) -> Self {
        let base = Self::default();
        match kind {
            ScopeKind::Global | ScopeKind::Namespace => Self {
                functions: true,
                visibility: true,
                ..base
            },
            ScopeKind::Block => base,
            ScopeKind::Function => Self {
                non_static: true,
                expressions: true,
                sub_blocks: true,
                sub_classes: false,
                ..base
            },
            ScopeKind::Struct => Self {
                var_decl: true,
                functions: true,
                visibility: true,
                ..base
            },
            ScopeKind::Enum => Self {
                enums: true,
                sub_classes: false,
                statics: false,
                consts: false,
                ..base
            },
        }
    }
}

/// One tracked variable. Shared behind `Rc<RefCell<..>>` so snapshots
/// and expression nodes can point at the same state.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: CstStr,
    pub ty: CstType,
    pub perms: Perms,
    pub status: Status,
    /// Declaration site.
    pub decl: Token,
    /// Most recent provide or consume site.
    pub last: Token,
    /// Known at compile time when declared const with a foldable value.
    pub const_value: Option<Value>,
}

pub type VarRef = Rc<RefCell<Variable>>;

impl Variable {
    /// Atomic types track loosely: they start as free variables.
    pub fn new(name: impl Into<CstStr>, ty: CstType, decl: &Token) -> Self {
        let perms = Perms {
            is_free: ty.is_atomic(),
            ..Perms::default()
        };
        Self {
            name: name.into(),
            ty,
            perms,
            status: Status::Uninitialized,
            decl: decl.clone(),
            last: decl.clone(),
            const_value: None,
        }
    }

    pub fn shared(self) -> VarRef {
        Rc::new(RefCell::new(self))
    }

    /// Records `at` as the latest touch and moves the status forward.
    /// On a fault the variable still takes its recovery state so one
    /// bad write does not cascade into follow-up errors.
    pub fn provide(&mut self, at: &Token) -> Result<(), LinearFault> {
        self.last = at.clone();
        match cstar_val::provide(self.status, self.perms) {
            Ok(next) => {
                self.status = next;
                Ok(())
            }
            Err(fault) => {
                if let Some(next) = fault.recovery() {
                    self.status = next;
                }
                Err(fault)
            }
        }
    }

    pub fn consume(&mut self, at: &Token) -> Result<(), LinearFault> {
        self.last = at.clone();
        match cstar_val::consume(self.status, self.perms) {
            Ok(next) => {
                self.status = next;
                Ok(())
            }
            Err(fault) => {
                if let Some(next) = fault.recovery() {
                    self.status = next;
                }
                Err(fault)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Protected,
    #[default]
    Guarded,
}

/// Signature data carried by function scopes.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<CstType>,
    /// Optional parameters in declaration order, with their defaults.
    pub named_params: Vec<(CstStr, CstType, Node)>,
    pub ret: CstType,
    pub is_method: bool,
    /// A call to an lvalue function can stand on the left of a `=`.
    pub is_lvalue: bool,
    pub visibility: Visibility,
}

impl FnSig {
    pub fn new(ret: CstType) -> Self {
        Self {
            params: Vec::new(),
            named_params: Vec::new(),
            ret,
            is_method: false,
            is_lvalue: false,
            visibility: Visibility::default(),
        }
    }

    /// Type of the function itself, `[ret<-p1,p2]`.
    pub fn sig_type(&self) -> CstType {
        CstType::function(&self.ret, &self.params)
    }

    pub fn named(&self, name: &str) -> Option<&(CstStr, CstType, Node)> {
        self.named_params.iter().find(|(n, _, _)| n == name)
    }
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Var(VarRef),
    Scope(Sid),
}

impl Symbol {
    pub fn as_var(&self) -> Option<&VarRef> {
        match self {
            Symbol::Var(v) => Some(v),
            Symbol::Scope(_) => None,
        }
    }

    pub fn as_scope(&self) -> Option<&Sid> {
        match self {
            Symbol::Var(_) => None,
            Symbol::Scope(sid) => Some(sid),
        }
    }
}

pub struct Scope {
    pub kind: ScopeKind,
    pub sid: Sid,
    /// Display name. Anonymous blocks keep their generated leaf.
    pub name: CstStr,
    pub parent: Option<Sid>,
    pub kids: Vec<Sid>,
    pub caps: Caps,
    /// Name to overload set. Ordered so diagnostics come out stable.
    symbols: BTreeMap<CstStr, Vec<Symbol>>,
    /// Scopes searched when the local lookup comes up empty.
    pub includes: Vec<Sid>,
    /// Alias to full path, filled by `import name from module`.
    pub import_from: HashMap<CstStr, CstStr>,
    /// Names already reported as unknown, to avoid repeats.
    unknowns: Vec<CstStr>,
    /// Function scopes carry their signature.
    pub sig: Option<FnSig>,
    /// Where the scope was declared, for "defined here" notes.
    pub decl: Option<Token>,
}

impl Scope {
    pub fn new(kind: ScopeKind, sid: Sid, name: CstStr) -> Self {
        let parent = sid.parent();
        Self {
            kind,
            sid,
            name,
            parent,
            kids: Vec::new(),
            caps: Caps::for_kind(kind),
            symbols: BTreeMap::new(),
            includes: Vec::new(),
            import_from: HashMap::new(),
            unknowns: Vec::new(),
            sig: None,
            decl: None,
        }
    }

    pub fn put(&mut self, name: impl Into<CstStr>, symbol: Symbol) {
        self.symbols.entry(name.into()).or_default().push(symbol);
    }

    pub fn local(&self, name: &str) -> &[Symbol] {
        self.symbols.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = (&CstStr, &[Symbol])> {
        self.symbols.iter().map(|(n, s)| (n, s.as_slice()))
    }
}

/// Snapshot of every strictly-tracked variable in one scope. Taken
/// before and after a conditional body to check both paths leave the
/// variables in the same state.
#[derive(Debug, Clone, Default)]
pub struct LinearitySnapshot {
    entries: Vec<(VarRef, Status)>,
}

impl LinearitySnapshot {
    /// Variables whose status moved between the two snapshots, with
    /// the status then and now.
    pub fn diff(&self, later: &LinearitySnapshot) -> Vec<(VarRef, Status, Status)> {
        let mut moved = Vec::new();
        for (var, was) in &self.entries {
            let now = later
                .entries
                .iter()
                .find(|(v, _)| Rc::ptr_eq(v, var))
                .map(|(_, s)| *s)
                .unwrap_or(Status::Uninitialized);
            if now != *was {
                moved.push((var.clone(), *was, now));
            }
        }
        moved
    }

    pub fn matches(&self, later: &LinearitySnapshot) -> bool {
        self.diff(later).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SymbolTable {
    pub scopes: HashMap<Sid, Scope>,
    cur_spot: Sid,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert(
            SID_GLOBAL.clone(),
            Scope::new(ScopeKind::Global, SID_GLOBAL.clone(), CstStr::new()),
        );
        Self {
            scopes,
            cur_spot: SID_GLOBAL.clone(),
        }
    }

    pub fn cur_sid(&self) -> &Sid {
        &self.cur_spot
    }

    pub fn scope(&self, sid: &Sid) -> Option<&Scope> {
        self.scopes.get(sid)
    }

    pub fn scope_mut(&mut self, sid: &Sid) -> Option<&mut Scope> {
        self.scopes.get_mut(sid)
    }

    pub fn cur_scope(&self) -> &Scope {
        self.scopes.get(&self.cur_spot).expect("no scope left")
    }

    pub fn cur_scope_mut(&mut self) -> &mut Scope {
        self.scopes.get_mut(&self.cur_spot).expect("no scope left")
    }

    /// Opens a named child scope under the current spot and moves in.
    /// The child is registered in the parent's contents so lookups can
    /// reach it by name; a second entry under the same name gets a
    /// uniquified sid and lands in the same overload set.
    pub fn enter(&mut self, name: impl Into<CstStr>, kind: ScopeKind) -> Sid {
        let name = name.into();
        let mut sid = Sid::kid_of(&self.cur_spot, name.as_str());
        let mut n = 1;
        while self.scopes.contains_key(&sid) {
            sid = Sid::kid_of(&self.cur_spot, &format!("{}#{}", name, n));
            n += 1;
        }
        let scope = Scope::new(kind, sid.clone(), name.clone());
        let parent = self.cur_scope_mut();
        parent.kids.push(sid.clone());
        if kind != ScopeKind::Block {
            parent.put(name, Symbol::Scope(sid.clone()));
        }
        self.scopes.insert(sid.clone(), scope);
        self.cur_spot = sid.clone();
        sid
    }

    /// Opens an anonymous block that inherits the parent's whole caps
    /// record and searches the parent on lookup.
    pub fn enter_block(&mut self) -> Sid {
        let parent_sid = self.cur_spot.clone();
        let caps = self.cur_scope().caps;
        let name = format!("#block{}", self.cur_scope().kids.len());
        let sid = self.enter(name, ScopeKind::Block);
        let block = self.cur_scope_mut();
        block.caps = caps;
        block.includes.push(parent_sid);
        sid
    }

    pub fn exit(&mut self) {
        if let Some(parent) = self.cur_spot.parent() {
            self.cur_spot = parent;
        }
    }

    /// Moves the spot to an already-created scope.
    pub fn move_to(&mut self, sid: &Sid) {
        if self.scopes.contains_key(sid) {
            self.cur_spot = sid.clone();
        }
    }

    /// Adds `extra` to the current scope's lookup chain.
    pub fn include(&mut self, extra: Sid) {
        self.cur_scope_mut().includes.push(extra);
    }

    /// Stores a symbol under `loc` in the current scope. A qualified
    /// `a::b` location descends into the named child scope first.
    pub fn add(&mut self, loc: &str, symbol: Symbol) {
        let spot = self.cur_spot.clone();
        self.add_at(&spot, loc, symbol);
    }

    pub fn add_at(&mut self, sid: &Sid, loc: &str, symbol: Symbol) {
        if let Some((head, tail)) = loc.split_once("::") {
            if !head.is_empty() {
                let kid = self
                    .scopes
                    .get(sid)
                    .and_then(|s| s.local(head).first().and_then(Symbol::as_scope).cloned());
                if let Some(kid) = kid {
                    return self.add_at(&kid, tail, symbol);
                }
            }
        }
        if let Some(scope) = self.scopes.get_mut(sid) {
            scope.put(loc, symbol);
        }
    }

    /// Full lookup from the current spot: local contents first, then
    /// every included scope in order, first hit wins.
    pub fn lookup(&self, loc: &str) -> Vec<Symbol> {
        let mut seen = Vec::new();
        self.lookup_guarded(&self.cur_spot, loc, &mut seen)
    }

    pub fn lookup_in(&self, sid: &Sid, loc: &str) -> Vec<Symbol> {
        let mut seen = Vec::new();
        self.lookup_guarded(sid, loc, &mut seen)
    }

    // `seen` keeps mutually-including scopes from looping the search.
    fn lookup_guarded(&self, sid: &Sid, loc: &str, seen: &mut Vec<Sid>) -> Vec<Symbol> {
        if seen.contains(sid) {
            return Vec::new();
        }
        seen.push(sid.clone());
        let found = self.get_local(sid, loc, seen);
        if !found.is_empty() {
            return found;
        }
        if let Some(scope) = self.scopes.get(sid) {
            for inc in &scope.includes {
                let found = self.lookup_guarded(inc, loc, seen);
                if !found.is_empty() {
                    return found;
                }
            }
        }
        Vec::new()
    }

    fn get_local(&self, sid: &Sid, loc: &str, seen: &mut Vec<Sid>) -> Vec<Symbol> {
        let Some(scope) = self.scopes.get(sid) else {
            return Vec::new();
        };
        if loc.is_empty() {
            return vec![Symbol::Scope(sid.clone())];
        }
        let direct = scope.local(loc);
        if !direct.is_empty() {
            return direct.to_vec();
        }
        let mut found = Vec::new();
        if let Some((head, tail)) = loc.split_once("::") {
            if let Some(kid) = scope.local(head).first().and_then(Symbol::as_scope) {
                found = self.lookup_guarded(kid, tail, seen);
            }
        }
        if found.is_empty() {
            if let Some(target) = scope.import_from.get(loc) {
                // Aliases hold module-qualified paths, so resolve them
                // from the root where module scopes live.
                if target.as_str() != loc {
                    let target = target.clone();
                    found = self.get_local(&SID_GLOBAL, target.as_str(), seen);
                }
            }
        }
        found
    }

    /// First sighting of an unknown name in the current scope. Repeat
    /// sightings return false so the error is only reported once.
    pub fn mark_unknown(&mut self, name: impl Into<CstStr>) -> bool {
        let name = name.into();
        let scope = self.cur_scope_mut();
        if scope.unknowns.contains(&name) {
            false
        } else {
            scope.unknowns.push(name);
            true
        }
    }

    /// The block-type word used in capability errors. Blocks answer
    /// with the nearest enclosing non-block scope.
    pub fn kind_name(&self, sid: &Sid) -> &'static str {
        match self.scopes.get(sid) {
            Some(scope) => match scope.kind {
                ScopeKind::Block => match &scope.parent {
                    Some(parent) => self.kind_name(parent),
                    None => "Namespace",
                },
                ScopeKind::Global | ScopeKind::Namespace => "Namespace",
                ScopeKind::Function => "Function",
                ScopeKind::Struct => "Struct",
                ScopeKind::Enum => "Enumeration",
            },
            None => "Namespace",
        }
    }

    /// Declared return type of the enclosing function, `void` outside
    /// of one.
    pub fn return_type(&self, sid: &Sid) -> CstType {
        match self.scopes.get(sid) {
            Some(scope) => match (&scope.kind, &scope.sig) {
                (ScopeKind::Function, Some(sig)) => sig.ret.clone(),
                (ScopeKind::Block, _) => scope
                    .parent
                    .as_ref()
                    .map(|p| self.return_type(p))
                    .unwrap_or_else(CstType::void),
                _ => CstType::void(),
            },
            None => CstType::void(),
        }
    }

    /// Qualified path of a scope for messages, block scopes elided.
    pub fn loc_of(&self, sid: &Sid) -> CstStr {
        let mut parts: Vec<CstStr> = Vec::new();
        let mut cur = Some(sid.clone());
        while let Some(s) = cur {
            match self.scopes.get(&s) {
                Some(scope) => {
                    if !matches!(scope.kind, ScopeKind::Block | ScopeKind::Global) {
                        parts.push(scope.name.clone());
                    }
                    cur = scope.parent.clone();
                }
                None => break,
            }
        }
        parts.reverse();
        let joined = parts
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join("::");
        CstStr::from(joined)
    }

    /// Status of every strictly-tracked variable in the scope, in name
    /// order. Free variables are exempt from branch reconciliation.
    pub fn snapshot(&self, sid: &Sid) -> LinearitySnapshot {
        let mut entries = Vec::new();
        if let Some(scope) = self.scopes.get(sid) {
            for (_, symbols) in scope.names() {
                for symbol in symbols {
                    if let Symbol::Var(var) = symbol {
                        let state = var.borrow();
                        if !state.perms.is_free {
                            entries.push((var.clone(), state.status));
                        }
                    }
                }
            }
        }
        LinearitySnapshot { entries }
    }

    /// Every variable of the scope in name order, free ones included.
    /// The end-of-scope sweep walks this list.
    pub fn variables(&self, sid: &Sid) -> Vec<VarRef> {
        let mut vars = Vec::new();
        if let Some(scope) = self.scopes.get(sid) {
            for (_, symbols) in scope.names() {
                for symbol in symbols {
                    if let Symbol::Var(var) = symbol {
                        vars.push(var.clone());
                    }
                }
            }
        }
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Pos, TokenKind};

    fn tok(text: &str) -> Token {
        Token::new(
            TokenKind::Ident,
            Pos::new(1, 1, 0, text.len()),
            text,
            Rc::new(CstStr::from("test.cst")),
        )
    }

    fn var(name: &str, ty: &str) -> VarRef {
        Variable::new(name, CstType::from(ty), &tok(name)).shared()
    }

    #[test]
    fn test_sid() {
        let sid = Sid::new("std::math");
        assert_eq!(sid.parent().unwrap(), Sid::new("std"));
        assert_eq!(sid.name(), "math");
        assert_eq!(Sid::new("std").parent().unwrap(), *SID_GLOBAL);
        assert!(SID_GLOBAL.parent().is_none());
    }

    #[test]
    fn test_enter_and_exit() {
        let mut table = SymbolTable::new();
        table.enter("std", ScopeKind::Namespace);
        assert_eq!(*table.cur_sid(), Sid::new("std"));
        table.enter("max", ScopeKind::Function);
        assert_eq!(*table.cur_sid(), Sid::new("std::max"));
        table.enter_block();
        assert_eq!(*table.cur_sid(), Sid::new("std::max::#block0"));
        table.exit();
        table.exit();
        assert_eq!(*table.cur_sid(), Sid::new("std"));
        table.exit();
        assert_eq!(*table.cur_sid(), *SID_GLOBAL);
    }

    #[test]
    fn test_block_sees_parent_through_include() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        table.add("x", Symbol::Var(var("x", "int32")));
        table.enter_block();
        let found = table.lookup("x");
        assert_eq!(found.len(), 1);
        assert!(found[0].as_var().is_some());
    }

    #[test]
    fn test_namespace_is_closed() {
        let mut table = SymbolTable::new();
        table.add("x", Symbol::Var(var("x", "int32")));
        table.enter("inner", ScopeKind::Namespace);
        assert!(table.lookup("x").is_empty());
    }

    #[test]
    fn test_qualified_lookup() {
        let mut table = SymbolTable::new();
        table.enter("a", ScopeKind::Namespace);
        table.enter("b", ScopeKind::Namespace);
        table.add("x", Symbol::Var(var("x", "int32")));
        table.move_to(&SID_GLOBAL);
        assert_eq!(table.lookup("a::b::x").len(), 1);
        assert!(table.lookup("a::c::x").is_empty());
    }

    #[test]
    fn test_qualified_add() {
        let mut table = SymbolTable::new();
        table.enter("a", ScopeKind::Namespace);
        table.move_to(&SID_GLOBAL);
        table.add("a::x", Symbol::Var(var("x", "int32")));
        assert_eq!(table.lookup_in(&Sid::new("a"), "x").len(), 1);
    }

    #[test]
    fn test_import_alias() {
        let mut table = SymbolTable::new();
        table.enter("vec", ScopeKind::Namespace);
        table.add("push", Symbol::Var(var("push", "int32")));
        table.move_to(&SID_GLOBAL);
        table
            .cur_scope_mut()
            .import_from
            .insert(CstStr::from("push"), CstStr::from("vec::push"));
        assert_eq!(table.lookup("push").len(), 1);
    }

    #[test]
    fn test_lookup_survives_include_cycle() {
        let mut table = SymbolTable::new();
        table.enter("a", ScopeKind::Namespace);
        table.include(Sid::new("b"));
        table.move_to(&SID_GLOBAL);
        table.enter("b", ScopeKind::Namespace);
        table.include(Sid::new("a"));
        assert!(table.lookup("missing").is_empty());
    }

    #[test]
    fn test_overloads_share_a_name() {
        let mut table = SymbolTable::new();
        let first = table.enter("f", ScopeKind::Function);
        table.exit();
        let second = table.enter("f", ScopeKind::Function);
        table.exit();
        assert_ne!(first, second);
        assert_eq!(table.lookup("f").len(), 2);
    }

    #[test]
    fn test_caps_per_kind() {
        let n = Caps::for_kind(ScopeKind::Namespace);
        assert!(n.sub_classes && n.statics && n.functions);
        assert!(!n.expressions && !n.non_static);
        let f = Caps::for_kind(ScopeKind::Function);
        assert!(f.non_static && f.expressions && f.sub_blocks);
        assert!(!f.var_decl && !f.functions);
        let s = Caps::for_kind(ScopeKind::Struct);
        assert!(s.var_decl && s.functions && s.statics);
        let e = Caps::for_kind(ScopeKind::Enum);
        assert!(e.enums && !e.sub_classes && !e.statics);
    }

    #[test]
    fn test_block_copies_caps() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        table.enter_block();
        assert!(table.cur_scope().caps.expressions);
        assert!(table.cur_scope().caps.non_static);
    }

    #[test]
    fn test_kind_name_walks_blocks() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        table.enter_block();
        let sid = table.cur_sid().clone();
        assert_eq!(table.kind_name(&sid), "Function");
        assert_eq!(table.kind_name(&SID_GLOBAL), "Namespace");
    }

    #[test]
    fn test_return_type_from_block() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        table.cur_scope_mut().sig = Some(FnSig::new(CstType::from("int32")));
        table.enter_block();
        let sid = table.cur_sid().clone();
        assert_eq!(table.return_type(&sid), CstType::from("int32"));
        assert!(table.return_type(&SID_GLOBAL).is_void());
    }

    #[test]
    fn test_loc_of_skips_blocks() {
        let mut table = SymbolTable::new();
        table.enter("a", ScopeKind::Namespace);
        table.enter("f", ScopeKind::Function);
        table.enter_block();
        let sid = table.cur_sid().clone();
        assert_eq!(table.loc_of(&sid), "a::f");
    }

    #[test]
    fn test_snapshot_diff() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        let x = var("x", "vec");
        table.add("x", Symbol::Var(x.clone()));
        let sid = table.cur_sid().clone();
        let before = table.snapshot(&sid);
        x.borrow_mut().provide(&tok("x")).unwrap();
        let after = table.snapshot(&sid);
        assert!(!before.matches(&after));
        let moved = before.diff(&after);
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].1, Status::Uninitialized);
        assert_eq!(moved[0].2, Status::Provided);
        assert!(after.matches(&table.snapshot(&sid)));
    }

    #[test]
    fn test_snapshot_skips_free_variables() {
        let mut table = SymbolTable::new();
        table.enter("f", ScopeKind::Function);
        table.add("n", Symbol::Var(var("n", "int32")));
        table.add("v", Symbol::Var(var("v", "vec")));
        let sid = table.cur_sid().clone();
        let snap = table.snapshot(&sid);
        assert_eq!(snap.diff(&LinearitySnapshot::default()).len(), 0);
        assert!(!snap.is_empty());
        assert_eq!(table.variables(&sid).len(), 2);
    }

    #[test]
    fn test_variable_tracks_last_touch() {
        let v = var("x", "vec");
        v.borrow_mut().perms.is_mut = true;
        let at = tok("use-site");
        v.borrow_mut().provide(&at).unwrap();
        assert_eq!(v.borrow().last.text, "use-site");
        assert_eq!(v.borrow().status, Status::Provided);
        let err = v.borrow_mut().provide(&tok("again")).unwrap_err();
        assert_eq!(err, LinearFault::NeverConsumed { free: false });
        assert_eq!(v.borrow().last.text, "again");
        assert_eq!(v.borrow().status, Status::Provided);
    }

    #[test]
    fn test_mark_unknown_suppresses_repeats() {
        let mut table = SymbolTable::new();
        assert!(table.mark_unknown("ghost"));
        assert!(!table.mark_unknown("ghost"));
        assert!(table.mark_unknown("phantom"));
    }

    #[test]
    fn test_sig_type() {
        let mut sig = FnSig::new(CstType::from("int32"));
        sig.params.push(CstType::from("int32"));
        sig.params.push(CstType::from("vec"));
        assert_eq!(sig.sig_type().as_str(), "[int32<-int32,vec]");
        assert_eq!(FnSig::new(CstType::void()).sig_type().as_str(), "[void<-]");
    }
}
