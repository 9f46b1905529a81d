//! Scoped symbol table with a shared built-in root
//!
//! Built-in symbols live in an immutable, `Arc`-shared scope seeded once
//! per (stage, version, profile) configuration. Per-compilation scopes are
//! consulted first on lookup; a compilation that needs to specialize a
//! built-in must [SymbolTable::copy_up] it into its own writable global
//! scope before mutating. The shared root is never written through.

use std::sync::Arc;

use front_end::source_location::Span;
use front_end::types::Type;
use rustc_hash::FxHashMap;

use crate::ir::Op;

/// A formal parameter of a declared or built-in function
#[derive(Debug, Clone)]
pub struct FunctionParam {
    pub name: Option<String>,
    /// Parameter type; the qualifier's storage class records the
    /// in/out/inout direction
    pub ty: Type,
}

impl FunctionParam {
    pub fn anonymous(ty: Type) -> Self {
        Self { name: None, ty }
    }

    pub fn named(name: &str, ty: Type) -> Self {
        Self { name: Some(name.to_string()), ty }
    }
}

/// What a symbol denotes
#[derive(Debug, Clone)]
pub enum SymbolInfo {
    Variable {
        ty: Type,
    },
    Function {
        params: Vec<FunctionParam>,
        return_type: Type,
        /// Has a body been seen?
        defined: bool,
        /// Fixed internal opcode; `Op::FunctionCall` for user functions
        op: Op,
    },
}

/// A named entry in the symbol table
///
/// Variables are keyed by name; functions by mangled signature so that
/// overloads coexist in one scope.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Declared name as written in source
    pub name: String,
    /// Map key: the name for variables, the mangled signature for functions
    pub key: String,
    pub info: SymbolInfo,
    pub builtin: bool,
    /// Extensions that must be enabled before this symbol may be used
    pub required_extensions: Vec<&'static str>,
    pub span: Span,
    pub id: u64,
}

impl Symbol {
    pub fn variable(id: u64, name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            key: name.to_string(),
            info: SymbolInfo::Variable { ty },
            builtin: false,
            required_extensions: Vec::new(),
            span: Span::default(),
            id,
        }
    }

    pub fn function(id: u64, name: &str, params: Vec<FunctionParam>, return_type: Type, op: Op) -> Self {
        let key = mangle_function(name, &params);
        Self {
            name: name.to_string(),
            key,
            info: SymbolInfo::Function { params, return_type, defined: false, op },
            builtin: false,
            required_extensions: Vec::new(),
            span: Span::default(),
            id,
        }
    }

    pub fn as_builtin(mut self) -> Self {
        self.builtin = true;
        self
    }

    pub fn requiring(mut self, extensions: &[&'static str]) -> Self {
        self.required_extensions = extensions.to_vec();
        self
    }

    pub fn is_function(&self) -> bool {
        matches!(self.info, SymbolInfo::Function { .. })
    }

    /// The type of a variable symbol
    pub fn var_type(&self) -> Option<&Type> {
        match &self.info {
            SymbolInfo::Variable { ty } => Some(ty),
            _ => None,
        }
    }

    pub fn var_type_mut(&mut self) -> Option<&mut Type> {
        match &mut self.info {
            SymbolInfo::Variable { ty } => Some(ty),
            _ => None,
        }
    }
}

/// Mangled signature used to key function overloads
pub fn mangle_function(name: &str, params: &[FunctionParam]) -> String {
    let mut key = String::from(name);
    key.push('(');
    for param in params {
        param.ty.mangle(&mut key);
    }
    key
}

/// Mangled signature from argument types at a call site
pub fn mangle_call(name: &str, args: &[&Type]) -> String {
    let mut key = String::from(name);
    key.push('(');
    for arg in args {
        arg.mangle(&mut key);
    }
    key
}

/// One lexical scope's symbols
#[derive(Debug, Clone, Default)]
pub struct Scope {
    symbols: FxHashMap<String, Symbol>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol; returns false on a name/signature collision
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.symbols.contains_key(&symbol.key) {
            return false;
        }
        self.symbols.insert(symbol.key.clone(), symbol);
        true
    }

    pub fn get(&self, key: &str) -> Option<&Symbol> {
        self.symbols.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// The scoped name resolution structure
///
/// Lookup walks user scopes from innermost to outermost, then falls through
/// to the shared built-in root.
#[derive(Debug)]
pub struct SymbolTable {
    builtins: Arc<Scope>,
    /// User scopes, `[0]` being the writable global scope
    scopes: Vec<Scope>,
    next_id: u64,
}

impl SymbolTable {
    /// User symbol ids start above this; built-in ids stay below
    const FIRST_USER_ID: u64 = 1 << 32;

    pub fn new(builtins: Arc<Scope>) -> Self {
        Self {
            builtins,
            scopes: vec![Scope::new()],
            next_id: Self::FIRST_USER_ID,
        }
    }

    pub fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Current scope depth; 0 is the global scope
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Insert into the current scope; false on collision, without failing
    /// the compilation (the caller reports)
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        self.scopes.last_mut().expect("global scope always present").insert(symbol)
    }

    /// Insert into the global scope regardless of current depth
    pub fn insert_global(&mut self, symbol: Symbol) -> bool {
        self.scopes[0].insert(symbol)
    }

    /// Find a symbol by key, innermost scope first, built-in root last
    ///
    /// The second element is true when the hit came from the built-in
    /// root; callers must [Self::copy_up] such a symbol before mutating.
    pub fn find(&self, key: &str) -> Option<(&Symbol, bool)> {
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.get(key) {
                return Some((symbol, false));
            }
        }
        self.builtins.get(key).map(|symbol| (symbol, true))
    }

    /// Mutable access to a symbol in the user scopes only
    pub fn find_mut(&mut self, key: &str) -> Option<&mut Symbol> {
        for scope in self.scopes.iter_mut().rev() {
            if scope.symbols.contains_key(key) {
                return scope.symbols.get_mut(key);
            }
        }
        None
    }

    /// Clone a built-in symbol into the writable global scope and return
    /// the writable clone. The shared root is left untouched, so other
    /// compilations keep seeing the original.
    ///
    /// If a writable copy already exists it is returned instead.
    pub fn copy_up(&mut self, key: &str) -> Option<&mut Symbol> {
        let already_local = self.scopes.iter().any(|scope| scope.symbols.contains_key(key));
        if !already_local {
            let mut clone = self.builtins.get(key)?.clone();
            clone.builtin = false;
            self.scopes[0].insert(clone);
            return self.scopes[0].symbols.get_mut(key);
        }
        self.find_mut(key)
    }

    /// All function overloads visible under `name`, innermost first;
    /// shadowed signatures are suppressed
    pub fn collect_overloads(&self, name: &str) -> Vec<Symbol> {
        let mut seen: Vec<String> = Vec::new();
        let mut overloads = Vec::new();

        let mut visit = |scope: &Scope| {
            for symbol in scope.iter() {
                if symbol.is_function() && symbol.name == name && !seen.contains(&symbol.key) {
                    seen.push(symbol.key.clone());
                    overloads.push(symbol.clone());
                }
            }
        };

        for scope in self.scopes.iter().rev() {
            visit(scope);
        }
        visit(&self.builtins);

        overloads
    }
}
