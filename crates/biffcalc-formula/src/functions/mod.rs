//! Built-in functions, dispatched by BIFF function id

pub mod criteria;
pub mod info;
pub mod logical;
pub mod math;
pub mod statistical;

use ahash::AHashMap;
use biffcalc_core::CellError;
use once_cell::sync::Lazy;

use crate::context::EvaluationContext;
use crate::error::{FormulaError, FormulaResult};
use crate::token::Token;
use crate::value::FormulaValue;

/// Function implementation signature
///
/// Arguments arrive as the operand tokens popped from the value stack, in
/// call order and unresolved, so a function decides for itself whether a
/// reference is read as a value, expanded into cells or passed through.
pub type FunctionImpl = fn(&[Token], &EvaluationContext) -> FormulaResult<Token>;

/// BIFF function ids of the built-in functions
pub mod ids {
    pub const COUNT: u16 = 0;
    pub const IF: u16 = 1;
    pub const ISNA: u16 = 2;
    pub const ISERROR: u16 = 3;
    pub const SUM: u16 = 4;
    pub const AVERAGE: u16 = 5;
    pub const MIN: u16 = 6;
    pub const MAX: u16 = 7;
    pub const NA: u16 = 10;
    pub const TRUE: u16 = 34;
    pub const FALSE: u16 = 35;
    pub const AND: u16 = 36;
    pub const OR: u16 = 37;
    pub const NOT: u16 = 38;
    pub const ISERR: u16 = 126;
    pub const ISTEXT: u16 = 127;
    pub const ISNUMBER: u16 = 128;
    pub const ISBLANK: u16 = 129;
    pub const ISLOGICAL: u16 = 198;
    pub const SUMIF: u16 = 345;
    pub const COUNTIF: u16 = 346;
    pub const IFERROR: u16 = 455;
}

/// Function definition
pub struct FunctionDef {
    /// BIFF function id
    pub id: u16,
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    /// Whether `count` arguments fit this function
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<u16, FunctionDef>,
    names: AHashMap<&'static str, u16>,
}

static REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// The shared registry of built-in functions
pub fn registry() -> &'static FunctionRegistry {
    &REGISTRY
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
            names: AHashMap::new(),
        };

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_info_functions();
        registry.register_statistical_functions();

        registry
    }

    /// Look up a function by id
    pub fn get(&self, id: u16) -> Option<&FunctionDef> {
        self.functions.get(&id)
    }

    /// Look up a function by name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&FunctionDef> {
        self.names
            .get(name.to_uppercase().as_str())
            .and_then(|id| self.functions.get(id))
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.names.insert(def.name, def.id);
        self.functions.insert(def.id, def);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Invoke function `id` on `args`
    ///
    /// An unknown id is a [`FormulaError::FunctionNotSupported`] failure. An
    /// argument count the function does not accept yields `#VALUE!`.
    pub fn call(&self, id: u16, args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Token> {
        let def = self.get(id).ok_or_else(|| {
            log::warn!("no implementation for function id {}", id);
            FormulaError::FunctionNotSupported { id }
        })?;
        if !def.accepts(args.len()) {
            log::debug!("{} called with {} argument(s)", def.name, args.len());
            return Ok(Token::error(CellError::Value));
        }
        (def.implementation)(args, ctx)
    }

    fn register_math_functions(&mut self) {
        self.register(FunctionDef {
            id: ids::SUM,
            name: "SUM",
            min_args: 1,
            max_args: None,
            implementation: math::fn_sum,
        });

        self.register(FunctionDef {
            id: ids::AVERAGE,
            name: "AVERAGE",
            min_args: 1,
            max_args: None,
            implementation: math::fn_average,
        });

        self.register(FunctionDef {
            id: ids::MIN,
            name: "MIN",
            min_args: 1,
            max_args: None,
            implementation: math::fn_min,
        });

        self.register(FunctionDef {
            id: ids::MAX,
            name: "MAX",
            min_args: 1,
            max_args: None,
            implementation: math::fn_max,
        });

        self.register(FunctionDef {
            id: ids::COUNT,
            name: "COUNT",
            min_args: 1,
            max_args: None,
            implementation: math::fn_count,
        });

        self.register(FunctionDef {
            id: ids::SUMIF,
            name: "SUMIF",
            min_args: 2,
            max_args: Some(3),
            implementation: math::fn_sumif,
        });
    }

    fn register_logical_functions(&mut self) {
        // IF with a single argument is legal in the token stream.
        self.register(FunctionDef {
            id: ids::IF,
            name: "IF",
            min_args: 1,
            max_args: Some(3),
            implementation: logical::fn_if,
        });

        self.register(FunctionDef {
            id: ids::AND,
            name: "AND",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_and,
        });

        self.register(FunctionDef {
            id: ids::OR,
            name: "OR",
            min_args: 1,
            max_args: None,
            implementation: logical::fn_or,
        });

        self.register(FunctionDef {
            id: ids::NOT,
            name: "NOT",
            min_args: 1,
            max_args: Some(1),
            implementation: logical::fn_not,
        });

        self.register(FunctionDef {
            id: ids::IFERROR,
            name: "IFERROR",
            min_args: 2,
            max_args: Some(2),
            implementation: logical::fn_iferror,
        });

        self.register(FunctionDef {
            id: ids::TRUE,
            name: "TRUE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_true,
        });

        self.register(FunctionDef {
            id: ids::FALSE,
            name: "FALSE",
            min_args: 0,
            max_args: Some(0),
            implementation: logical::fn_false,
        });
    }

    fn register_info_functions(&mut self) {
        let predicates: [(u16, &'static str, FunctionImpl); 7] = [
            (ids::ISBLANK, "ISBLANK", info::fn_isblank),
            (ids::ISNUMBER, "ISNUMBER", info::fn_isnumber),
            (ids::ISTEXT, "ISTEXT", info::fn_istext),
            (ids::ISLOGICAL, "ISLOGICAL", info::fn_islogical),
            (ids::ISERROR, "ISERROR", info::fn_iserror),
            (ids::ISERR, "ISERR", info::fn_iserr),
            (ids::ISNA, "ISNA", info::fn_isna),
        ];
        for (id, name, implementation) in predicates {
            self.register(FunctionDef {
                id,
                name,
                min_args: 1,
                max_args: Some(1),
                implementation,
            });
        }

        self.register(FunctionDef {
            id: ids::NA,
            name: "NA",
            min_args: 0,
            max_args: Some(0),
            implementation: info::fn_na,
        });
    }

    fn register_statistical_functions(&mut self) {
        self.register(FunctionDef {
            id: ids::COUNTIF,
            name: "COUNTIF",
            min_args: 2,
            max_args: Some(2),
            implementation: statistical::fn_countif,
        });
    }
}

/// Arguments with composites (arrays, areas, names, reference lists)
/// replaced by their element tokens
pub(crate) fn flatten_args(args: &[Token], ctx: &EvaluationContext) -> FormulaResult<Vec<Token>> {
    let mut flat = Vec::with_capacity(args.len());
    for arg in args {
        match arg.components(ctx)? {
            Some(components) => flat.extend(components),
            None => flat.push(arg.clone()),
        }
    }
    Ok(flat)
}

/// Resolved values of every flattened argument
pub(crate) fn flatten_values(
    args: &[Token],
    ctx: &EvaluationContext,
) -> FormulaResult<Vec<FormulaValue>> {
    let mut values = Vec::new();
    for token in flatten_args(args, ctx)? {
        match token.value(ctx)? {
            FormulaValue::Array(rows) => values.extend(rows.into_iter().flatten()),
            value => values.push(value),
        }
    }
    Ok(values)
}
