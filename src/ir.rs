use serde::Serialize;

/// One parsed source line.
///
/// `ident` is the name the node defines or refers to: the assignment
/// target when `assigned` is set, otherwise whatever the construct names
/// (store pointer, callee, label, global, ...).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub line_num: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ident: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub assigned: bool,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(line_num: usize, ident: Option<String>, kind: NodeKind) -> Self {
        Node {
            line_num,
            ident,
            assigned: false,
            kind,
        }
    }

    pub fn intertype(&self) -> &'static str {
        self.kind.intertype()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intertype", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeKind {
    Load {
        value_type: String,
        pointer_type: String,
        pointer: Value,
    },
    Store {
        value_type: String,
        value: Value,
        pointer_type: String,
        pointer: Value,
    },
    Branch(Branch),
    Return {
        ty: String,
        value: Option<Value>,
    },
    Switch {
        ty: String,
        value: String,
        default_label: String,
        switch_labels: Vec<SwitchCase>,
    },
    Call(CallSite),
    Invoke {
        call: CallSite,
        to_label: String,
        unwind_label: String,
    },
    Alloca {
        /// Pointer type the instruction yields.
        ty: String,
        allocated_type: String,
        allocated_num: String,
    },
    Phi {
        ty: String,
        params: Vec<PhiParam>,
    },
    Mathop {
        op: String,
        variant: Option<String>,
        ty: String,
        params: Vec<Value>,
    },
    Bitcast {
        ty: String,
        from_type: String,
        value: String,
    },
    #[serde(rename = "getelementptr")]
    GetElementPtr {
        ty: String,
        params: Vec<Value>,
    },
    #[serde(rename = "extractvalue")]
    ExtractValue {
        ty: String,
        aggregate: String,
        indexes: Vec<String>,
    },
    #[serde(rename = "indirectbr")]
    IndirectBr {
        ty: String,
        pointer: Value,
        destinations: Vec<String>,
    },
    Label,
    GlobalVariable {
        ty: String,
        external: bool,
        value: Option<Constant>,
        ctors: Option<Vec<String>>,
    },
    Type {
        fields: Vec<String>,
        packed: bool,
    },
    Alias {
        ty: String,
        aliasee: String,
    },
    Function(FunctionHeader),
    FunctionEnd,
    FunctionStub {
        return_type: String,
        params: Vec<Value>,
        has_var_args: bool,
    },
    Unreachable,
}

impl NodeKind {
    pub fn intertype(&self) -> &'static str {
        match self {
            NodeKind::Load { .. } => "load",
            NodeKind::Store { .. } => "store",
            NodeKind::Branch(_) => "branch",
            NodeKind::Return { .. } => "return",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Call(_) => "call",
            NodeKind::Invoke { .. } => "invoke",
            NodeKind::Alloca { .. } => "alloca",
            NodeKind::Phi { .. } => "phi",
            NodeKind::Mathop { .. } => "mathop",
            NodeKind::Bitcast { .. } => "bitcast",
            NodeKind::GetElementPtr { .. } => "getelementptr",
            NodeKind::ExtractValue { .. } => "extractvalue",
            NodeKind::IndirectBr { .. } => "indirectbr",
            NodeKind::Label => "label",
            NodeKind::GlobalVariable { .. } => "globalVariable",
            NodeKind::Type { .. } => "type",
            NodeKind::Alias { .. } => "alias",
            NodeKind::Function(_) => "function",
            NodeKind::FunctionEnd => "functionEnd",
            NodeKind::FunctionStub { .. } => "functionStub",
            NodeKind::Unreachable => "unreachable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "form", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Branch {
    Unconditional {
        label: String,
    },
    Conditional {
        condition: Value,
        label_true: String,
        label_false: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchCase {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSite {
    pub callee: String,
    /// Return type as written after `call`.
    pub ty: String,
    /// Any extra type annotation between the return type and the callee.
    pub function_type: String,
    pub params: Vec<Value>,
    /// Result is discarded (no assignment target).
    pub standalone: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhiParam {
    pub label: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionHeader {
    pub return_type: String,
    pub params: Vec<Value>,
    pub param_idents: Vec<String>,
    pub has_var_args: bool,
}

/// An operand: parameter, instruction argument or nested constant
/// expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intertype", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Value {
    Value {
        ty: String,
        ident: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        by_val: bool,
    },
    StructValue {
        ty: String,
        values: Vec<Value>,
    },
    Expr(ConstExpr),
    BlockAddress {
        func: String,
        label: String,
    },
    Varargs,
}

impl Value {
    pub fn scalar(ty: impl Into<String>, ident: impl Into<String>) -> Value {
        Value::Value {
            ty: ty.into(),
            ident: ident.into(),
            by_val: false,
        }
    }

    pub fn ty(&self) -> Option<&str> {
        match self {
            Value::Value { ty, .. } | Value::StructValue { ty, .. } => Some(ty),
            Value::Expr(expr) => Some(&expr.ty),
            Value::BlockAddress { .. } | Value::Varargs => None,
        }
    }

    pub fn set_ty(&mut self, new_ty: &str) {
        match self {
            Value::Value { ty, .. } | Value::StructValue { ty, .. } => *ty = new_ty.to_string(),
            Value::Expr(expr) => expr.ty = new_ty.to_string(),
            Value::BlockAddress { .. } | Value::Varargs => {}
        }
    }

    pub fn ident(&self) -> Option<&str> {
        match self {
            Value::Value { ident, .. } => Some(ident),
            Value::Expr(expr) => expr.ident.as_deref(),
            Value::BlockAddress { func, .. } => Some(func),
            Value::StructValue { .. } | Value::Varargs => None,
        }
    }

    pub fn mark_by_val(&mut self) {
        if let Value::Value { by_val, .. } = self {
            *by_val = true;
        }
    }
}

/// A constant expression written like a call, e.g.
/// `getelementptr inbounds ([4 x i8]* @s, i32 0, i32 0)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstExpr {
    pub op: String,
    pub variant: Option<String>,
    pub ty: String,
    pub params: Vec<Value>,
    pub ident: Option<String>,
}

/// Global initializer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "intertype", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Constant {
    Value { ty: String, value: String },
    EmptyStruct { ty: String },
    String { ty: String, text: String },
    Struct { ty: String, contents: Vec<Constant> },
    List { ty: String, contents: Vec<Constant> },
    Expr(ConstExpr),
    BlockAddress { func: String, label: String },
}

/// A function body captured in lazy mode and parsed later on request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionStub {
    pub ident: String,
    pub params: Vec<Value>,
    pub has_var_args: bool,
    pub line_num: usize,
    pub lines: Vec<String>,
}

/// Left-hand half of `target = expression`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub ident: String,
    pub line_num: usize,
}
