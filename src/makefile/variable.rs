//! A named Make variable with zero or more conditional (`ifeq`-style)
//! assignments.

use super::Makefile;

struct Condition {
    expr: String,
    if_value: String,
    else_value: String,
}

/// Variables are namespaced by target: the actual Make name is
/// `<base>.<target.make_path>`, guaranteeing no collisions across nodes.
pub struct MakeVariable {
    name: String,
    conditions: Vec<Condition>,
}

impl MakeVariable {
    pub fn new(base: &str, target_make_path: &str) -> Self {
        Self {
            name: format!("{base}.{target_make_path}"),
            conditions: Vec::new(),
        }
    }

    pub fn add_condition(&mut self, expr: &str, if_value: &str, else_value: &str) {
        self.conditions.push(Condition {
            expr: expr.to_string(),
            if_value: if_value.to_string(),
            else_value: else_value.to_string(),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `$(name)`, for embedding a reference to this variable in a rule.
    pub fn reference(&self) -> String {
        format!("$({})", self.name)
    }

    /// Emits `ifeq (…) NAME := if_val else NAME := else_val endif` groups
    /// in insertion order. With no conditions this writes nothing; a
    /// reference to the variable then simply resolves to empty.
    pub fn write(&self, mf: &mut Makefile) {
        for condition in &self.conditions {
            mf.append(&format!("ifeq ({})\n", condition.expr));
            mf.append(&format!("{} := {}\n", self.name, condition.if_value));
            mf.append("else\n");
            mf.append(&format!("{} := {}\n", self.name, condition.else_value));
            mf.append("endif\n");
        }
    }
}
