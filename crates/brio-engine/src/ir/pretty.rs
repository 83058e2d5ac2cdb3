//! Pretty Printer for IR
//!
//! Human-readable text form of a module, used by the test suite and for
//! debugging. The JSON export in `module.rs` is the machine-readable form.

use super::block::BasicBlock;
use super::function::IrFunction;
use super::module::IrModule;

/// Types that can render themselves as readable IR text
pub trait PrettyPrint {
    /// Render to a string
    fn pretty_print(&self) -> String;
}

impl PrettyPrint for BasicBlock {
    fn pretty_print(&self) -> String {
        let mut out = String::new();

        match &self.label {
            Some(label) => out.push_str(&format!("{}:                ; {}\n", self.id, label)),
            None => out.push_str(&format!("{}:\n", self.id)),
        }

        for instr in &self.instructions {
            out.push_str(&format!("  {}\n", instr));
        }

        match &self.terminator {
            Some(term) => out.push_str(&format!("  {}\n", term)),
            None => out.push_str("  <open>\n"),
        }

        out
    }
}

impl PrettyPrint for IrFunction {
    fn pretty_print(&self) -> String {
        let mut out = String::new();

        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        match &self.return_ty {
            Some(ty) => out.push_str(&format!("fn {}({}) -> {} {{\n", self.name, params.join(", "), ty)),
            None => out.push_str(&format!("fn {}({}) {{\n", self.name, params.join(", "))),
        }

        for block in self.blocks() {
            out.push_str(&block.pretty_print());
        }

        out.push_str("}\n");
        out
    }
}

impl PrettyPrint for IrModule {
    fn pretty_print(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("; module {}\n", self.name));

        for (i, s) in self.structs.iter().enumerate() {
            let fields: Vec<String> = s.fields.iter().map(|f| f.to_string()).collect();
            out.push_str(&format!("; struct s{} {} {{ {} }}\n", i, s.name, fields.join(", ")));
        }

        for func in self.functions() {
            out.push('\n');
            out.push_str(&func.pretty_print());
        }

        out
    }
}
