use std::fmt::Display;

/// The handful of 32-bit general-purpose registers the emitter actually
/// touches — just enough for the calling convention and the scratch
/// registers each opcode's lowering needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    Eax,
    Ebx,
    Edx,
    Esi,
    Ebp,
    Esp,
}

impl Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Reg::Eax => "%eax",
            Reg::Ebx => "%ebx",
            Reg::Edx => "%edx",
            Reg::Esi => "%esi",
            Reg::Ebp => "%ebp",
            Reg::Esp => "%esp",
        })
    }
}
