pub mod bits;
pub mod inst;
pub mod op;
pub mod reg;
