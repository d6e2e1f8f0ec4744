pub mod call;
pub mod doctor;
pub mod mcp;
pub mod serve;
